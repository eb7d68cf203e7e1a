//! MoneyTalk Web Server
//!
//! Axum-based REST API for the MoneyTalk personal finance application.
//!
//! Security features:
//! - Bearer token (HS256 JWT) authentication on every route except
//!   registration, login and the welcome message
//! - Restrictive CORS policy
//! - Security headers on every response
//! - Sanitized error responses

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use moneytalk_core::ai::{AIBackend, AIClient};
use moneytalk_core::auth::{validate_token, DEFAULT_TOKEN_TTL_SECS};
use moneytalk_core::db::Database;
use moneytalk_core::{AuthError, Error};

mod handlers;

/// Prefix for all versioned API routes
pub const API_PREFIX: &str = "/api/v1";

/// JWT signing secret (required)
pub const SECRET_KEY_ENV: &str = "MONEYTALK_SECRET_KEY";
/// Token lifetime in seconds
pub const TOKEN_TTL_ENV: &str = "MONEYTALK_TOKEN_TTL_SECS";
/// Comma-separated CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "MONEYTALK_ALLOWED_ORIGINS";
/// Upper bound on one insight call, in seconds
pub const INSIGHT_TIMEOUT_ENV: &str = "MONEYTALK_INSIGHT_TIMEOUT_SECS";

const DEFAULT_INSIGHT_TIMEOUT_SECS: u64 = 30;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// HS256 secret used to sign and verify bearer tokens
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    pub insight_timeout: Duration,
}

impl ServerConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            allowed_origins: vec![],
            insight_timeout: Duration::from_secs(DEFAULT_INSIGHT_TIMEOUT_SECS),
        }
    }

    /// Build configuration from `MONEYTALK_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var(SECRET_KEY_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .with_context(|| format!("{} must be set to sign API tokens", SECRET_KEY_ENV))?;

        let mut config = Self::new(secret);

        if let Ok(raw) = std::env::var(TOKEN_TTL_ENV) {
            config.token_ttl_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", TOKEN_TTL_ENV))?;
        }
        if let Ok(raw) = std::env::var(INSIGHT_TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", INSIGHT_TIMEOUT_ENV))?;
            config.insight_timeout = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var(ALLOWED_ORIGINS_ENV) {
            config.allowed_origins = parse_origins(&raw);
        }

        Ok(config)
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub ai: Option<AIClient>,
}

/// Identity attached to a request by the auth middleware
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Authentication middleware - validates the bearer token and attaches `AuthUser`
///
/// The token must carry the id of an existing, active user. Missing or
/// malformed headers, bad signatures and expired tokens are all 401.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        warn!(path = %request.uri().path(), "Unauthorized request - no bearer token");
        return AppError::from(AuthError::MissingToken).into_response();
    };

    let user_id = match validate_token(&state.config.jwt_secret, token) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Rejected bearer token");
            return AppError::from(e).into_response();
        }
    };

    match state.db.get_user(user_id) {
        Ok(Some(user)) if user.is_active => {}
        Ok(_) => {
            warn!(user_id = %user_id, "Token for unknown or inactive user");
            return AppError::from(AuthError::InvalidToken).into_response();
        }
        Err(e) => return AppError::from(e).into_response(),
    }

    request.extensions_mut().insert(AuthUser { user_id });
    next.run(request).await
}

/// GET / - welcome message
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to A conversation with Your Money!"
    }))
}

/// Create the router with the AI backend taken from the environment
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let ai = AIClient::from_env();
    match ai {
        Some(ref client) => info!(
            "AI backend configured: {} (model: {})",
            client.host(),
            client.model()
        ),
        None => info!("AI backend not configured (set OLLAMA_HOST to enable insights)"),
    }
    create_router_with_ai(db, static_dir, config, ai)
}

/// Create the router with an explicit AI backend
pub fn create_router_with_ai(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    ai: Option<AIClient>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        ai,
    });

    let public_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::get_me))
        .route("/transaction", post(handlers::create_transaction))
        .route("/transactions", get(handlers::list_transactions))
        .route(
            "/transaction/:id",
            get(handlers::get_transaction)
                .patch(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        .route("/finance/report/:year/:month", get(handlers::get_report))
        .route(
            "/finance/insights/summary/:year/:month",
            get(handlers::get_insight_summary),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let mut app = Router::new()
        .route("/", get(root))
        .nest(API_PREFIX, public_routes.merge(protected_routes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'; frame-ancestors 'none'"),
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection().await;

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("AI backend not configured (set OLLAMA_HOST to enable insights)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            internal: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    /// 500 with a generic client message; `err` is only logged
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            internal: Some(err.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidData(msg) => Self::bad_request(msg),
            Error::InvalidPeriod { .. } | Error::Overflow(_) => Self::bad_request(err.to_string()),
            Error::NotFound(msg) => Self::not_found(msg),
            Error::Conflict(msg) => Self::conflict(msg),
            Error::Auth(auth) => Self::from(auth),
            other => Self::internal(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hashing(_) => Self::internal(err),
            _ => Self::unauthorized(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}
