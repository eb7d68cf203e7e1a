//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppState, AuthUser};
use moneytalk_core::db::{ensure_positive_amount, ensure_supported_occurred_at};
use moneytalk_core::models::{
    Category, CategoryType, NewTransaction, TransactionUpdate, TransactionWithCategory,
};

/// Body for POST /api/v1/transaction
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub category_name: String,
    pub category_type: CategoryType,
    /// Accepts a JSON number or string
    pub amount: Decimal,
    pub occurred_at: NaiveDateTime,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body for PATCH /api/v1/transaction/:id; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    pub amount: Option<Decimal>,
    pub occurred_at: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub category_name: Option<String>,
    pub category_type: Option<CategoryType>,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub status: &'static str,
    pub transaction: TransactionWithCategory,
}

#[derive(Serialize)]
pub struct TransactionListResponse {
    pub status: &'static str,
    pub transactions: Vec<TransactionWithCategory>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub msg: &'static str,
}

fn missing_transaction(id: Uuid) -> AppError {
    AppError::not_found(format!("There is no {} transaction", id))
}

fn category_name(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("category_name must not be empty"));
    }
    Ok(name)
}

/// POST /api/v1/transaction - Record a transaction
///
/// The category is found by name or created with the given type; the
/// direction follows the category type.
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    ensure_positive_amount(body.amount)?;
    ensure_supported_occurred_at(&body.occurred_at)?;
    let name = category_name(&body.category_name)?;

    let category = state
        .db
        .find_or_create_category(auth.user_id, name, body.category_type)?;

    let created = state.db.insert_transaction(
        auth.user_id,
        &NewTransaction {
            category_id: category.id,
            amount: body.amount,
            direction: body.category_type.direction(),
            occurred_at: body.occurred_at,
            description: body.description,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            status: "success",
            transaction: TransactionWithCategory {
                transaction: created,
                category_name: category.name,
                category_type: category.category_type,
            },
        }),
    ))
}

/// GET /api/v1/transactions - The user's transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let transactions = state.db.list_transactions_with_category(auth.user_id)?;
    if transactions.is_empty() {
        return Err(AppError::not_found("List is empty!"));
    }

    Ok(Json(TransactionListResponse {
        status: "success",
        transactions,
    }))
}

/// GET /api/v1/transaction/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state
        .db
        .get_transaction_with_category(auth.user_id, id)?
        .ok_or_else(|| missing_transaction(id))?;

    Ok(Json(TransactionResponse {
        status: "success",
        transaction,
    }))
}

/// PATCH /api/v1/transaction/:id - Partial update
///
/// Changing `category_name` re-resolves the category (creating it when
/// `category_type` is given) and resets the direction to match it.
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTransactionRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    if state.db.get_transaction(auth.user_id, id)?.is_none() {
        return Err(missing_transaction(id));
    }
    if let Some(amount) = body.amount {
        ensure_positive_amount(amount)?;
    }
    if let Some(ref occurred_at) = body.occurred_at {
        ensure_supported_occurred_at(occurred_at)?;
    }

    let category = resolve_category(&state, auth.user_id, &body)?;

    let update = TransactionUpdate {
        category_id: category.as_ref().map(|c| c.id),
        direction: category.as_ref().map(|c| c.category_type.direction()),
        amount: body.amount,
        occurred_at: body.occurred_at,
        description: body.description,
    };
    state.db.update_transaction(auth.user_id, id, &update)?;

    let transaction = state
        .db
        .get_transaction_with_category(auth.user_id, id)?
        .ok_or_else(|| missing_transaction(id))?;

    Ok(Json(TransactionResponse {
        status: "success",
        transaction,
    }))
}

fn resolve_category(
    state: &AppState,
    user_id: Uuid,
    body: &UpdateTransactionRequest,
) -> Result<Option<Category>, AppError> {
    match (&body.category_name, body.category_type) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(AppError::bad_request(
            "category_type requires category_name",
        )),
        (Some(raw), category_type) => {
            let name = category_name(raw)?;
            if let Some(existing) = state.db.get_category_by_name(user_id, name)? {
                return Ok(Some(existing));
            }
            let category_type = category_type.ok_or_else(|| {
                AppError::bad_request(format!(
                    "category_type is required to create category {}",
                    name
                ))
            })?;
            Ok(Some(state.db.add_category(user_id, name, category_type)?))
        }
    }
}

/// DELETE /api/v1/transaction/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.db.delete_transaction(auth.user_id, id)? {
        return Err(missing_transaction(id));
    }

    Ok(Json(DeleteResponse {
        status: "success",
        msg: "The transaction is removed",
    }))
}
