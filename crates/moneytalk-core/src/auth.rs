//! Password hashing, registration validation and bearer tokens
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are HS256 JWTs whose
//! `sub` claim is the user id.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AuthError, Error, Result};
use crate::models::{NewUser, User};

/// Default token lifetime in seconds
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

pub const MIN_PASSWORD_LEN: usize = 8;
/// Longest accepted password, in bytes
pub const MAX_PASSWORD_LEN: usize = 72;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Hash a password with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    let re = Regex::new(EMAIL_PATTERN)?;
    if !re.is_match(email) {
        return Err(Error::InvalidData(format!("{} is not a valid email", email)));
    }
    Ok(())
}

/// Enforce password length in bytes
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.len();
    if len < MIN_PASSWORD_LEN {
        return Err(Error::InvalidData(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(Error::InvalidData(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<()> {
    let trimmed = username.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(Error::InvalidData(
            "Username must be between 1 and 64 characters".into(),
        ));
    }
    Ok(())
}

/// Validate and store a new user
pub fn register_user(db: &Database, new_user: &NewUser) -> Result<User> {
    validate_username(&new_user.username)?;
    validate_email(&new_user.user_email)?;
    validate_password(&new_user.password)?;

    let password_hash = hash_password(&new_user.password)?;
    db.create_user(new_user.username.trim(), &new_user.user_email, &password_hash)
}

/// Look up a user by email and check their password
///
/// Unknown email, wrong password and inactive account are indistinguishable.
pub fn authenticate(db: &Database, email: &str, password: &str) -> Result<User> {
    match db.get_user_by_email(email)? {
        Some(user) if user.is_active && verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(AuthError::InvalidCredentials.into()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A freshly issued bearer token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub exp: DateTime<Utc>,
}

/// Issue a token for `user_id` valid for `ttl_secs` from now
pub fn issue_token(secret: &str, user_id: Uuid, ttl_secs: i64) -> Result<IssuedToken> {
    issue_token_at(secret, user_id, Utc::now(), ttl_secs)
}

fn issue_token_at(
    secret: &str,
    user_id: Uuid,
    issued_at: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<IssuedToken> {
    let exp = issued_at + Duration::seconds(ttl_secs);
    let claims = Claims {
        sub: user_id.to_string(),
        iat: issued_at.timestamp(),
        exp: exp.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::InvalidData(format!("Failed to sign token: {}", e)))?;

    Ok(IssuedToken {
        token,
        issued_at,
        exp,
    })
}

/// Validate a token and return the user id it was issued for
pub fn validate_token(secret: &str, token: &str) -> std::result::Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken,
    })?;

    Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("repeatable").unwrap();
        let b = hash_password("repeatable").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_password_length_limits() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"a".repeat(72)).is_ok());
        assert!(validate_password(&"a".repeat(73)).is_err());
        // Length is measured in bytes
        assert!(validate_password(&"é".repeat(37)).is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana example.com").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("ana").is_ok());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(65)).is_err());
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            user_email: email.to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    #[test]
    fn test_register_and_authenticate() {
        let db = Database::in_memory().unwrap();
        let user = register_user(&db, &new_user("ana", "ana@example.com")).unwrap();
        assert_ne!(user.password_hash, "s3cret-pass");

        let found = authenticate(&db, "ana@example.com", "s3cret-pass").unwrap();
        assert_eq!(found.id, user.id);

        let err = authenticate(&db, "ana@example.com", "wrong-pass").unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        let err = authenticate(&db, "nobody@example.com", "s3cret-pass").unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_register_duplicates_conflict() {
        let db = Database::in_memory().unwrap();
        register_user(&db, &new_user("ana", "ana@example.com")).unwrap();

        let err = register_user(&db, &new_user("ana", "other@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == "ana already registered"));

        let err = register_user(&db, &new_user("bob", "ana@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == "ana@example.com already registered"));
    }

    #[test]
    fn test_register_rejects_bad_email() {
        let db = Database::in_memory().unwrap();
        let err = register_user(&db, &new_user("ana", "not-an-email")).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let issued = issue_token(SECRET, user_id, DEFAULT_TOKEN_TTL_SECS).unwrap();
        assert_eq!(
            (issued.exp - issued.issued_at).num_seconds(),
            DEFAULT_TOKEN_TTL_SECS
        );
        assert_eq!(validate_token(SECRET, &issued.token), Ok(user_id));
    }

    #[test]
    fn test_expired_token() {
        let issued_at = Utc::now() - Duration::seconds(7200);
        let issued = issue_token_at(SECRET, Uuid::new_v4(), issued_at, 60).unwrap();
        assert_eq!(
            validate_token(SECRET, &issued.token),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let issued = issue_token(SECRET, Uuid::new_v4(), 60).unwrap();
        assert_eq!(
            validate_token("other-secret", &issued.token),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            validate_token(SECRET, "not.a.token"),
            Err(AuthError::InvalidToken)
        );
    }
}
