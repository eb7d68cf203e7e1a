//! User command implementations

use anyhow::{Context, Result};
use moneytalk_core::auth::register_user;
use moneytalk_core::db::Database;
use moneytalk_core::models::NewUser;

/// Register a user with the same validation as the API
pub fn cmd_user_add(db: &Database, username: &str, email: &str, password: &str) -> Result<()> {
    let user = register_user(
        db,
        &NewUser {
            username: username.to_string(),
            user_email: email.to_string(),
            password: password.to_string(),
        },
    )
    .context("Failed to register user")?;

    println!("✅ Registered {} <{}>", user.username, user.user_email);
    println!("   User ID: {}", user.id);

    Ok(())
}
