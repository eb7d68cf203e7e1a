//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use moneytalk_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    let config = ServerConfig::from_env()?;

    println!("🚀 Starting MoneyTalk API...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}{}", host, port, moneytalk_server::API_PREFIX);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!(
        "   🔑 Bearer tokens valid for {}s",
        config.token_ttl_secs
    );
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} ({})",
            config.allowed_origins.join(", "),
            moneytalk_server::ALLOWED_ORIGINS_ENV
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    moneytalk_server::serve(db, host, port, static_dir_str, config).await?;

    Ok(())
}
