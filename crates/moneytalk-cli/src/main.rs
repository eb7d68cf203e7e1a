//! MoneyTalk CLI - Personal finance API
//!
//! Usage:
//!   moneytalk init                                   Initialize database
//!   moneytalk user add --username U --email E ...    Register a user
//!   moneytalk report --email E --year Y --month M    Print a monthly report
//!   moneytalk serve --port 8000                      Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt, static_dir.as_deref())
                .await
        }
        Commands::User { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                UserAction::Add {
                    username,
                    email,
                    password,
                } => commands::cmd_user_add(&db, &username, &email, &password),
            }
        }
        Commands::Report {
            email,
            year,
            month,
            json,
            insight,
            model,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let ai = if insight {
                commands::insight_client(model.as_deref())
            } else {
                None
            };
            let (year, month) = commands::resolve_month(year, month);
            commands::cmd_report(&db, &email, year, month, json, insight, ai.as_ref()).await
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
