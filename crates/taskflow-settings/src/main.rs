//! TaskFlow settings CLI entry point.
//!
//! Opens the settings file, hydrates the store, runs one command, and prints
//! the command result as JSON on stdout.  Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! taskflow-settings [--store-path <PATH>] <COMMAND>
//!
//! Commands:
//!   show
//!   set-backend <TOKEN> <BASE_ID> <PRIMARY_TABLE> <SECONDARY_TABLE>
//!   set-bot-token <TOKEN>
//!   add-user <ID> <USERNAME> <FIRST_NAME>
//!   remove-user <ID>
//!   toggle-dark-mode
//!   set-cache-duration <short|medium|unlimited>
//!   clear
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Default                         | Description        |
//! |--------------------------|---------------------------------|--------------------|
//! | `TASKFLOW_SETTINGS_PATH` | platform config dir + `settings.json` | Settings file |
//! | `RUST_LOG`               | `warn`                          | Log filter         |
//!
//! A `--store-path` ending in `.toml` stores the settings as TOML.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskflow_settings::infrastructure::command_bridge::{
    self, AppState, AuthorizedUserDto, BackendConfigDto, CommandResult, MessagingConfigDto,
};
use taskflow_settings::infrastructure::storage::{default_store_path, file::FileStorage};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Inspect and edit TaskFlow's persisted settings.
#[derive(Debug, Parser)]
#[command(name = "taskflow-settings", version)]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true, env = "TASKFLOW_SETTINGS_PATH")]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current settings (secrets masked).
    Show,
    /// Save the spreadsheet backend credentials as a unit.
    SetBackend {
        token: String,
        base_id: String,
        primary_table: String,
        secondary_table: String,
    },
    /// Replace the messaging bot token; authorized users are kept.
    SetBotToken { token: String },
    /// Authorize a messaging user, replacing any entry with the same id.
    AddUser {
        id: String,
        username: String,
        first_name: String,
    },
    /// Revoke a messaging user.
    RemoveUser { id: String },
    /// Flip the dark-mode preference.
    ToggleDarkMode,
    /// Set how long backend data may be cached.
    SetCacheDuration { duration: String },
    /// Forget backend and messaging credentials; UI preferences are kept.
    Clear,
}

/// Prints `result` as pretty JSON and turns a failed command into an error.
fn emit<T: Serialize>(result: CommandResult<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(error) = result.error {
        anyhow::bail!(error);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Level is overridden by `RUST_LOG`; stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let path = match cli.store_path {
        Some(path) => path,
        None => default_store_path().context("no --store-path given")?,
    };
    info!(path = %path.display(), "opening settings");

    let state = AppState::new(Box::new(FileStorage::new(path)));

    match cli.command {
        Command::Show => emit(command_bridge::get_settings(state).await),
        Command::SetBackend {
            token,
            base_id,
            primary_table,
            secondary_table,
        } => emit(
            command_bridge::set_backend_config(
                state,
                BackendConfigDto {
                    token,
                    base_id,
                    primary_table,
                    secondary_table,
                },
            )
            .await,
        ),
        Command::SetBotToken { token } => emit(
            command_bridge::set_messaging_config(
                state,
                MessagingConfigDto {
                    bot_token: Some(token),
                    authorized_users: None,
                },
            )
            .await,
        ),
        Command::AddUser {
            id,
            username,
            first_name,
        } => emit(
            command_bridge::add_authorized_user(
                state,
                AuthorizedUserDto {
                    id,
                    username,
                    first_name,
                },
            )
            .await,
        ),
        Command::RemoveUser { id } => {
            emit(command_bridge::remove_authorized_user(state, id).await)
        }
        Command::ToggleDarkMode => emit(command_bridge::toggle_dark_mode(state).await),
        Command::SetCacheDuration { duration } => {
            emit(command_bridge::set_cache_duration(state, duration).await)
        }
        Command::Clear => emit(command_bridge::clear_config(state).await),
    }
}
