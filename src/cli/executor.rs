//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{CatalogCommandHandler, TokenCommandHandler};
use super::parser::Commands;
use crate::external::favor::FavorClient;

/// Execute a CLI command against a configured client
///
/// # Errors
/// Returns the fetch error of the resource the command asked for
pub async fn execute_command(command: &Commands, client: &FavorClient) -> anyhow::Result<()> {
    tracing::debug!(?command, location = ?client.location(), "executing command");

    match command {
        Commands::Browse => CatalogCommandHandler::new(client).browse().await,
        Commands::Category { id } => CatalogCommandHandler::new(client).category(id).await,
        Commands::Menu { merchant_id } => {
            CatalogCommandHandler::new(client).menu(*merchant_id).await
        }
        Commands::Token => TokenCommandHandler::new(client).execute().await,
    }
}
