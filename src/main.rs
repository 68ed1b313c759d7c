use clap::Parser;

use favor_rs::cli::{self, Cli};
use favor_rs::external::favor::FavorClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = cli::load_and_merge_config(&cli)?;
    cli::init_logger_from_settings(&settings)?;

    tracing::info!(
        app = %settings.application.name,
        version = favor_rs::pkg_version(),
        "starting"
    );

    let client = FavorClient::new(&settings)?;
    cli::execute_command(&cli.command, &client).await
}
