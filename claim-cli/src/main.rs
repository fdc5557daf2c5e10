use anyhow::Context;
use clap::Parser;
use tracing::debug;

use claim_cli::cli::Cli;
use claim_cli::config::AppConfig;
use claim_cli::{app, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = &config.logging.level {
        logging::set_log_level(level)?;
    }
    if let Some(path) = &config.logging.file {
        logging::enable_file_logging(path)?;
    }

    let db_config = config.db_config(cli.backend, cli.db);
    debug!(
        backend = %db_config.backend,
        connection = %db_config.connection_string,
        "opening claims store"
    );
    let repo = app::build_registry()
        .create(&db_config)
        .await
        .with_context(|| format!("Failed to open {} store", db_config.backend))?;

    let output = app::run(&*repo, &config, cli.command, cli.json).await?;
    print!("{output}");
    if cli.json {
        println!();
    }
    Ok(())
}
