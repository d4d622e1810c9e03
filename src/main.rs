use std::process::ExitCode;

use clap::Parser;
use dotenvy::dotenv;

use viewtrack::cli::Cli;
use viewtrack::config::Config;
use viewtrack::error::ApplicationError;
use viewtrack::logger;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(?error, "exiting");
            eprintln!("❌ {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ApplicationError> {
    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    cli.run(config).await
}
