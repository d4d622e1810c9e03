use std::result::Result;

use snafu::ResultExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{registry, EnvFilter, Layer};

use crate::config::Config;
use crate::error::{ApplicationError, InitializeLoggerSnafu};

const FILE_FILTER: &str = "viewtrack=info";

const CONSOLE_FILTER: &str = "viewtrack=warn";

/// Console output goes to stderr so it stays out of the way of the interactive prompts on stdout.
/// The guard must be held until exit or buffered file output is lost.
pub fn init(config: &Config) -> Result<WorkerGuard, ApplicationError> {
    let (file_layer, guard) = {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "viewtrack.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = layer()
            .with_ansi(false)
            .json()
            .with_writer(non_blocking)
            .with_filter(filter(FILE_FILTER));

        (layer, guard)
    };

    let console_layer = layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter(CONSOLE_FILTER));

    let subscriber = registry().with(console_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber).context(InitializeLoggerSnafu)?;

    Ok(guard)
}

/// `RUST_LOG` overrides both defaults.
fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
