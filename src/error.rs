use std::net::SocketAddr;

use snafu::{Location, Snafu};

use crate::auth::AuthError;
use crate::sheets::SheetError;
use crate::source::SourceError;

/// Errors that end the current run. Anything that only affects one video is handled where it happens.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApplicationError {
    /// could not parse the configuration from the environment
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// SPREADSHEET_ID is not set, add it to the .env file
    MissingSpreadsheetId {
        #[snafu(implicit)]
        location: Location,
    },

    /// Google Sheets authorization failed
    #[snafu(display("Google Sheets authorization failed: {source}"))]
    Authorize {
        source: AuthError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not load the video list
    #[snafu(display("could not load the video list: {source}"))]
    LoadVideos {
        source: SourceError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not update the spreadsheet
    #[snafu(display("could not update the spreadsheet: {source}"))]
    UpdateSheet {
        source: SheetError,
        #[snafu(implicit)]
        location: Location,
    },

    /// no videos were added
    NoVideos {
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not read from the terminal
    Prompt {
        source: rustyline::error::ReadlineError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not serve the application
    WebServer {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not bind to the given address, check if it's already in use
    BindAddress {
        address: SocketAddr,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },
}
