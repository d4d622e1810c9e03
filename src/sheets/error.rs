use snafu::{Location, Snafu};

pub type Result<T, E = SheetError> = ::std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SheetError {
    #[snafu(display("could not authorize access to spreadsheet `{spreadsheet_id}`: {source}"))]
    Authorize {
        spreadsheet_id: String,
        source: crate::auth::AuthError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not read spreadsheet `{spreadsheet_id}`: {source}"))]
    ReadSheet {
        spreadsheet_id: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not update spreadsheet `{spreadsheet_id}`: {source}"))]
    WriteSheet {
        spreadsheet_id: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
