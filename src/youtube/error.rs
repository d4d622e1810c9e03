use snafu::{Location, Snafu};

/// Failure to load a page. Never leaves this module: callers only see a missing view count.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum FetchError {
    #[snafu(display("could not request `{url}`: {source}"))]
    Request {
        url: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{url}` responded with {status}"))]
    Status {
        url: String,
        status: reqwest::StatusCode,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not read the body of `{url}`: {source}"))]
    Body {
        url: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
