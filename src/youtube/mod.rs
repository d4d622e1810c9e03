use reqwest::{header, StatusCode};
use snafu::{ensure, ResultExt};
use tracing::instrument;

pub use channel::*;
pub use error::*;
pub use extract::*;
pub use video::*;

mod channel;
mod error;
mod extract;
mod video;

/// Some responses are rejected or stripped down for non-browser agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Scrapes public YouTube pages. Requests use the client's default timeouts and are never retried.
#[derive(Debug, Clone, Default)]
pub struct YouTube {
    client: reqwest::Client,
}

impl YouTube {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// View count shown on the watch page at `url`, or `None` when it cannot be found for any reason.
    #[instrument(skip(self))]
    pub async fn fetch_view_count(&self, url: &str) -> Option<u64> {
        let page = match self.fetch_page(url).await {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(%error, "could not fetch video page");
                return None;
            }
        };

        let views = extract_view_count(&page);
        match views {
            Some(views) => tracing::debug!(views, "found view count"),
            None => tracing::info!(page_len = page.len(), "no view count in video page"),
        }

        views
    }

    /// Up to [CHANNEL_VIDEO_LIMIT] videos linked from a channel page, empty if the page is unavailable.
    #[instrument(skip(self))]
    pub async fn channel_videos(&self, channel_url: &str) -> Vec<VideoRef> {
        let page = match self.fetch_page(channel_url).await {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(%error, "could not fetch channel page");
                return Vec::new();
            }
        };

        let videos: Vec<VideoRef> = scrape_video_ids(&page)
            .into_iter()
            .map(VideoRef::from_id)
            .collect();

        tracing::info!(count = videos.len(), "found channel videos");
        videos
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .context(RequestSnafu { url })?;

        let status = response.status();
        ensure!(status == StatusCode::OK, StatusSnafu { url, status });

        response.text().await.context(BodySnafu { url })
    }
}
