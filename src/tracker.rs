use std::fmt;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use derive_new::new;
use itertools::Itertools;
use tracing::instrument;

use crate::report::{survey, video_heading, views_line, Tally};
use crate::schedule::{run_weekly, WeeklyTrigger};
use crate::sheets::{combine, Sheet, SheetError, TrackingRow};
use crate::youtube::{VideoRef, YouTube};

/// What one fetch-and-update run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub tally: Tally,
    pub appended: usize,
    /// `None` when nothing was found and the sheet was left alone.
    pub updated_cells: Option<u64>,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.tally)?;
        match self.updated_cells {
            Some(cells) => write!(f, "Appended {} rows ({cells} cells updated)", self.appended),
            None => write!(f, "No view counts found, spreadsheet left unchanged"),
        }
    }
}

/// Appends the view counts of a fixed list of videos to a [Sheet].
#[derive(Debug, new)]
pub struct Tracker<S> {
    youtube: YouTube,
    sheet: S,
    #[new(default)]
    videos: Vec<VideoRef>,
    #[new(default)]
    progress: bool,
}

impl<S: Sheet> Tracker<S> {
    /// Prints each video's result to stdout as it is fetched.
    pub fn with_progress(mut self) -> Self {
        self.progress = true;
        self
    }

    pub fn add_video(&mut self, video: VideoRef) {
        self.videos.push(video);
    }

    pub fn set_videos(&mut self, videos: Vec<VideoRef>) {
        self.videos = videos;
    }

    pub fn videos(&self) -> &[VideoRef] {
        &self.videos
    }

    /// One row per video whose view count was found, dated `date`.
    ///
    /// The sheet is read before anything is fetched, so a sheet that cannot be read is never overwritten.
    #[instrument(skip(self), fields(videos = self.videos.len()))]
    pub async fn fetch_and_update(&self, date: NaiveDate) -> Result<UpdateOutcome, SheetError> {
        let existing = self.sheet.read_rows().await?;

        let total = self.videos.len();
        let (tally, found) = survey(&self.youtube, &self.videos, |index, video, views| {
            let position = index + 1;
            match views {
                Some(views) => tracing::info!(position, total, video = %video.id(), views, "fetched"),
                None => tracing::warn!(position, total, video = %video.id(), "no view count"),
            }

            if self.progress {
                println!("{}", video_heading(index, total, video));
                println!("{}", views_line(views));
            }
        })
        .await;

        let rows = found
            .iter()
            .map(|lookup| TrackingRow::observed(date, lookup.video, lookup.views))
            .collect_vec();

        if rows.is_empty() {
            tracing::warn!("no view counts found, leaving the sheet unchanged");
            return Ok(UpdateOutcome {
                tally,
                appended: 0,
                updated_cells: None,
            });
        }

        let table = combine(existing, &rows);
        let updated_cells = self.sheet.write_rows(&table).await?;

        Ok(UpdateOutcome {
            tally,
            appended: rows.len(),
            updated_cells: Some(updated_cells),
        })
    }

    /// [Tracker::fetch_and_update] dated today, local time.
    pub async fn update_now(&self) -> Result<UpdateOutcome, SheetError> {
        self.fetch_and_update(Local::now().date_naive()).await
    }

    /// Updates now and then on every occurrence of `trigger`. Failed runs are reported and the loop carries on.
    pub async fn run_scheduled(&self, trigger: WeeklyTrigger, poll_interval: Duration) {
        run_weekly(trigger, poll_interval, move || self.report_update()).await
    }

    async fn report_update(&self) {
        match self.update_now().await {
            Ok(outcome) => println!("{outcome}"),
            Err(error) => {
                tracing::error!(%error, "scheduled update failed");
                println!("❌ Update failed: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::sheets::memory::MemorySheet;
    use crate::sheets::{header, GoogleSheets};

    async fn video_page(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    fn video(server: &MockServer, id: &str, route: &str) -> VideoRef {
        VideoRef::served_from(id, format!("{}{route}", server.uri()))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[tokio::test]
    async fn appends_found_counts_under_a_new_header() {
        let server = MockServer::start().await;
        video_page(&server, "/a", 200, r#""viewCount":"1000""#).await;
        video_page(&server, "/b", 404, "").await;
        video_page(&server, "/c", 200, "2,000 views").await;

        let mut tracker = Tracker::new(YouTube::default(), MemorySheet::default());
        tracker.add_video(video(&server, "aaaaaaaaaaa", "/a"));
        tracker.add_video(video(&server, "bbbbbbbbbbb", "/b"));
        tracker.add_video(video(&server, "ccccccccccc", "/c"));

        let outcome = tracker.fetch_and_update(date()).await.unwrap();
        assert_eq!(outcome.appended, 2);
        assert_eq!(outcome.tally.attempted, 3);
        assert_eq!(outcome.updated_cells, Some(12));

        let rows = tracker.sheet.rows();
        assert_eq!(
            rows,
            vec![
                header(),
                vec![json!("2024-03-04"), json!("aaaaaaaaaaa"), json!("aaaaaaaaaaa"), json!(1000)],
                vec![json!("2024-03-04"), json!("ccccccccccc"), json!("ccccccccccc"), json!(2000)],
            ]
        );
    }

    #[tokio::test]
    async fn writes_the_whole_table_back() {
        let server = MockServer::start().await;
        video_page(&server, "/a", 200, r#""viewCount":"1500""#).await;

        let earlier = vec![json!("2024-02-26"), json!("aaaaaaaaaaa"), json!("Song"), json!(900)];
        let sheet = MemorySheet::with_rows(vec![header(), earlier.clone()]);

        let mut tracker = Tracker::new(YouTube::default(), sheet);
        tracker.set_videos(vec![video(&server, "aaaaaaaaaaa", "/a")]);
        tracker.fetch_and_update(date()).await.unwrap();

        let writes = tracker.sheet.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), 3);
        assert_eq!(writes[0][0], header());
        assert_eq!(writes[0][1], earlier);
        assert_eq!(writes[0][2][3], json!(1500));
    }

    #[tokio::test]
    async fn nothing_found_leaves_the_sheet_alone() {
        let server = MockServer::start().await;
        video_page(&server, "/a", 200, "<html>no counts here</html>").await;

        let mut tracker = Tracker::new(YouTube::default(), MemorySheet::default());
        tracker.add_video(video(&server, "aaaaaaaaaaa", "/a"));

        let outcome = tracker.fetch_and_update(date()).await.unwrap();
        assert_eq!(outcome.updated_cells, None);
        assert_eq!(tracker.sheet.write_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_sheet_is_never_written() {
        let server = MockServer::start().await;
        video_page(&server, "/a", 200, r#""viewCount":"1000""#).await;
        Mock::given(method("GET"))
            .and(path("/sheet-123/values/A:D"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updatedCells": 4 })))
            .expect(0)
            .mount(&server)
            .await;

        let sheet = GoogleSheets::new(reqwest::Client::new(), "sheet-123", "token")
            .with_endpoint(server.uri());
        let mut tracker = Tracker::new(YouTube::default(), sheet);
        tracker.add_video(video(&server, "aaaaaaaaaaa", "/a"));

        let result = tracker.fetch_and_update(date()).await;
        assert!(matches!(result, Err(SheetError::ReadSheet { .. })));
    }

    #[tokio::test]
    async fn progress_does_not_change_the_update() {
        let server = MockServer::start().await;
        video_page(&server, "/a", 200, r#""viewCount":"1000""#).await;
        video_page(&server, "/b", 404, "").await;

        let mut tracker = Tracker::new(YouTube::default(), MemorySheet::default()).with_progress();
        assert!(tracker.progress);
        tracker.add_video(video(&server, "aaaaaaaaaaa", "/a"));
        tracker.add_video(video(&server, "bbbbbbbbbbb", "/b"));

        let outcome = tracker.fetch_and_update(date()).await.unwrap();
        assert_eq!(outcome.tally.attempted, 2);
        assert_eq!(outcome.appended, 1);
    }

    #[test]
    fn outcome_summary() {
        let outcome = UpdateOutcome {
            tally: [Some(1000), None].into_iter().collect(),
            appended: 1,
            updated_cells: Some(4),
        };

        assert!(outcome.to_string().ends_with("Appended 1 rows (4 cells updated)"));
    }
}
