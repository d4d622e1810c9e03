use std::fmt;

use itertools::Itertools;

use crate::youtube::{VideoRef, YouTube};

/// Running totals over a batch of lookups. Failed lookups count as attempts only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: usize,
    pub succeeded: usize,
    pub total_views: u64,
}

impl Tally {
    pub fn record(&mut self, views: Option<u64>) {
        self.attempted += 1;

        if let Some(views) = views {
            self.succeeded += 1;
            self.total_views = self.total_views.saturating_add(views);
        }
    }

    /// Floor of the mean over successful lookups.
    pub fn average(&self) -> Option<u64> {
        match self.succeeded {
            0 => None,
            succeeded => Some(self.total_views / succeeded as u64),
        }
    }
}

impl FromIterator<Option<u64>> for Tally {
    fn from_iter<I: IntoIterator<Item = Option<u64>>>(iter: I) -> Self {
        let mut tally = Tally::default();
        iter.into_iter().for_each(|views| tally.record(views));
        tally
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total videos: {}", self.attempted)?;
        writeln!(f, "Fetched successfully: {}", self.succeeded)?;
        write!(f, "Total views: {}", group_thousands(self.total_views))?;

        if let Some(average) = self.average() {
            write!(f, "\nAverage views: {}", group_thousands(average))?;
        }

        Ok(())
    }
}

/// A video whose view count was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub video: &'a VideoRef,
    pub views: u64,
}

/// Looks up every video in order, one request at a time.
///
/// `observe` sees each result as it arrives, including failures, so callers can report progress.
pub async fn survey<'a>(
    youtube: &YouTube,
    videos: &'a [VideoRef],
    mut observe: impl FnMut(usize, &'a VideoRef, Option<u64>),
) -> (Tally, Vec<Lookup<'a>>) {
    let mut tally = Tally::default();
    let mut found = Vec::with_capacity(videos.len());

    for (index, video) in videos.iter().enumerate() {
        let views = youtube.fetch_view_count(video.url()).await;
        tally.record(views);
        observe(index, video, views);

        if let Some(views) = views {
            found.push(Lookup { video, views });
        }
    }

    (tally, found)
}

/// The line printed for one lookup.
pub fn views_line(views: Option<u64>) -> String {
    match views {
        Some(views) => format!("✅ Views: {}", group_thousands(views)),
        None => "❌ Could not get the view count".to_string(),
    }
}

/// Names the video at `index` of `total` before its result is printed.
pub fn video_heading(index: usize, total: usize, video: &VideoRef) -> String {
    format!("Video {}/{total}: {}", index + 1, video.display_name())
}

/// `1234567` becomes `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let head = digits.len() % 3;

    let mut groups = Vec::new();
    if head > 0 {
        groups.push(&digits[..head]);
    }
    groups.extend(
        digits.as_bytes()[head..]
            .chunks(3)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok()),
    );

    groups.into_iter().join(",")
}
