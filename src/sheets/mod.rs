use std::future::Future;

use chrono::NaiveDate;
use derive_new::new;
use serde_json::Value;

use crate::youtube::{VideoId, VideoRef};

pub use error::*;
pub use google::*;

mod error;
mod google;
#[cfg(test)]
pub mod memory;

/// The tracked columns: Date, VideoID, Title, Views.
pub const RANGE: &str = "A:D";

pub const HEADER: [&str; 4] = ["Date", "VideoID", "Title", "Views"];

pub type Row = Vec<Value>;

/// A table that is always read and written as a whole.
pub trait Sheet {
    fn read_rows(&self) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Replaces the whole tracked range, returning how many cells were updated.
    fn write_rows(&self, rows: &[Row]) -> impl Future<Output = Result<u64>> + Send;
}

/// One view count observation. Rows are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TrackingRow {
    pub date: NaiveDate,
    pub video_id: VideoId,
    pub title: String,
    pub views: u64,
}

impl TrackingRow {
    pub fn observed(date: NaiveDate, video: &VideoRef, views: u64) -> Self {
        Self::new(date, video.id().clone(), video.display_name().to_string(), views)
    }

    pub fn to_row(&self) -> Row {
        vec![
            Value::from(self.date.format("%Y-%m-%d").to_string()),
            Value::from(self.video_id.as_str()),
            Value::from(self.title.as_str()),
            Value::from(self.views),
        ]
    }
}

pub fn header() -> Row {
    HEADER.iter().map(|&name| Value::from(name)).collect()
}

/// The full table to write back: what was there, a header if nothing was, then the new rows.
pub fn combine(existing: Vec<Row>, new_rows: &[TrackingRow]) -> Vec<Row> {
    let mut table = existing;
    if table.is_empty() {
        table.push(header());
    }

    table.extend(new_rows.iter().map(TrackingRow::to_row));
    table
}
