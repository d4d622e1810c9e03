//! Where the list of videos comes from.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::{Location, ResultExt as _, Snafu};

use crate::prompt::Prompt;
use crate::youtube::{VideoRef, YouTube};

/// Typed by the user to finish a list.
pub const DONE: &str = "done";

const COMMENT: char = '#';

const VIDEO_FILE_TEMPLATE: &str = "\
# YouTube video list
# Format: video URL|video title (optional)
# Examples:
# https://www.youtube.com/watch?v=dQw4w9WgXcQ|My video title
# https://www.youtube.com/watch?v=9bZkp7q19f0|Another video

# Add your video URLs below:
";

pub trait VideoSource {
    fn videos(&mut self) -> impl Future<Output = Result<Vec<VideoRef>, SourceError>>;
}

/// Asks for one URL per line until [DONE], optionally followed by a title for each.
pub struct ManualEntry<'a, P> {
    prompt: &'a mut P,
    ask_title: bool,
}

impl<'a, P: Prompt> ManualEntry<'a, P> {
    pub fn new(prompt: &'a mut P) -> Self {
        Self {
            prompt,
            ask_title: false,
        }
    }

    pub fn with_titles(prompt: &'a mut P) -> Self {
        Self {
            prompt,
            ask_title: true,
        }
    }
}

impl<P: Prompt> VideoSource for ManualEntry<'_, P> {
    async fn videos(&mut self) -> Result<Vec<VideoRef>, SourceError> {
        let mut videos = Vec::new();

        loop {
            let message = format!("YouTube video URL ('{DONE}' to finish): ");
            let Some(line) = self.prompt.ask(&message) else {
                break;
            };

            let line = line.trim();
            if line.eq_ignore_ascii_case(DONE) {
                break;
            }

            let url = match VideoRef::parse(line, None) {
                Ok(video) => video,
                Err(error) => {
                    tracing::debug!(%error, "rejected manual entry");
                    self.prompt.say("❌ Please enter a valid YouTube video URL");
                    continue;
                }
            };

            let video = if self.ask_title {
                let title = self.prompt.ask("Video title (optional): ");
                VideoRef::parse(url.url(), title.as_deref()).unwrap_or(url)
            } else {
                url
            };

            self.prompt
                .say(&format!("✅ Added video: {}", video.display_name()));
            videos.push(video);
        }

        Ok(videos)
    }
}

/// A text file of `url|title` lines. A missing file is created from a template and yields no videos.
#[derive(Debug, Clone)]
pub struct VideoFile {
    path: PathBuf,
    created: bool,
}

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            created: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the last load had to create the file.
    pub fn created(&self) -> bool {
        self.created
    }
}

impl VideoSource for VideoFile {
    async fn videos(&mut self) -> Result<Vec<VideoRef>, SourceError> {
        let path = self.path.clone();

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tokio::fs::write(&path, VIDEO_FILE_TEMPLATE)
                    .await
                    .context(CreateVideoFileSnafu { path: &path })?;

                tracing::info!(path = %path.display(), "created video list template");
                self.created = true;
                return Ok(Vec::new());
            }
            Err(error) => return Err(error).context(ReadVideoFileSnafu { path }),
        };

        self.created = false;
        let videos = parse_video_list(&content);
        tracing::info!(path = %path.display(), count = videos.len(), "loaded video list");

        Ok(videos)
    }
}

/// Skips blanks and comments, drops lines without a watch URL.
pub fn parse_video_list(content: &str) -> Vec<VideoRef> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT))
        .filter_map(|line| {
            let mut parts = line.split('|');
            let url = parts.next()?;
            VideoRef::parse(url, parts.next()).ok()
        })
        .collect()
}

/// The most recent videos linked from a channel page.
pub struct Channel<'a> {
    youtube: &'a YouTube,
    url: String,
}

impl<'a> Channel<'a> {
    pub fn new(youtube: &'a YouTube, url: impl Into<String>) -> Self {
        Self {
            youtube,
            url: url.into(),
        }
    }
}

impl VideoSource for Channel<'_> {
    async fn videos(&mut self) -> Result<Vec<VideoRef>, SourceError> {
        Ok(self.youtube.channel_videos(&self.url).await)
    }
}

/// A JSON array of `{"url": ..., "title": ...}` objects, as passed through `VIDEOS_LIST`.
#[derive(Debug, Clone)]
pub struct VideoListJson {
    json: Option<String>,
}

impl VideoListJson {
    pub fn new(json: Option<String>) -> Self {
        Self { json }
    }
}

impl VideoSource for VideoListJson {
    async fn videos(&mut self) -> Result<Vec<VideoRef>, SourceError> {
        let Some(json) = self.json.as_deref().filter(|json| !json.trim().is_empty()) else {
            return Ok(Vec::new());
        };

        serde_json::from_str(json).context(MalformedVideoListSnafu)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SourceError {
    #[snafu(display("could not read `{}`: {source}", path.display()))]
    ReadVideoFile {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not create `{}`: {source}", path.display()))]
    CreateVideoFile {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("video list is not a valid JSON list of videos: {source}"))]
    MalformedVideoList {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
