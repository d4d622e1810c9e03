use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt as _, Snafu};

/// Every accepted video URL starts with this prefix.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("{WATCH_URL_PREFIX}{}", self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = ParseVideoErr;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let well_formed = text.len() == VIDEO_ID_LEN
            && text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        ensure!(well_formed, InvalidVideoIdSnafu { text });
        Ok(VideoId(text.to_string()))
    }
}

impl TryFrom<String> for VideoId {
    type Error = ParseVideoErr;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A video to look up. The id is always the one found in the url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVideoRef")]
pub struct VideoRef {
    id: VideoId,
    url: String,
    title: Option<String>,
}

impl VideoRef {
    /// Accepts watch URLs only, see [WATCH_URL_PREFIX]. A blank title is treated as no title.
    pub fn parse(url: &str, title: Option<&str>) -> Result<VideoRef, ParseVideoErr> {
        let url = url.trim();
        let id = parse_video_id(url)?;
        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string);

        Ok(VideoRef {
            id,
            url: url.to_string(),
            title,
        })
    }

    pub fn from_id(id: VideoId) -> VideoRef {
        VideoRef {
            url: id.watch_url(),
            id,
            title: None,
        }
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The title if there is one, the video id otherwise.
    pub fn display_name(&self) -> &str {
        self.title().unwrap_or(self.id.as_str())
    }
}

#[cfg(test)]
impl VideoRef {
    /// A video whose page is served from `url`, typically a local mock server.
    pub(crate) fn served_from(id: &str, url: String) -> VideoRef {
        VideoRef {
            id: id.parse().expect("valid test video id"),
            url,
            title: None,
        }
    }
}

#[derive(Deserialize)]
struct RawVideoRef {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

impl TryFrom<RawVideoRef> for VideoRef {
    type Error = ParseVideoErr;

    fn try_from(raw: RawVideoRef) -> Result<Self, Self::Error> {
        VideoRef::parse(&raw.url, raw.title.as_deref())
    }
}

/// Take the part after `v=` up to the next `&`.
pub fn parse_video_id(text: &str) -> Result<VideoId, ParseVideoErr> {
    let rest = text
        .strip_prefix(WATCH_URL_PREFIX)
        .context(ExpectWatchUrlSnafu { text })?;

    let id = rest.split('&').next().unwrap_or_default();
    ensure!(!id.is_empty(), MissingIdFragmentSnafu { text });

    id.parse()
}

#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum ParseVideoErr {
    /// text does not start with https://www.youtube.com/watch?v=
    #[snafu(display("`{text}` is not a YouTube watch URL"))]
    ExpectWatchUrl { text: String },

    /// text is a watch url, but it's missing the id fragment
    #[snafu(display("`{text}` does not contain a video id"))]
    MissingIdFragment { text: String },

    #[snafu(display("`{text}` is not an 11 character video id"))]
    InvalidVideoId { text: String },
}
