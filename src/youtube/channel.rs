use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use super::VideoId;

/// Channel scrapes stop after this many videos.
pub const CHANNEL_VIDEO_LIMIT: usize = 10;

static WATCH_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"watch\?v=([a-zA-Z0-9_-]{11})").expect("valid regex"));

/// Video ids linked from a channel page, in the order they first appear, without duplicates.
pub fn scrape_video_ids(page: &str) -> Vec<VideoId> {
    WATCH_LINK
        .captures_iter(page)
        .filter_map(|captures| captures[1].parse::<VideoId>().ok())
        .unique()
        .take(CHANNEL_VIDEO_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(page: &str) -> Vec<String> {
        scrape_video_ids(page)
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn keeps_first_seen_order() {
        let page = r#"
            <a href="/watch?v=bbbbbbbbbbb">b</a>
            <a href="/watch?v=aaaaaaaaaaa">a</a>
            <a href="/watch?v=bbbbbbbbbbb&list=x">b again</a>
            {"url":"/watch?v=ccccccccccc"}
        "#;

        assert_eq!(ids(page), vec!["bbbbbbbbbbb", "aaaaaaaaaaa", "ccccccccccc"]);
    }

    #[test]
    fn caps_at_limit() {
        let page = (0..25)
            .map(|n| format!("watch?v=video{n:06}"))
            .join(" ");

        let found = ids(&page);
        assert_eq!(found.len(), CHANNEL_VIDEO_LIMIT);
        assert_eq!(found[0], "video000000");
        assert_eq!(found[9], "video000009");
    }

    #[test]
    fn duplicates_do_not_count_towards_limit() {
        let page = std::iter::repeat("watch?v=aaaaaaaaaaa ")
            .take(50)
            .chain(["watch?v=bbbbbbbbbbb"])
            .collect::<String>();

        assert_eq!(ids(&page), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
    }

    #[test]
    fn short_ids_are_ignored() {
        assert!(ids("watch?v=short").is_empty());
    }
}
