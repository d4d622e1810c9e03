//! Recovers a view count from a watch page without parsing the DOM.
//!
//! The page layout is undocumented and changes without notice, so several
//! encodings of the same number are tried in order of how much they are trusted:
//! the embedded `ytInitialData` object first, loose text patterns last.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

type Strategy = fn(&str) -> Option<u64>;

const STRATEGIES: &[Strategy] = &[from_initial_data, from_page_text];

static INITIAL_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var ytInitialData = (\{.*?\});").expect("valid regex"));

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+").expect("valid regex"));

static PAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""viewCount":"(\d+)""#,
        r#""viewCount":\{"simpleText":"([\d,]+) views"\}"#,
        r#""viewCount":\{"runs":\[\{"text":"([\d,]+) views"\}\]\}"#,
        r"([\d,]+) views",
        r"([\d,]+)次觀看",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

#[derive(Debug, Clone, Copy)]
enum Step {
    Key(&'static str),
    Index(usize),
}

use Step::{Index, Key};

const VIEW_COUNT_RENDERER: &[Step] = &[
    Key("contents"),
    Key("twoColumnWatchNextResults"),
    Key("results"),
    Key("results"),
    Key("contents"),
    Index(0),
    Key("videoPrimaryInfoRenderer"),
    Key("viewCount"),
    Key("videoViewCountRenderer"),
    Key("viewCount"),
];

const SIMPLE_TEXT: &[Step] = &[Key("simpleText")];
const FIRST_RUN_TEXT: &[Step] = &[Key("runs"), Index(0), Key("text")];

/// Where the display text lives, relative to [VIEW_COUNT_RENDERER].
const TEXT_PATHS: &[&[Step]] = &[SIMPLE_TEXT, FIRST_RUN_TEXT];

/// Returns the first view count found by any strategy, `None` if every one misses.
pub fn extract_view_count(page: &str) -> Option<u64> {
    STRATEGIES.iter().find_map(|strategy| strategy(page))
}

fn from_initial_data(page: &str) -> Option<u64> {
    let blob = INITIAL_DATA.captures(page)?.get(1)?.as_str();

    let data: Value = match serde_json::from_str(blob) {
        Ok(data) => data,
        Err(error) => {
            tracing::debug!(%error, "ytInitialData is not valid JSON");
            return None;
        }
    };

    let renderer = walk(&data, VIEW_COUNT_RENDERER)?;

    TEXT_PATHS
        .iter()
        .filter_map(|path| walk(renderer, path)?.as_str())
        .find_map(leading_count)
}

fn from_page_text(page: &str) -> Option<u64> {
    PAGE_PATTERNS
        .iter()
        .filter_map(|pattern| pattern.captures(page)?.get(1))
        .find_map(|found| parse_count(found.as_str()))
}

/// Missing keys, wrong types and out of range indices all end the walk the same way.
fn walk<'a>(value: &'a Value, path: &[Step]) -> Option<&'a Value> {
    path.iter().try_fold(value, |value, step| match *step {
        Key(key) => value.get(key),
        Index(index) => value.get(index),
    })
}

/// `"1,234,567 views"` is 1234567.
fn leading_count(text: &str) -> Option<u64> {
    let digits = LEADING_NUMBER.find(text)?;
    parse_count(digits.as_str())
}

fn parse_count(text: &str) -> Option<u64> {
    text.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn watch_page(view_count: Value) -> String {
        let data = json!({
            "contents": {
                "twoColumnWatchNextResults": {
                    "results": {
                        "results": {
                            "contents": [
                                { "videoPrimaryInfoRenderer": { "viewCount": { "videoViewCountRenderer": { "viewCount": view_count } } } },
                                { "videoSecondaryInfoRenderer": {} }
                            ]
                        }
                    }
                }
            }
        });

        format!("<html><script>var ytInitialData = {data};</script></html>")
    }

    #[test]
    fn simple_text_in_initial_data() {
        let page = watch_page(json!({ "simpleText": "1,234,567 views" }));
        assert_eq!(extract_view_count(&page), Some(1_234_567));
    }

    #[test]
    fn runs_in_initial_data() {
        let page = watch_page(json!({ "runs": [{ "text": "999" }, { "text": " views" }] }));
        assert_eq!(extract_view_count(&page), Some(999));
    }

    #[test]
    fn initial_data_wins_over_page_text() {
        let page = format!(
            "<p>42 views</p>{}",
            watch_page(json!({ "simpleText": "500 views" }))
        );
        assert_eq!(extract_view_count(&page), Some(500));
    }

    #[test]
    fn missing_path_falls_back_to_page_text() {
        let page = format!(
            r#"<script>var ytInitialData = {{"contents": []}};</script>"viewCount":"31337""#
        );
        assert_eq!(extract_view_count(&page), Some(31337));
    }

    #[test]
    fn malformed_initial_data_falls_back_to_page_text() {
        let page = r#"<script>var ytInitialData = {"contents": oops};</script> 7,001 views"#;
        assert_eq!(extract_view_count(page), Some(7001));
    }

    #[test]
    fn unparsable_path_value_is_a_miss() {
        let page = format!(
            "{} 12 views",
            watch_page(json!({ "simpleText": "no views yet" }))
        );
        assert_eq!(extract_view_count(&page), Some(12));
    }

    #[test]
    fn json_encoded_simple_text() {
        let page = r#"{"viewCount":{"simpleText":"2,000 views"}}"#;
        assert_eq!(extract_view_count(page), Some(2000));
    }

    #[test]
    fn json_encoded_runs() {
        let page = r#"{"viewCount":{"runs":[{"text":"3,000,000 views"}]}}"#;
        assert_eq!(extract_view_count(page), Some(3_000_000));
    }

    #[test]
    fn localized_unit() {
        let page = "<span>1,234次觀看</span>";
        assert_eq!(extract_view_count(page), Some(1234));
    }

    #[test]
    fn overflowing_number_is_skipped() {
        let page = "99999999999999999999999 views, 5次觀看";
        assert_eq!(extract_view_count(page), Some(5));
    }

    #[test]
    fn nothing_recognizable() {
        assert_eq!(extract_view_count("<html><body>hello</body></html>"), None);
        assert_eq!(extract_view_count(""), None);
    }

    #[test]
    fn separators_are_stripped() {
        assert_eq!(leading_count("1,234,567 views"), Some(1_234_567));
        assert_eq!(leading_count("999 views"), Some(999));
        assert_eq!(leading_count("views"), None);
        assert_eq!(parse_count(","), None);
    }
}
