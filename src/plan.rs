use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::verse_number::{VerseNumber, VerseWindow, compare_labels};

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:-\d+)?)/?$").expect("valid segment regex"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Segments linked from a chapter index page that fall inside `window`.
///
/// Only links that sit directly below the index page's own path count, so
/// navigation to neighbouring chapters is ignored. The result is deduplicated
/// by literal segment and ordered by range start.
pub fn resolve_segments(index_html: &str, index_url: &Url, window: VerseWindow) -> Vec<String> {
    let doc = Html::parse_document(index_html);
    let chapter_path = with_trailing_slash(index_url.path());

    let mut seen = HashSet::new();
    let mut segments = Vec::new();
    for anchor in doc.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(target) = index_url.join(href.trim()) else {
            continue;
        };
        let Some(segment) = segment_below(target.path(), &chapter_path) else {
            continue;
        };
        let Some(number) = VerseNumber::parse(segment) else {
            continue;
        };
        if !number.overlaps(window) {
            continue;
        }
        if seen.insert(segment.to_owned()) {
            segments.push(segment.to_owned());
        }
    }

    segments.sort_by(|a, b| compare_labels(a, b));
    segments
}

fn segment_below<'a>(path: &'a str, chapter_path: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(chapter_path)?;
    let caps = SEGMENT.captures(rest)?;
    caps.get(1).map(|m| m.as_str())
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_owned()
    } else {
        format!("{path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
        <html><body>
          <h1>Chapter 1</h1>
          <a href="/en/library/bg/1/">Chapter 1</a>
          <a href="/en/library/bg/2/">Next chapter</a>
          <a href="/en/library/bg/1/7/">Text 7</a>
          <a href="/en/library/bg/1/3/">Text 3</a>
          <a href="4-5/">Texts 4-5</a>
          <a href="https://vedabase.io/en/library/bg/1/4-5/">Texts 4-5 again</a>
          <a href="/en/library/bg/1/3/side-by-side/uk/">Side by side</a>
          <a href="/en/library/sb/1/1/3/">Other book</a>
        </body></html>
    "#;

    fn index_url() -> Url {
        Url::parse("https://vedabase.io/en/library/bg/1/").unwrap()
    }

    #[test]
    fn keeps_overlapping_segments_in_order() -> anyhow::Result<()> {
        let segments = resolve_segments(INDEX, &index_url(), VerseWindow::new(1, 6)?);
        assert_eq!(segments, vec!["3", "4-5", "7"]);
        Ok(())
    }

    #[test]
    fn window_edge_includes_partial_overlap() -> anyhow::Result<()> {
        let segments = resolve_segments(INDEX, &index_url(), VerseWindow::new(1, 5)?);
        assert_eq!(segments, vec!["3", "4-5"]);

        let segments = resolve_segments(INDEX, &index_url(), VerseWindow::new(5, 5)?);
        assert_eq!(segments, vec!["4-5"]);
        Ok(())
    }

    #[test]
    fn index_without_trailing_slash_still_matches() {
        let url = Url::parse("https://vedabase.io/en/library/bg/1").unwrap();
        let segments = resolve_segments(INDEX, &url, VerseWindow::all());
        assert!(segments.contains(&"7".to_owned()));
    }

    #[test]
    fn empty_index_yields_empty_plan() {
        assert!(resolve_segments("<html></html>", &index_url(), VerseWindow::all()).is_empty());
    }
}
