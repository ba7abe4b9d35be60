use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::{ChapterAddress, SourceExtractor, join_path, non_empty};
use crate::catalog::BookSpec;
use crate::formats::{Language, VerseFields};
use crate::text;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid gitabase selector")
}

static SYNONYMS: LazyLock<Selector> = LazyLock::new(|| selector("div.dia_text"));
static TRANSLATION: LazyLock<Selector> = LazyLock::new(|| {
    selector(concat!(
        "div.row:nth-child(5) > div:nth-child(1) > div:nth-child(2) > ",
        "h4:nth-child(1) > b:nth-child(1)"
    ))
});
static TRANSLATION_FALLBACK: LazyLock<Selector> = LazyLock::new(|| selector("h4 > b"));
static COMMENTARY: LazyLock<Selector> = LazyLock::new(|| {
    selector("div.row:nth-child(6) > div:nth-child(1) > div:nth-child(2) > div:nth-child(1)")
});
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("div.row"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));

/// Ukrainian site: `/ua/{BOOK}/{canto?}/{chapter?}/{segment}`. Transliteration
/// is never taken from here; it is derived from the English IAST instead.
#[derive(Debug, Clone)]
pub struct GitabaseSource {
    base: Url,
}

impl GitabaseSource {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn chapter_path(&self, at: &ChapterAddress<'_>) -> anyhow::Result<Vec<String>> {
        let slug = at
            .book
            .gitabase_slug
            .clone()
            .ok_or_else(|| anyhow::anyhow!("book {} is not published on gitabase", at.book.slug))?;
        let mut path = vec!["ua".to_owned(), slug];
        if at.book.has_cantos
            && let Some(canto) = at.canto
        {
            path.push(canto.to_string());
        }
        if at.book.has_chapters {
            path.push(at.chapter.to_string());
        }
        Ok(path)
    }
}

impl SourceExtractor for GitabaseSource {
    fn id(&self) -> &'static str {
        "gitabase"
    }

    fn language(&self) -> Language {
        Language::Uk
    }

    fn supports(&self, book: &BookSpec) -> bool {
        book.gitabase_slug.is_some()
    }

    fn index_url(&self, at: &ChapterAddress<'_>) -> anyhow::Result<Url> {
        let path = self.chapter_path(at)?;
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        join_path(&self.base, &segments, false)
    }

    fn segment_url(&self, at: &ChapterAddress<'_>, segment: &str) -> anyhow::Result<Url> {
        let mut path = self.chapter_path(at)?;
        path.push(segment.to_owned());
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        join_path(&self.base, &segments, false)
    }

    fn parse_segment(&self, html: &str, url: &Url) -> Option<VerseFields> {
        let doc = Html::parse_document(html);

        let synonyms_uk = doc
            .select(&SYNONYMS)
            .next()
            .map(text::element_text)
            .unwrap_or_default();
        let translation_uk = doc
            .select(&TRANSLATION)
            .next()
            .or_else(|| doc.select(&TRANSLATION_FALLBACK).next())
            .map(text::element_text)
            .unwrap_or_default();
        let commentary_uk = match doc.select(&COMMENTARY).next() {
            Some(container) => text::paragraphs(container, 50),
            None => commentary_from_rows(&doc, &[&translation_uk, &synonyms_uk]),
        };

        let fields = VerseFields {
            synonyms_uk: non_empty(synonyms_uk),
            translation_uk: non_empty(translation_uk),
            commentary_uk: non_empty(commentary_uk),
            ..VerseFields::default()
        };
        if fields.is_empty() {
            tracing::debug!(%url, "gitabase page has no usable fields");
            return None;
        }
        Some(fields)
    }
}

/// Long paragraphs anywhere in the page rows, minus text already used for
/// other fields.
fn commentary_from_rows(doc: &Html, exclude: &[&str]) -> String {
    let mut seen = HashSet::new();
    let mut parts = Vec::new();
    for row in doc.select(&ROW) {
        for p in row.select(&PARAGRAPH) {
            let text = text::element_text(p);
            if text.chars().count() > 100
                && !exclude.contains(&text.as_str())
                && seen.insert(text.clone())
            {
                parts.push(text);
            }
        }
    }
    parts.join("\n\n")
}
