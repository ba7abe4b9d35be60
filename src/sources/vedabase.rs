use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{ChapterAddress, SourceExtractor, join_path, non_empty};
use crate::formats::{Language, VerseFields};
use crate::text;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid vedabase selector")
}

static SCRIPT_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| selector(".av-bengali div.text-center, .av-devanagari div.text-center"));
static VERSE_TAG: LazyLock<Selector> =
    LazyLock::new(|| selector("r.verse, r[class*='verse']"));
static SCRIPT_FALLBACK: LazyLock<Selector> =
    LazyLock::new(|| selector(".av-bengali, .av-devanagari"));
static TRANSLIT_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| selector(".av-verse_text .text-center.italic em"));
static SYNONYMS: LazyLock<Selector> = LazyLock::new(|| selector(".av-synonyms .text-justify"));
static SYNONYM_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("span.inline"));
static TRANSLATION: LazyLock<Selector> = LazyLock::new(|| selector(".av-translation strong"));
static PURPORT: LazyLock<Selector> = LazyLock::new(|| selector(".av-purport"));

/// English library site: `/en/library/{book}/{canto?}/{chapter?}/{segment}/`.
#[derive(Debug, Clone)]
pub struct VedabaseSource {
    base: Url,
}

impl VedabaseSource {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

pub(crate) fn library_path(at: &ChapterAddress<'_>) -> Vec<String> {
    let mut path = vec![
        "en".to_owned(),
        "library".to_owned(),
        at.book.source_slug.clone(),
    ];
    if at.book.has_cantos
        && let Some(canto) = at.canto
    {
        path.push(at.book.canto_path(canto));
    }
    if at.book.has_chapters {
        path.push(at.chapter.to_string());
    }
    path
}

impl SourceExtractor for VedabaseSource {
    fn id(&self) -> &'static str {
        "vedabase"
    }

    fn language(&self) -> Language {
        Language::En
    }

    fn index_url(&self, at: &ChapterAddress<'_>) -> anyhow::Result<Url> {
        let path = library_path(at);
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        join_path(&self.base, &segments, true)
    }

    fn segment_url(&self, at: &ChapterAddress<'_>, segment: &str) -> anyhow::Result<Url> {
        let mut path = library_path(at);
        path.push(segment.to_owned());
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        join_path(&self.base, &segments, true)
    }

    fn parse_segment(&self, html: &str, url: &Url) -> Option<VerseFields> {
        let doc = Html::parse_document(html);

        let transliteration_en = non_empty(transliteration(&doc));
        let translation_en = doc
            .select(&TRANSLATION)
            .next()
            .map(text::element_text)
            .and_then(non_empty);

        if transliteration_en.is_none() && translation_en.is_none() {
            tracing::debug!(%url, "vedabase page has neither transliteration nor translation");
            return None;
        }

        Some(VerseFields {
            sanskrit: non_empty(original_script(&doc)),
            transliteration_en,
            synonyms_en: non_empty(synonyms(&doc)),
            translation_en,
            commentary_en: doc
                .select(&PURPORT)
                .next()
                .map(|purport| text::paragraphs(purport, 10))
                .and_then(non_empty),
            ..VerseFields::default()
        })
    }
}

/// Composite verses carry one block per verse; they are kept apart by a
/// blank line.
fn original_script(doc: &Html) -> String {
    let blocks: Vec<String> = doc
        .select(&SCRIPT_BLOCKS)
        .filter(|block| block.text().collect::<String>().trim().chars().count() > 10)
        .map(text::element_text_with_breaks)
        .filter(|block| !block.is_empty())
        .collect();
    if !blocks.is_empty() {
        return blocks.join("\n\n");
    }

    doc.select(&VERSE_TAG)
        .next()
        .or_else(|| doc.select(&SCRIPT_FALLBACK).next())
        .map(text::element_text_with_breaks)
        .unwrap_or_default()
}

fn transliteration(doc: &Html) -> String {
    doc.select(&TRANSLIT_BLOCKS)
        .map(text::element_text_with_breaks)
        .filter(|block| block.split_whitespace().count() > 2)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn synonyms(doc: &Html) -> String {
    let Some(container) = doc.select(&SYNONYMS).next() else {
        return String::new();
    };

    let mut seen = HashSet::new();
    let mut parts = Vec::new();
    for item in container.select(&SYNONYM_ITEM) {
        if has_inline_ancestor(item) {
            continue;
        }
        let raw = text::element_text(item);
        let cleaned = raw.trim_end().trim_end_matches(';').trim().to_owned();
        if !cleaned.is_empty() && seen.insert(cleaned.clone()) {
            parts.push(cleaned);
        }
    }
    parts.join("; ")
}

fn has_inline_ancestor(item: ElementRef<'_>) -> bool {
    item.ancestors().filter_map(ElementRef::wrap).any(|el| {
        el.value().name() == "span" && el.value().classes().any(|class| class == "inline")
    })
}
