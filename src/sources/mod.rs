pub mod gitabase;
pub mod vedabase;
pub mod vedabase_uk;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::catalog::BookSpec;
use crate::config::ImportConfig;
use crate::formats::{Language, VerseFields};
use crate::plan;
use crate::text;
use crate::verse_number::VerseWindow;

pub use gitabase::GitabaseSource;
pub use vedabase::VedabaseSource;
pub use vedabase_uk::VedabaseUkSource;

static FIRST_H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid h1"));

/// Where one chapter lives in a book.
#[derive(Debug, Clone, Copy)]
pub struct ChapterAddress<'a> {
    pub book: &'a BookSpec,
    pub canto: Option<u32>,
    pub chapter: u32,
}

/// One source site. Implementations are stateless and only know about their
/// own URL layout and DOM.
pub trait SourceExtractor: Send + Sync {
    fn id(&self) -> &'static str;

    fn language(&self) -> Language;

    /// Whether the site publishes this book at all.
    fn supports(&self, _book: &BookSpec) -> bool {
        true
    }

    fn index_url(&self, at: &ChapterAddress<'_>) -> anyhow::Result<Url>;

    fn segment_url(&self, at: &ChapterAddress<'_>, segment: &str) -> anyhow::Result<Url>;

    /// Segments to fetch for `window`, read from the chapter index page.
    fn fetch_plan(&self, index_html: &str, index_url: &Url, window: VerseWindow) -> Vec<String> {
        plan::resolve_segments(index_html, index_url, window)
    }

    /// Parsed fields of one segment page, or `None` when nothing usable was
    /// found on it.
    fn parse_segment(&self, html: &str, url: &Url) -> Option<VerseFields>;

    fn parse_chapter_title(&self, index_html: &str) -> Option<String> {
        first_heading(index_html)
    }
}

pub(crate) fn first_heading(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&FIRST_H1)
        .next()
        .map(text::element_text)
        .filter(|title| !title.is_empty())
}

/// Joins path segments onto `base` without dropping any path prefix the base
/// already carries.
pub(crate) fn join_path(
    base: &Url,
    segments: &[&str],
    trailing_slash: bool,
) -> anyhow::Result<Url> {
    let mut raw = base.as_str().trim_end_matches('/').to_owned();
    for segment in segments {
        raw.push('/');
        raw.push_str(segment.trim_matches('/'));
    }
    if trailing_slash {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|err| anyhow::anyhow!("invalid source url {raw:?}: {err}"))
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

pub struct SourceRegistry {
    sources: BTreeMap<&'static str, Box<dyn SourceExtractor>>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            sources: BTreeMap::new(),
        }
    }

    /// Registry with every built-in site, addressed through `config`'s base URLs.
    pub fn builtin(config: &ImportConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(VedabaseSource::new(config.vedabase_base.clone()));
        registry.register(GitabaseSource::new(config.gitabase_base.clone()));
        registry.register(VedabaseUkSource::new(config.vedabase_base.clone()));
        registry
    }

    pub fn register(&mut self, source: impl SourceExtractor + 'static) {
        self.sources.insert(source.id(), Box::new(source));
    }

    pub fn get(&self, id: &str) -> anyhow::Result<&dyn SourceExtractor> {
        self.sources
            .get(id)
            .map(|source| source.as_ref())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown source {id:?} (known: {})",
                    self.ids().collect::<Vec<_>>().join(", ")
                )
            })
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sources.keys().copied()
    }
}
