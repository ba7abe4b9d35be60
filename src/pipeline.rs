use std::sync::Arc;

use anyhow::Context as _;
use url::Url;

use crate::catalog::{BookCatalog, BookSpec};
use crate::config::ImportConfig;
use crate::fetch::{FetchOutcome, HtmlFetcher, fetch_with_retry};
use crate::formats::{
    ChapterFragment, ChapterRecord, ChapterType, ImportReport, SkippedSegment, VerseEntry,
};
use crate::merge::{MergeOptions, merge_fragments};
use crate::persist;
use crate::sources::{ChapterAddress, SourceExtractor, SourceRegistry};
use crate::store::{BookRow, CantoRow, ContentStore};
use crate::verse_number::VerseWindow;

pub const DEFAULT_PRIMARY: &str = "vedabase";
pub const DEFAULT_SECONDARY: &str = "gitabase";

/// One chapter of a batch, optionally inside a canto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChapterTarget {
    pub canto: Option<u32>,
    pub chapter: u32,
}

impl ChapterTarget {
    pub fn new(canto: Option<u32>, chapter: u32) -> Self {
        Self { canto, chapter }
    }
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub book: String,
    pub chapters: Vec<ChapterTarget>,
    pub verses: VerseWindow,
    pub primary: String,
    pub secondary: Option<String>,
}

impl ImportRequest {
    /// Chapters outside any canto.
    pub fn new(book: impl Into<String>, chapters: Vec<u32>) -> Self {
        let targets = chapters
            .into_iter()
            .map(|chapter| ChapterTarget::new(None, chapter))
            .collect();
        Self::with_targets(book, targets)
    }

    pub fn with_targets(book: impl Into<String>, chapters: Vec<ChapterTarget>) -> Self {
        Self {
            book: book.into(),
            chapters,
            verses: VerseWindow::all(),
            primary: DEFAULT_PRIMARY.to_owned(),
            secondary: Some(DEFAULT_SECONDARY.to_owned()),
        }
    }

    /// Moves every chapter that has no canto yet into `canto`.
    pub fn in_canto(mut self, canto: u32) -> Self {
        for target in &mut self.chapters {
            target.canto.get_or_insert(canto);
        }
        self
    }
}

/// One planned segment with the URL each source would fetch it from.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlannedSegment {
    pub segment: String,
    pub primary_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_url: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChapterPlan {
    pub book: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canto: Option<u32>,
    pub chapter: u32,
    pub index_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub segments: Vec<PlannedSegment>,
}

pub struct ImportPipeline {
    config: ImportConfig,
    catalog: BookCatalog,
    registry: SourceRegistry,
    fetcher: Arc<dyn HtmlFetcher>,
    store: Arc<dyn ContentStore>,
}

struct ChapterSources<'a> {
    primary: &'a dyn SourceExtractor,
    secondary: Option<&'a dyn SourceExtractor>,
}

impl ImportPipeline {
    pub fn new(
        config: ImportConfig,
        catalog: BookCatalog,
        registry: SourceRegistry,
        fetcher: Arc<dyn HtmlFetcher>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            registry,
            fetcher,
            store,
        }
    }

    /// Imports every requested chapter. Per-chapter problems end up in the
    /// report; only an unknown book or source, or a store that cannot hold the
    /// book row, fails the whole batch.
    pub async fn run_batch(&self, request: &ImportRequest) -> anyhow::Result<ImportReport> {
        let spec = self.catalog.get(&request.book)?;
        let sources = self.sources_for(spec, &request.primary, request.secondary.as_deref())?;
        let book = persist::ensure_book(self.store.as_ref(), spec)
            .await
            .with_context(|| format!("resolve book {}", spec.slug))?;

        let mut report = ImportReport::new(&spec.slug);
        tracing::info!(
            book = %spec.slug,
            chapters = request.chapters.len(),
            primary = sources.primary.id(),
            secondary = ?sources.secondary.map(|s| s.id()),
            "starting import"
        );

        for &target in &request.chapters {
            let ChapterTarget { canto, chapter } = target;
            match self
                .import_chapter(spec, &book, &sources, request, target, &mut report)
                .await
            {
                Ok((chapter_id, written)) => {
                    tracing::info!(?canto, chapter, verses_written = written, "chapter imported");
                    report.record_success(canto, chapter, chapter_id, written);
                }
                Err(reason) => {
                    tracing::warn!(?canto, chapter, %reason, "chapter failed");
                    report.record_failure(canto, chapter, reason);
                }
            }
        }

        report.finish();
        tracing::info!(
            succeeded = report.chapters_succeeded,
            failed = report.chapters_failed,
            verses_written = report.verses_written,
            skipped = report.skipped.len(),
            "import finished"
        );
        Ok(report)
    }

    /// Resolves the segment list of one chapter without writing anything.
    pub async fn plan_chapter(
        &self,
        book: &str,
        canto: Option<u32>,
        chapter: u32,
        window: VerseWindow,
        primary: &str,
        secondary: Option<&str>,
    ) -> anyhow::Result<ChapterPlan> {
        let spec = self.catalog.get(book)?;
        let sources = self.sources_for(spec, primary, secondary)?;
        let at = ChapterAddress {
            book: spec,
            canto,
            chapter,
        };
        let index_url = sources.primary.index_url(&at)?;
        let index_html = match self.fetch(&index_url).await {
            FetchOutcome::Html(html) => html,
            FetchOutcome::NotFound => anyhow::bail!("chapter index not found: {index_url}"),
            FetchOutcome::Error(err) => anyhow::bail!("fetch {index_url}: {err}"),
        };

        let mut segments = Vec::new();
        for segment in sources.primary.fetch_plan(&index_html, &index_url, window) {
            let secondary_url = match sources.secondary {
                Some(source) => Some(source.segment_url(&at, &segment)?.to_string()),
                None => None,
            };
            segments.push(PlannedSegment {
                primary_url: sources.primary.segment_url(&at, &segment)?.to_string(),
                secondary_url,
                segment,
            });
        }

        Ok(ChapterPlan {
            book: spec.slug.clone(),
            canto,
            chapter,
            index_url: index_url.to_string(),
            title: sources.primary.parse_chapter_title(&index_html),
            segments,
        })
    }

    fn sources_for<'a>(
        &'a self,
        spec: &BookSpec,
        primary: &str,
        secondary: Option<&str>,
    ) -> anyhow::Result<ChapterSources<'a>> {
        let primary = self.registry.get(primary)?;
        if !primary.supports(spec) {
            anyhow::bail!("source {} does not publish {}", primary.id(), spec.slug);
        }
        let secondary = match secondary {
            Some(id) => {
                let source = self.registry.get(id)?;
                if source.supports(spec) {
                    Some(source)
                } else {
                    tracing::warn!(
                        source = id,
                        book = %spec.slug,
                        "secondary source does not publish this book; skipping it"
                    );
                    None
                }
            }
            None => None,
        };
        Ok(ChapterSources { primary, secondary })
    }

    async fn fetch(&self, url: &Url) -> FetchOutcome {
        fetch_with_retry(self.fetcher.as_ref(), &self.config.retry, url).await
    }

    async fn pause(&self) {
        if !self.config.throttle.is_zero() {
            tokio::time::sleep(self.config.throttle).await;
        }
    }

    async fn import_chapter(
        &self,
        spec: &BookSpec,
        book: &BookRow,
        sources: &ChapterSources<'_>,
        request: &ImportRequest,
        target: ChapterTarget,
        report: &mut ImportReport,
    ) -> Result<(String, usize), String> {
        let ChapterTarget { canto: canto_number, chapter } = target;
        let canto = persist::resolve_canto(self.store.as_ref(), book, canto_number)
            .await
            .map_err(|err| format!("{err:#}"))?;
        if !spec.has_chapters && chapter != 1 {
            return Err(format!("{} has no chapters; use chapter 1", spec.slug));
        }

        let at = ChapterAddress {
            book: spec,
            canto: canto_number,
            chapter,
        };
        let index_url = sources.primary.index_url(&at).map_err(|err| format!("{err:#}"))?;
        let index_html = match self.fetch(&index_url).await {
            FetchOutcome::Html(html) => html,
            FetchOutcome::NotFound => return Err(format!("chapter index not found: {index_url}")),
            FetchOutcome::Error(err) => return Err(format!("fetch {index_url}: {err}")),
        };
        let segments = sources
            .primary
            .fetch_plan(&index_html, &index_url, request.verses);
        if segments.is_empty() {
            return Err(format!("no verses in range on {index_url}"));
        }
        tracing::debug!(chapter, segments = segments.len(), "resolved fetch plan");

        let mut primary = fragment(sources.primary, chapter);
        primary.title = sources.primary.parse_chapter_title(&index_html);
        let mut secondary = sources.secondary.map(|source| fragment(source, chapter));
        if let (Some(source), Some(fragment)) = (sources.secondary, secondary.as_mut()) {
            fragment.title = self.secondary_title(source, &at).await;
        }

        for segment in &segments {
            self.pause().await;
            let primary_url = sources
                .primary
                .segment_url(&at, segment)
                .map_err(|err| format!("{err:#}"))?;
            let secondary_url = match sources.secondary {
                Some(source) => Some(
                    source
                        .segment_url(&at, segment)
                        .map_err(|err| format!("{err:#}"))?,
                ),
                None => None,
            };

            let secondary_fetch = async {
                match &secondary_url {
                    Some(url) => Some(self.fetch(url).await),
                    None => None,
                }
            };
            let (primary_outcome, secondary_outcome) =
                tokio::join!(self.fetch(&primary_url), secondary_fetch);

            collect_segment(
                sources.primary,
                &mut primary,
                segment,
                &primary_url,
                primary_outcome,
                canto_number,
                report,
            );
            if let (Some(source), Some(fragment), Some(url), Some(outcome)) = (
                sources.secondary,
                secondary.as_mut(),
                secondary_url.as_ref(),
                secondary_outcome,
            ) {
                collect_segment(source, fragment, segment, url, outcome, canto_number, report);
            }
        }

        let mut fragments = vec![primary];
        fragments.extend(secondary);
        let record = merge_fragments(chapter, &fragments, MergeOptions::from(&self.config))
            .map_err(|err| err.to_string())?;

        persist_record(self.store.as_ref(), book, canto.as_ref(), &record).await
    }

    async fn secondary_title(
        &self,
        source: &dyn SourceExtractor,
        at: &ChapterAddress<'_>,
    ) -> Option<String> {
        let url = source.index_url(at).ok()?;
        self.pause().await;
        match self.fetch(&url).await {
            FetchOutcome::Html(html) => source.parse_chapter_title(&html),
            FetchOutcome::NotFound => None,
            FetchOutcome::Error(err) => {
                tracing::debug!(%url, %err, "secondary chapter index unavailable");
                None
            }
        }
    }
}

fn fragment(source: &dyn SourceExtractor, chapter: u32) -> ChapterFragment {
    ChapterFragment {
        source: source.id().to_owned(),
        language: source.language(),
        chapter_number: chapter,
        title: None,
        chapter_type: ChapterType::Verses,
        content: None,
        verses: Vec::new(),
    }
}

fn collect_segment(
    source: &dyn SourceExtractor,
    fragment: &mut ChapterFragment,
    segment: &str,
    url: &Url,
    outcome: FetchOutcome,
    canto: Option<u32>,
    report: &mut ImportReport,
) {
    let reason = match outcome {
        FetchOutcome::Html(html) => match source.parse_segment(&html, url) {
            Some(fields) => {
                fragment.verses.push(VerseEntry {
                    verse_number: segment.to_owned(),
                    fields,
                });
                return;
            }
            None => "no content parsed".to_owned(),
        },
        FetchOutcome::NotFound => "not found".to_owned(),
        FetchOutcome::Error(err) => err,
    };

    tracing::debug!(source = source.id(), segment, %url, %reason, "skipping segment");
    report.skipped.push(SkippedSegment {
        canto,
        chapter_number: fragment.chapter_number,
        segment: segment.to_owned(),
        source: source.id().to_owned(),
        reason,
    });
}

async fn persist_record(
    store: &dyn ContentStore,
    book: &BookRow,
    canto: Option<&CantoRow>,
    record: &ChapterRecord,
) -> Result<(String, usize), String> {
    let chapter = persist::upsert_chapter(store, book, canto, record)
        .await
        .map_err(|err| format!("store chapter: {err:#}"))?;
    let stats = persist::upsert_verses(store, &chapter, &record.verses)
        .await
        .map_err(|err| format!("store verses: {err:#}"))?;
    tracing::debug!(
        chapter = record.chapter_number,
        inserted = stats.inserted,
        updated = stats.updated,
        unchanged = stats.unchanged,
        "stored chapter"
    );
    Ok((chapter.id, stats.written()))
}

/// Persists chapters that were already split from an uploaded file. They
/// take the same merge and upsert path as web imports, with a single source.
pub async fn import_fragments(
    store: &dyn ContentStore,
    spec: &BookSpec,
    canto: Option<u32>,
    fragments: Vec<ChapterFragment>,
    options: MergeOptions,
) -> anyhow::Result<ImportReport> {
    let book = persist::ensure_book(store, spec)
        .await
        .with_context(|| format!("resolve book {}", spec.slug))?;
    let mut report = ImportReport::new(&spec.slug);

    for fragment in fragments {
        let chapter = fragment.chapter_number;
        let outcome = async {
            let canto_row = persist::resolve_canto(store, &book, canto)
                .await
                .map_err(|err| format!("{err:#}"))?;
            let record = merge_fragments(chapter, std::slice::from_ref(&fragment), options)
                .map_err(|err| err.to_string())?;
            persist_record(store, &book, canto_row.as_ref(), &record).await
        }
        .await;

        match outcome {
            Ok((chapter_id, written)) => {
                report.record_success(canto, chapter, chapter_id, written);
            }
            Err(reason) => {
                tracing::warn!(chapter, %reason, "chapter failed");
                report.record_failure(canto, chapter, reason);
            }
        }
    }

    report.finish();
    Ok(report)
}
