//! CLI command handlers. Each prints its JSON result to stdout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;

use crate::catalog::BookCatalog;
use crate::cli::{
    CantoAddArgs, ImportArgs, ImportFileArgs, PlanArgs, ShowArgs, secondary_source,
};
use crate::config::ImportConfig;
use crate::formats::{ImportReport, Language};
use crate::merge::MergeOptions;
use crate::persist;
use crate::pipeline::{ImportPipeline, ImportRequest, import_fragments};
use crate::sources::SourceRegistry;
use crate::split;
use crate::store::{ChapterRow, ContentStore, JsonFileStore, VerseRow};
use crate::upload;
use crate::verse_number::VerseWindow;

pub async fn import(args: ImportArgs) -> anyhow::Result<()> {
    let mut config = ImportConfig::from_env().context("load config")?;
    if let Some(ms) = args.throttle_ms {
        config.throttle = Duration::from_millis(ms);
    }
    let catalog = BookCatalog::load(args.catalog.catalog.as_deref()).context("load catalog")?;

    let mut request = ImportRequest::with_targets(&args.book, args.chapters.0);
    if let Some(canto) = args.canto {
        request = request.in_canto(canto);
    }
    request.verses = parse_window(args.verses.as_deref())?;
    request.primary = args.primary;
    request.secondary = secondary_source(&args.secondary);

    let store = JsonFileStore::open(&args.store).await.context("open store")?;
    let registry = SourceRegistry::builtin(&config);
    let fetcher = config.build_fetcher()?;
    let pipeline = ImportPipeline::new(config, catalog, registry, fetcher, Arc::new(store));

    let report = pipeline.run_batch(&request).await?;
    emit_report(&report, args.report.as_deref()).await
}

pub async fn import_file(args: ImportFileArgs) -> anyhow::Result<()> {
    let config = ImportConfig::from_env().context("load config")?;
    let catalog = BookCatalog::load(args.catalog.catalog.as_deref()).context("load catalog")?;
    let spec = catalog.get(&args.book)?;
    let language = Language::parse(&args.language)?;

    let path = args.path.clone();
    let text = tokio::task::spawn_blocking(move || upload::extract_text(&path))
        .await
        .context("join text extraction")??;
    let fragments = split::split_chapters(&text, language);
    if fragments.is_empty() {
        anyhow::bail!("no chapters found in {}", args.path.display());
    }
    tracing::info!(
        path = %args.path.display(),
        chapters = fragments.len(),
        ?language,
        "split uploaded file"
    );

    let store = JsonFileStore::open(&args.store).await.context("open store")?;
    let options = MergeOptions::from(&config);
    let report = import_fragments(&store, spec, args.canto, fragments, options).await?;
    emit_report(&report, args.report.as_deref()).await
}

pub async fn plan(args: PlanArgs) -> anyhow::Result<()> {
    let config = ImportConfig::from_env().context("load config")?;
    let catalog = BookCatalog::load(args.catalog.catalog.as_deref()).context("load catalog")?;
    let registry = SourceRegistry::builtin(&config);
    let fetcher = config.build_fetcher()?;
    let pipeline = ImportPipeline::new(
        config,
        catalog,
        registry,
        fetcher,
        Arc::new(JsonFileStore::in_memory()),
    );

    let plan = pipeline
        .plan_chapter(
            &args.book,
            args.canto,
            args.chapter,
            parse_window(args.verses.as_deref())?,
            &args.primary,
            secondary_source(&args.secondary).as_deref(),
        )
        .await?;
    print_json(&plan)
}

pub async fn canto_add(args: CantoAddArgs) -> anyhow::Result<()> {
    let catalog = BookCatalog::load(args.catalog.catalog.as_deref()).context("load catalog")?;
    let spec = catalog.get(&args.book)?;
    if !spec.has_cantos {
        anyhow::bail!("book {} has no cantos", spec.slug);
    }

    let store = JsonFileStore::open(&args.store).await.context("open store")?;
    let book = persist::ensure_book(&store, spec).await?;
    let canto =
        persist::register_canto(&store, &book, args.number, args.title_en, args.title_uk).await?;
    print_json(&canto)
}

#[derive(Debug, Serialize)]
struct ChapterView {
    book: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    canto: Option<u32>,
    chapter: ChapterRow,
    verses: Vec<VerseRow>,
}

pub async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let catalog = BookCatalog::load(args.catalog.catalog.as_deref()).context("load catalog")?;
    let spec = catalog.get(&args.book)?;
    let store = JsonFileStore::open(&args.store).await.context("open store")?;

    let book = store
        .find_book(&spec.slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("book {} has not been imported", spec.slug))?;
    let canto = persist::resolve_canto(&store, &book, args.canto).await?;
    let chapter = store
        .find_chapter(&book.id, canto.as_ref().map(|c| c.id.as_str()), args.chapter)
        .await?
        .ok_or_else(|| anyhow::anyhow!("chapter {} of {} is not stored", args.chapter, spec.slug))?;
    let verses = store.list_verses(&chapter.id).await?;

    print_json(&ChapterView {
        book: book.slug,
        canto: canto.map(|c| c.canto_number),
        chapter,
        verses,
    })
}

fn parse_window(raw: Option<&str>) -> anyhow::Result<VerseWindow> {
    match raw {
        Some(raw) => VerseWindow::parse(raw),
        None => Ok(VerseWindow::all()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

/// Prints the report (and writes it to `path`), then fails when nothing in
/// the batch was usable.
async fn emit_report(report: &ImportReport, path: Option<&Path>) -> anyhow::Result<()> {
    print_json(report)?;
    if let Some(path) = path {
        let json = serde_json::to_vec_pretty(report).context("serialize report")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("write report: {}", path.display()))?;
    }
    report.ensure_usable()
}
