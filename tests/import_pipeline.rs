mod common;

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use verse_import::catalog::BookCatalog;
use verse_import::config::ImportConfig;
use verse_import::formats::ChapterStatus;
use verse_import::pipeline::{ImportPipeline, ImportRequest};
use verse_import::retry::RetryPolicy;
use verse_import::sources::SourceRegistry;
use verse_import::store::{ContentStore, JsonFileStore, LIBRARY_FILE};

fn fixture_config(server: &common::FixtureServer) -> anyhow::Result<ImportConfig> {
    Ok(ImportConfig {
        retry: RetryPolicy::no_delay(2),
        request_timeout: Duration::from_secs(5),
        throttle: Duration::ZERO,
        vedabase_base: Url::parse(&server.vedabase_base())?,
        gitabase_base: Url::parse(&server.gitabase_base())?,
        ..ImportConfig::default()
    })
}

fn pipeline(config: ImportConfig, store: Arc<JsonFileStore>) -> anyhow::Result<ImportPipeline> {
    let registry = SourceRegistry::builtin(&config);
    let fetcher = config.build_fetcher()?;
    Ok(ImportPipeline::new(
        config,
        BookCatalog::builtin(),
        registry,
        fetcher,
        store,
    ))
}

#[tokio::test]
async fn imports_chapter_from_both_sites_and_reruns_cleanly() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages());
    let temp = tempfile::TempDir::new()?;
    let store = Arc::new(JsonFileStore::open(temp.path()).await?);
    let pipeline = pipeline(fixture_config(&server)?, store.clone())?;

    let request = ImportRequest::new("gita", vec![1]);
    let report = pipeline.run_batch(&request).await?;

    assert_eq!(report.chapters_succeeded, 1);
    assert_eq!(report.chapters_failed, 0);
    assert_eq!(report.verses_written, 3);
    assert!(report.finished_at.is_some());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].segment, "3-4");
    assert_eq!(report.skipped[0].source, "gitabase");
    assert!(temp.path().join(LIBRARY_FILE).is_file());

    let book = store.find_book("gita").await?.expect("book row");
    let chapter = store.find_chapter(&book.id, None, 1).await?.expect("chapter row");
    assert_eq!(chapter.title_en.as_deref(), Some("Chapter 1: Observing the Armies"));
    assert_eq!(chapter.title_uk.as_deref(), Some("Огляд армій"));

    let verses = store.list_verses(&chapter.id).await?;
    let labels: Vec<&str> = verses.iter().map(|v| v.verse_number.as_str()).collect();
    assert_eq!(labels, vec!["1", "2", "3-4"]);

    let first = &verses[0].fields;
    assert_eq!(
        first.translation_en.as_deref(),
        Some("Dhṛtarāṣṭra said: O Sañjaya, what did my sons do?")
    );
    assert_eq!(
        first.translation_uk.as_deref(),
        Some("Дгрітараштра сказав: О Санджайо...")
    );
    assert_eq!(
        first.synonyms_uk.as_deref(),
        Some("дгарма-кшетре — на святому місці")
    );
    assert!(first.transliteration_uk.is_some());
    assert_eq!(verses[2].fields.translation_uk, None);

    // Second run finds everything in place.
    let rerun = pipeline.run_batch(&request).await?;
    assert_eq!(rerun.chapters_succeeded, 1);
    assert_eq!(rerun.verses_written, 0);
    assert_eq!(store.list_verses(&chapter.id).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn missing_chapter_does_not_stop_the_batch() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages());
    let store = Arc::new(JsonFileStore::in_memory());
    let pipeline = pipeline(fixture_config(&server)?, store)?;

    let mut request = ImportRequest::new("gita", vec![1, 2]);
    request.secondary = None;
    let report = pipeline.run_batch(&request).await?;

    assert_eq!(report.chapters_succeeded, 1);
    assert_eq!(report.chapters_failed, 1);
    assert!(matches!(
        &report.chapters[1].status,
        ChapterStatus::Failed { reason } if reason.contains("not found")
    ));
    assert_eq!(report.errors.len(), 1);
    report.ensure_usable()?;
    Ok(())
}

#[tokio::test]
async fn store_survives_reopen() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages());
    let temp = tempfile::TempDir::new()?;
    {
        let store = Arc::new(JsonFileStore::open(temp.path()).await?);
        let pipeline = pipeline(fixture_config(&server)?, store)?;
        let mut request = ImportRequest::new("bg", vec![1]);
        request.verses = verse_import::verse_number::VerseWindow::new(2, 2)?;
        pipeline.run_batch(&request).await?.ensure_usable()?;
    }

    let reopened = JsonFileStore::open(temp.path()).await?;
    let book = reopened.find_book("gita").await?.expect("book row");
    let chapter = reopened.find_chapter(&book.id, None, 1).await?.expect("chapter row");
    let verses = reopened.list_verses(&chapter.id).await?;
    assert_eq!(verses.len(), 1);
    assert_eq!(verses[0].verse_number, "2");
    Ok(())
}

#[tokio::test]
async fn merged_verse_keeps_fields_from_each_side() -> anyhow::Result<()> {
    let server = common::spawn_fixture_server(common::gita_pages_with_sparse_chapter());
    let store = Arc::new(JsonFileStore::in_memory());
    let pipeline = pipeline(fixture_config(&server)?, store.clone())?;

    let report = pipeline.run_batch(&ImportRequest::new("gita", vec![2])).await?;
    assert_eq!(report.chapters_succeeded, 1);
    assert_eq!(report.verses_written, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].segment, "2");

    let book = store.find_book("gita").await?.expect("book row");
    let chapter = store.find_chapter(&book.id, None, 2).await?.expect("chapter row");
    assert_eq!(chapter.title_uk.as_deref(), Some("Зміст Ґіти"));

    let verses = store.list_verses(&chapter.id).await?;
    assert_eq!(verses.len(), 2);

    let both = &verses[0].fields;
    assert_eq!(
        both.translation_en.as_deref(),
        Some("Sañjaya said: Seeing Arjuna full of compassion.")
    );
    assert_eq!(
        both.translation_uk.as_deref(),
        Some("Санджая сказав: Побачивши Арджуну...")
    );
    assert_eq!(
        both.synonyms_uk.as_deref(),
        Some("там — тоді; крпайа — співчуттям")
    );
    assert_eq!(both.synonyms_en, None);
    assert_eq!(both.sanskrit, None);
    assert_eq!(both.transliteration_en, None);
    assert_eq!(both.transliteration_uk, None);

    let english_only = &verses[1].fields;
    assert!(english_only.translation_en.is_some());
    assert_eq!(english_only.translation_uk, None);
    assert_eq!(english_only.synonyms_uk, None);
    Ok(())
}
