use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::formats::{ChapterType, VerseFields};
use crate::verse_number::compare_labels;

pub const LIBRARY_FILE: &str = "library.json";

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookRow {
    pub id: String,
    pub slug: String,
    pub title_en: String,
    pub title_uk: String,
    pub has_cantos: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CantoRow {
    pub id: String,
    pub book_id: String,
    pub canto_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_uk: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterRow {
    pub id: String,
    pub book_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canto_id: Option<String>,
    pub chapter_number: u32,
    pub chapter_type: ChapterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_uk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_uk: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerseRow {
    pub id: String,
    pub chapter_id: String,
    pub verse_number: String,
    pub sort_key: String,
    #[serde(flatten)]
    pub fields: VerseFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book → canto → chapter → verse storage. Rows are looked up by their
/// natural identity; inserts of an identity that already exists fail.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_book(&self, slug: &str) -> anyhow::Result<Option<BookRow>>;
    async fn insert_book(&self, book: &BookRow) -> anyhow::Result<()>;

    async fn find_canto(&self, book_id: &str, canto_number: u32)
    -> anyhow::Result<Option<CantoRow>>;
    async fn insert_canto(&self, canto: &CantoRow) -> anyhow::Result<()>;

    async fn find_chapter(
        &self,
        book_id: &str,
        canto_id: Option<&str>,
        chapter_number: u32,
    ) -> anyhow::Result<Option<ChapterRow>>;
    async fn insert_chapter(&self, chapter: &ChapterRow) -> anyhow::Result<()>;
    async fn update_chapter(&self, chapter: &ChapterRow) -> anyhow::Result<()>;

    async fn find_verse(
        &self,
        chapter_id: &str,
        verse_number: &str,
    ) -> anyhow::Result<Option<VerseRow>>;
    async fn insert_verse(&self, verse: &VerseRow) -> anyhow::Result<()>;
    async fn update_verse(&self, verse: &VerseRow) -> anyhow::Result<()>;

    /// Verses of a chapter in reading order.
    async fn list_verses(&self, chapter_id: &str) -> anyhow::Result<Vec<VerseRow>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Library {
    #[serde(default)]
    books: Vec<BookRow>,
    #[serde(default)]
    cantos: Vec<CantoRow>,
    #[serde(default)]
    chapters: Vec<ChapterRow>,
    #[serde(default)]
    verses: Vec<VerseRow>,
}

/// Whole library in one JSON document, rewritten atomically after every
/// mutation. Without a path it only lives in memory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: Option<PathBuf>,
    library: Mutex<Library>,
}

impl JsonFileStore {
    pub async fn open(store_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = store_dir.as_ref().join(LIBRARY_FILE);
        let library = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?
            .unwrap_or_default();
        Ok(Self {
            path: Some(path),
            library: Mutex::new(library),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            library: Mutex::new(Library::default()),
        }
    }

    async fn mutate(
        &self,
        f: impl FnOnce(&mut Library) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let mut library = self.library.lock().await;
        let mut next = library.clone();
        f(&mut next)?;
        if let Some(path) = &self.path {
            write_json_atomic(path, &next)
                .await
                .with_context(|| format!("write {LIBRARY_FILE}"))?;
        }
        *library = next;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for JsonFileStore {
    async fn find_book(&self, slug: &str) -> anyhow::Result<Option<BookRow>> {
        let library = self.library.lock().await;
        Ok(library.books.iter().find(|b| b.slug == slug).cloned())
    }

    async fn insert_book(&self, book: &BookRow) -> anyhow::Result<()> {
        self.mutate(|library| {
            if library.books.iter().any(|b| b.slug == book.slug) {
                anyhow::bail!("book already exists: {}", book.slug);
            }
            library.books.push(book.clone());
            Ok(())
        })
        .await
    }

    async fn find_canto(
        &self,
        book_id: &str,
        canto_number: u32,
    ) -> anyhow::Result<Option<CantoRow>> {
        let library = self.library.lock().await;
        Ok(library
            .cantos
            .iter()
            .find(|c| c.book_id == book_id && c.canto_number == canto_number)
            .cloned())
    }

    async fn insert_canto(&self, canto: &CantoRow) -> anyhow::Result<()> {
        self.mutate(|library| {
            if library
                .cantos
                .iter()
                .any(|c| c.book_id == canto.book_id && c.canto_number == canto.canto_number)
            {
                anyhow::bail!("canto {} already exists", canto.canto_number);
            }
            library.cantos.push(canto.clone());
            Ok(())
        })
        .await
    }

    async fn find_chapter(
        &self,
        book_id: &str,
        canto_id: Option<&str>,
        chapter_number: u32,
    ) -> anyhow::Result<Option<ChapterRow>> {
        let library = self.library.lock().await;
        Ok(library
            .chapters
            .iter()
            .find(|c| {
                c.book_id == book_id
                    && c.canto_id.as_deref() == canto_id
                    && c.chapter_number == chapter_number
            })
            .cloned())
    }

    async fn insert_chapter(&self, chapter: &ChapterRow) -> anyhow::Result<()> {
        self.mutate(|library| {
            if library.chapters.iter().any(|c| {
                c.book_id == chapter.book_id
                    && c.canto_id == chapter.canto_id
                    && c.chapter_number == chapter.chapter_number
            }) {
                anyhow::bail!("chapter {} already exists", chapter.chapter_number);
            }
            library.chapters.push(chapter.clone());
            Ok(())
        })
        .await
    }

    async fn update_chapter(&self, chapter: &ChapterRow) -> anyhow::Result<()> {
        self.mutate(|library| {
            let row = library
                .chapters
                .iter_mut()
                .find(|c| c.id == chapter.id)
                .ok_or_else(|| anyhow::anyhow!("chapter not found: {}", chapter.id))?;
            *row = chapter.clone();
            Ok(())
        })
        .await
    }

    async fn find_verse(
        &self,
        chapter_id: &str,
        verse_number: &str,
    ) -> anyhow::Result<Option<VerseRow>> {
        let library = self.library.lock().await;
        Ok(library
            .verses
            .iter()
            .find(|v| v.chapter_id == chapter_id && v.verse_number == verse_number)
            .cloned())
    }

    async fn insert_verse(&self, verse: &VerseRow) -> anyhow::Result<()> {
        self.mutate(|library| {
            if library
                .verses
                .iter()
                .any(|v| v.chapter_id == verse.chapter_id && v.verse_number == verse.verse_number)
            {
                anyhow::bail!("verse {} already exists", verse.verse_number);
            }
            library.verses.push(verse.clone());
            Ok(())
        })
        .await
    }

    async fn update_verse(&self, verse: &VerseRow) -> anyhow::Result<()> {
        self.mutate(|library| {
            let row = library
                .verses
                .iter_mut()
                .find(|v| v.id == verse.id)
                .ok_or_else(|| anyhow::anyhow!("verse not found: {}", verse.id))?;
            *row = verse.clone();
            Ok(())
        })
        .await
    }

    async fn list_verses(&self, chapter_id: &str) -> anyhow::Result<Vec<VerseRow>> {
        let library = self.library.lock().await;
        let mut verses: Vec<VerseRow> = library
            .verses
            .iter()
            .filter(|v| v.chapter_id == chapter_id)
            .cloned()
            .collect();
        verses.sort_by(|a, b| compare_labels(&a.verse_number, &b.verse_number));
        Ok(verses)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create store dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize library")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
