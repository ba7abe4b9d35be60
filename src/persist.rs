use chrono::Utc;
use thiserror::Error;

use crate::catalog::BookSpec;
use crate::formats::{ChapterRecord, ChapterType, Language, VerseEntry, has_text};
use crate::store::{BookRow, CantoRow, ChapterRow, ContentStore, VerseRow, new_id};
use crate::verse_number;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{book} is divided into cantos; a canto number is required")]
    CantoRequired { book: String },
    #[error("canto {canto} of {book} is not registered")]
    CantoMissing { book: String, canto: u32 },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerseWriteStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl VerseWriteStats {
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Finds the book row for `spec`, creating it from the catalog names when
/// absent.
pub async fn ensure_book(store: &dyn ContentStore, spec: &BookSpec) -> anyhow::Result<BookRow> {
    if let Some(book) = store.find_book(&spec.slug).await? {
        return Ok(book);
    }

    let now = Utc::now();
    let book = BookRow {
        id: new_id(),
        slug: spec.slug.clone(),
        title_en: non_blank_or(&spec.name_en, spec.fallback_title()),
        title_uk: non_blank_or(&spec.name_uk, spec.fallback_title()),
        has_cantos: spec.has_cantos,
        created_at: now,
        updated_at: now,
    };
    store.insert_book(&book).await?;
    tracing::info!(book = %book.slug, "created book");
    Ok(book)
}

fn non_blank_or(value: &str, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value.to_owned()
    }
}

/// Looks up an existing canto. Import never creates cantos; see
/// [`register_canto`].
pub async fn resolve_canto(
    store: &dyn ContentStore,
    book: &BookRow,
    canto: Option<u32>,
) -> Result<Option<CantoRow>, PersistError> {
    if !book.has_cantos {
        if let Some(canto) = canto {
            tracing::warn!(book = %book.slug, canto, "book has no cantos; ignoring canto number");
        }
        return Ok(None);
    }

    let Some(number) = canto else {
        return Err(PersistError::CantoRequired {
            book: book.slug.clone(),
        });
    };
    match store.find_canto(&book.id, number).await? {
        Some(row) => Ok(Some(row)),
        None => Err(PersistError::CantoMissing {
            book: book.slug.clone(),
            canto: number,
        }),
    }
}

pub async fn register_canto(
    store: &dyn ContentStore,
    book: &BookRow,
    canto_number: u32,
    title_en: Option<String>,
    title_uk: Option<String>,
) -> anyhow::Result<CantoRow> {
    if canto_number == 0 {
        anyhow::bail!("canto numbers start at 1");
    }
    if let Some(existing) = store.find_canto(&book.id, canto_number).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let canto = CantoRow {
        id: new_id(),
        book_id: book.id.clone(),
        canto_number,
        title_en: title_en.filter(|t| !t.trim().is_empty()),
        title_uk: title_uk.filter(|t| !t.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };
    store.insert_canto(&canto).await?;
    tracing::info!(book = %book.slug, canto = canto_number, "registered canto");
    Ok(canto)
}

fn is_generic_title(title: &str, chapter_number: u32) -> bool {
    let title = title.trim();
    [Language::En, Language::Uk]
        .into_iter()
        .any(|lang| lang.generic_title(chapter_number) == title)
}

/// Stored title after applying `incoming`. Real titles always win; a generic
/// fallback only fills a slot that is empty or itself generic.
fn next_title(
    stored: Option<&str>,
    incoming: Option<&str>,
    language: Language,
    chapter_number: u32,
) -> Option<String> {
    let incoming = incoming
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| language.generic_title(chapter_number));

    match stored.map(str::trim).filter(|t| !t.is_empty()) {
        None => Some(incoming),
        Some(current) if is_generic_title(&incoming, chapter_number) => {
            if is_generic_title(current, chapter_number) {
                Some(incoming)
            } else {
                Some(current.to_owned())
            }
        }
        Some(_) => Some(incoming),
    }
}

/// Whether `record` has the content its `chapter_type` claims. A record that
/// does not keeps the stored type.
fn carries_type(record: &ChapterRecord) -> bool {
    match record.chapter_type {
        ChapterType::Verses => !record.verses.is_empty(),
        ChapterType::Text => has_text(&record.content_en) || has_text(&record.content_uk),
    }
}

pub async fn upsert_chapter(
    store: &dyn ContentStore,
    book: &BookRow,
    canto: Option<&CantoRow>,
    record: &ChapterRecord,
) -> anyhow::Result<ChapterRow> {
    let canto_id = canto.map(|c| c.id.as_str());
    let number = record.chapter_number;
    let now = Utc::now();

    match store.find_chapter(&book.id, canto_id, number).await? {
        None => {
            let row = ChapterRow {
                id: new_id(),
                book_id: book.id.clone(),
                canto_id: canto_id.map(str::to_owned),
                chapter_number: number,
                chapter_type: record.chapter_type,
                title_en: next_title(None, record.title(Language::En), Language::En, number),
                title_uk: next_title(None, record.title(Language::Uk), Language::Uk, number),
                content_en: record.content_en.clone().filter(|c| !c.trim().is_empty()),
                content_uk: record.content_uk.clone().filter(|c| !c.trim().is_empty()),
                created_at: now,
                updated_at: now,
            };
            store.insert_chapter(&row).await?;
            tracing::debug!(chapter = number, id = %row.id, "inserted chapter");
            Ok(row)
        }
        Some(existing) => {
            let mut row = existing.clone();
            if carries_type(record) {
                row.chapter_type = record.chapter_type;
            }
            row.title_en = next_title(
                existing.title_en.as_deref(),
                record.title(Language::En),
                Language::En,
                number,
            );
            row.title_uk = next_title(
                existing.title_uk.as_deref(),
                record.title(Language::Uk),
                Language::Uk,
                number,
            );
            if has_text(&record.content_en) {
                row.content_en = record.content_en.clone();
            }
            if has_text(&record.content_uk) {
                row.content_uk = record.content_uk.clone();
            }

            if row != existing {
                row.updated_at = now;
                store.update_chapter(&row).await?;
                tracing::debug!(chapter = number, id = %row.id, "updated chapter");
            }
            Ok(row)
        }
    }
}

/// Inserts new verses and fills or overwrites stored ones with every
/// non-empty incoming field. Nothing is ever cleared or deleted.
pub async fn upsert_verses(
    store: &dyn ContentStore,
    chapter: &ChapterRow,
    verses: &[VerseEntry],
) -> anyhow::Result<VerseWriteStats> {
    let mut stats = VerseWriteStats::default();
    for verse in verses {
        let label = verse.verse_number.trim();
        if label.is_empty() || verse.fields.is_empty() {
            continue;
        }
        let now = Utc::now();

        match store.find_verse(&chapter.id, label).await? {
            None => {
                let mut fields = verse.fields.clone();
                fields.compact();
                store
                    .insert_verse(&VerseRow {
                        id: new_id(),
                        chapter_id: chapter.id.clone(),
                        verse_number: label.to_owned(),
                        sort_key: verse_number::sort_key(label),
                        fields,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
                stats.inserted += 1;
            }
            Some(mut row) => {
                if row.fields.apply_update(&verse.fields) {
                    row.sort_key = verse_number::sort_key(label);
                    row.updated_at = now;
                    store.update_verse(&row).await?;
                    stats.updated += 1;
                } else {
                    stats.unchanged += 1;
                }
            }
        }
    }
    Ok(stats)
}
