use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Uk,
}

impl Language {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "uk" | "ua" | "ukrainian" => Ok(Self::Uk),
            other => anyhow::bail!("unsupported language: {other}"),
        }
    }

    pub fn generic_title(self, chapter_number: u32) -> String {
        match self {
            Self::En => format!("Chapter {chapter_number}"),
            Self::Uk => format!("Глава {chapter_number}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChapterType {
    #[default]
    Verses,
    Text,
}

/// Every content field a verse can carry. `sanskrit` holds the original
/// script (Devanagari or Bengali) and is shared between languages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerseFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanskrit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transliteration_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transliteration_uk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms_uk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_uk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary_uk: Option<String>,
}

impl VerseFields {
    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(|slot| !has_text(slot))
    }

    /// Fills every empty slot of `self` from `other`. Populated slots keep
    /// their value, so the receiver acts as the primary side.
    pub fn fill_from(&mut self, other: &VerseFields) {
        for (slot, candidate) in self.slots_mut().into_iter().zip(other.slots()) {
            if !has_text(slot) && has_text(candidate) {
                *slot = candidate.clone();
            }
        }
    }

    /// Overwrites slots with every non-empty value in `update`; empty values
    /// in `update` never clear a stored slot. Returns whether anything changed.
    pub fn apply_update(&mut self, update: &VerseFields) -> bool {
        let mut changed = false;
        for (slot, candidate) in self.slots_mut().into_iter().zip(update.slots()) {
            if has_text(candidate) && slot != candidate {
                *slot = candidate.clone();
                changed = true;
            }
        }
        changed
    }

    /// Converts empty strings into `None` so emptiness has one representation.
    pub fn compact(&mut self) {
        for slot in self.slots_mut() {
            if !has_text(slot) {
                *slot = None;
            }
        }
    }

    pub fn map_text(&mut self, mut f: impl FnMut(FieldKind, &str) -> String) {
        for (kind, slot) in FieldKind::ALL.into_iter().zip(self.slots_mut()) {
            if let Some(value) = slot.as_deref() {
                *slot = Some(f(kind, value));
            }
        }
    }

    fn slots(&self) -> [&Option<String>; 9] {
        [
            &self.sanskrit,
            &self.transliteration_en,
            &self.transliteration_uk,
            &self.synonyms_en,
            &self.synonyms_uk,
            &self.translation_en,
            &self.translation_uk,
            &self.commentary_en,
            &self.commentary_uk,
        ]
    }

    fn slots_mut(&mut self) -> [&mut Option<String>; 9] {
        [
            &mut self.sanskrit,
            &mut self.transliteration_en,
            &mut self.transliteration_uk,
            &mut self.synonyms_en,
            &mut self.synonyms_uk,
            &mut self.translation_en,
            &mut self.translation_uk,
            &mut self.commentary_en,
            &mut self.commentary_uk,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Sanskrit,
    Transliteration,
    Synonyms,
    Translation,
    Commentary,
}

impl FieldKind {
    /// Kinds in `VerseFields` slot order.
    const ALL: [FieldKind; 9] = [
        Self::Sanskrit,
        Self::Transliteration,
        Self::Transliteration,
        Self::Synonyms,
        Self::Synonyms,
        Self::Translation,
        Self::Translation,
        Self::Commentary,
        Self::Commentary,
    ];
}

pub fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerseEntry {
    pub verse_number: String,
    #[serde(flatten)]
    pub fields: VerseFields,
}

/// Output of one extractor for one chapter, in the extractor's language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterFragment {
    pub source: String,
    pub language: Language,
    pub chapter_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub chapter_type: ChapterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub verses: Vec<VerseEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterRecord {
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
    pub verses: Vec<VerseEntry>,
}

impl ChapterRecord {
    pub fn title(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.title_en.as_deref(),
            Language::Uk => self.title_uk.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canto: Option<u32>,
    pub chapter_number: u32,
    pub segment: String,
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChapterStatus {
    Succeeded {
        verses_written: usize,
        chapter_id: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canto: Option<u32>,
    pub chapter_number: u32,
    #[serde(flatten)]
    pub status: ChapterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub book_slug: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub chapters_succeeded: usize,
    pub chapters_failed: usize,
    pub verses_written: usize,
    pub chapters: Vec<ChapterOutcome>,
    pub skipped: Vec<SkippedSegment>,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn new(book_slug: impl Into<String>) -> Self {
        Self {
            book_slug: book_slug.into(),
            started_at: Utc::now(),
            finished_at: None,
            chapters_succeeded: 0,
            chapters_failed: 0,
            verses_written: 0,
            chapters: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_success(
        &mut self,
        canto: Option<u32>,
        chapter_number: u32,
        chapter_id: String,
        verses_written: usize,
    ) {
        self.chapters_succeeded += 1;
        self.verses_written += verses_written;
        self.chapters.push(ChapterOutcome {
            canto,
            chapter_number,
            status: ChapterStatus::Succeeded {
                verses_written,
                chapter_id,
            },
        });
    }

    pub fn record_failure(&mut self, canto: Option<u32>, chapter_number: u32, reason: String) {
        self.chapters_failed += 1;
        let label = match canto {
            Some(canto) => format!("{canto}.{chapter_number}"),
            None => chapter_number.to_string(),
        };
        self.errors.push(format!("chapter {label}: {reason}"));
        self.chapters.push(ChapterOutcome {
            canto,
            chapter_number,
            status: ChapterStatus::Failed { reason },
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Fails when a non-empty batch produced no usable chapter.
    pub fn ensure_usable(&self) -> anyhow::Result<()> {
        if !self.chapters.is_empty() && self.chapters_succeeded == 0 {
            anyhow::bail!(
                "no usable chapters imported for {} ({} failed)",
                self.book_slug,
                self.chapters_failed
            );
        }
        Ok(())
    }
}
