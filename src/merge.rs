use std::collections::HashMap;

use thiserror::Error;

use crate::config::ImportConfig;
use crate::formats::{ChapterFragment, ChapterRecord, Language, VerseEntry, has_text};
use crate::text;
use crate::translit;
use crate::verse_number::compare_labels;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("no source produced chapter {0}")]
    NoFragments(u32),
    #[error("chapter {0} has no verse or prose content")]
    NoContent(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub normalize: bool,
    pub derive_uk_transliteration: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            derive_uk_transliteration: true,
        }
    }
}

impl From<&ImportConfig> for MergeOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            normalize: config.normalize_fields,
            derive_uk_transliteration: config.derive_uk_transliteration,
        }
    }
}

/// Merges per-source fragments of one chapter into a single record.
///
/// Fragments are in priority order: for every field the first non-empty
/// value wins. Verses are matched by their literal label, verses left with
/// no content are dropped and the rest are ordered by label.
pub fn merge_fragments(
    chapter_number: u32,
    fragments: &[ChapterFragment],
    options: MergeOptions,
) -> Result<ChapterRecord, MergeError> {
    let Some(primary) = fragments.first() else {
        return Err(MergeError::NoFragments(chapter_number));
    };

    let mut record = ChapterRecord {
        chapter_number,
        chapter_type: primary.chapter_type,
        ..ChapterRecord::default()
    };

    let mut by_label: HashMap<String, usize> = HashMap::new();
    for fragment in fragments {
        let (title, content) = match fragment.language {
            Language::En => (&mut record.title_en, &mut record.content_en),
            Language::Uk => (&mut record.title_uk, &mut record.content_uk),
        };
        if !has_text(title) && has_text(&fragment.title) {
            *title = fragment.title.as_deref().map(|t| text::collapse_whitespace(t));
        }
        if !has_text(content) && has_text(&fragment.content) {
            *content = fragment.content.clone();
        }

        for verse in &fragment.verses {
            let mut fields = verse.fields.clone();
            if options.normalize {
                fields.map_text(text::normalize_field);
            }
            let label = verse.verse_number.trim().to_owned();
            match by_label.get(&label) {
                Some(&idx) => record.verses[idx].fields.fill_from(&fields),
                None => {
                    by_label.insert(label.clone(), record.verses.len());
                    record.verses.push(VerseEntry {
                        verse_number: label,
                        fields,
                    });
                }
            }
        }
    }

    record.verses.retain_mut(|verse| {
        verse.fields.compact();
        !verse.fields.is_empty()
    });
    if options.derive_uk_transliteration {
        for verse in &mut record.verses {
            let fields = &mut verse.fields;
            if !has_text(&fields.transliteration_uk)
                && let Some(iast) = fields.transliteration_en.as_deref()
            {
                fields.transliteration_uk = Some(translit::iast_to_ukrainian(iast));
            }
        }
    }
    record
        .verses
        .sort_by(|a, b| compare_labels(&a.verse_number, &b.verse_number));

    if record.verses.is_empty() && !has_text(&record.content_en) && !has_text(&record.content_uk)
    {
        return Err(MergeError::NoContent(chapter_number));
    }
    Ok(record)
}
