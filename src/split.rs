//! Splits plain book text into chapters and verses.

use std::sync::LazyLock;

use regex::Regex;

use crate::formats::{ChapterFragment, ChapterType, Language, VerseEntry, VerseFields};
use crate::text;

pub const FILE_SOURCE: &str = "file";

/// Verse chapters with fewer verses than this are treated as front matter
/// when the text has chapter markers.
const MIN_VERSES_PER_CHAPTER: usize = 3;

static CHAPTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:ГЛАВА|РОЗДІЛ|CHAPTER)[ \t]+([0-9]+|[\p{L}'’]+)[^\n]*$")
        .expect("valid chapter regex")
});
static VERSE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?im)^[ \t]*(?:ВІРШ|ТЕКСТ|TEXT|VERSE)[ \t]+",
        r"(\d+(?:[ \t]*[-–—][ \t]*\d+)?)[ \t]*[.:]?[ \t]*$"
    ))
    .expect("valid verse regex")
});
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"));

struct SectionLabels {
    synonyms: Regex,
    translation: Regex,
    commentary: Regex,
}

static UK_LABELS: LazyLock<SectionLabels> = LazyLock::new(|| SectionLabels {
    synonyms: label(r"(?:ПОСЛІВНИЙ ПЕРЕКЛАД|ПОСЛОВНИЙ ПЕРЕКЛАД|СИНОНІМИ)"),
    translation: label(r"ПЕРЕКЛАД"),
    commentary: label(r"(?:ПОЯСНЕННЯ|КОМЕНТАР)"),
});
static EN_LABELS: LazyLock<SectionLabels> = LazyLock::new(|| SectionLabels {
    synonyms: label(r"(?:SYNONYMS|WORD FOR WORD)"),
    translation: label(r"TRANSLATION"),
    commentary: label(r"(?:PURPORT|COMMENTARY)"),
});

fn label(words: &str) -> Regex {
    Regex::new(&format!(r"(?im)^[ \t]*{words}\b[ \t]*:?[ \t]*")).expect("valid section label regex")
}

impl SectionLabels {
    fn for_language(language: Language) -> &'static Self {
        match language {
            Language::En => &EN_LABELS,
            Language::Uk => &UK_LABELS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Synonyms,
    Translation,
    Commentary,
}

/// Resolves a chapter marker's number: digits or a Ukrainian ordinal word up
/// to nineteen.
pub fn chapter_number(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return (n > 0).then_some(n);
    }
    let word = raw.to_uppercase().replace('’', "'");
    let n = match word.as_str() {
        "ПЕРША" | "ПЕРШИЙ" | "ОДНА" | "ОДИН" => 1,
        "ДРУГА" | "ДРУГИЙ" | "ДВА" | "ДВІ" => 2,
        "ТРЕТЯ" | "ТРЕТІЙ" | "ТРИ" => 3,
        "ЧЕТВЕРТА" | "ЧЕТВЕРТИЙ" | "ЧОТИРИ" => 4,
        "П'ЯТА" | "П'ЯТИЙ" | "П'ЯТЬ" => 5,
        "ШОСТА" | "ШОСТИЙ" | "ШІСТЬ" => 6,
        "СЬОМА" | "СЬОМИЙ" | "СІМ" => 7,
        "ВОСЬМА" | "ВОСЬМИЙ" | "ВІСІМ" => 8,
        "ДЕВ'ЯТА" | "ДЕВ'ЯТИЙ" | "ДЕВ'ЯТЬ" => 9,
        "ДЕСЯТА" | "ДЕСЯТИЙ" | "ДЕСЯТЬ" => 10,
        "ОДИНАДЦЯТА" | "ОДИНАДЦЯТИЙ" => 11,
        "ДВАНАДЦЯТА" | "ДВАНАДЦЯТИЙ" => 12,
        "ТРИНАДЦЯТА" | "ТРИНАДЦЯТИЙ" => 13,
        "ЧОТИРНАДЦЯТА" | "ЧОТИРНАДЦЯТИЙ" => 14,
        "П'ЯТНАДЦЯТА" | "П'ЯТНАДЦЯТИЙ" => 15,
        "ШІСТНАДЦЯТА" | "ШІСТНАДЦЯТИЙ" => 16,
        "СІМНАДЦЯТА" | "СІМНАДЦЯТИЙ" => 17,
        "ВІСІМНАДЦЯТА" | "ВІСІМНАДЦЯТИЙ" => 18,
        "ДЕВ'ЯТНАДЦЯТА" | "ДЕВ'ЯТНАДЦЯТИЙ" => 19,
        _ => return None,
    };
    Some(n)
}

/// Splits a whole book into chapter fragments in `language`.
///
/// Text without chapter markers is one chapter. A chapter with verse markers
/// becomes a verse chapter, dropped as front matter when it yields fewer
/// than three verses. A chapter without them is kept as prose.
pub fn split_chapters(text: &str, language: Language) -> Vec<ChapterFragment> {
    let markers: Vec<_> = CHAPTER_MARKER.captures_iter(text).collect();
    if markers.is_empty() {
        return chapter_fragment(1, None, text, language).into_iter().collect();
    }

    let mut chapters = Vec::new();
    for (idx, caps) in markers.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let end = markers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let body = &text[whole.end()..end];

        let number = caps
            .get(1)
            .and_then(|m| chapter_number(m.as_str()))
            .unwrap_or(idx as u32 + 1);
        match chapter_title(body) {
            Some(title) => {
                let rest = after_first_line(body);
                chapters.extend(chapter_fragment(number, Some(title), rest, language));
            }
            None => chapters.extend(chapter_fragment(number, None, body, language)),
        }
    }
    chapters
}

fn chapter_fragment(
    number: u32,
    title: Option<String>,
    body: &str,
    language: Language,
) -> Option<ChapterFragment> {
    if !VERSE_MARKER.is_match(body) {
        let content = prose_content(body)?;
        return Some(ChapterFragment {
            chapter_type: ChapterType::Text,
            content: Some(content),
            ..empty_fragment(number, title, language)
        });
    }

    let verses = split_verses(body, language);
    if verses.len() < MIN_VERSES_PER_CHAPTER {
        tracing::debug!(chapter = number, verses = verses.len(), "skipping short section");
        return None;
    }
    Some(ChapterFragment {
        verses,
        ..empty_fragment(number, title, language)
    })
}

fn empty_fragment(
    chapter_number: u32,
    title: Option<String>,
    language: Language,
) -> ChapterFragment {
    ChapterFragment {
        source: FILE_SOURCE.to_owned(),
        language,
        chapter_number,
        title,
        chapter_type: ChapterType::Verses,
        content: None,
        verses: Vec::new(),
    }
}

/// First non-empty line after the chapter marker, unless it is already a
/// verse marker.
fn chapter_title(body: &str) -> Option<String> {
    let line = body.lines().map(str::trim).find(|line| !line.is_empty())?;
    if VERSE_MARKER.is_match(line) {
        return None;
    }
    Some(text::collapse_whitespace(line))
}

fn after_first_line(body: &str) -> &str {
    body.trim_start()
        .split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

/// Paragraphs of a chapter with no verse markers, trimmed and joined by
/// blank lines.
fn prose_content(body: &str) -> Option<String> {
    let paragraphs: Vec<String> = PARAGRAPH_BREAK
        .split(body)
        .map(|p| p.lines().map(str::trim).collect::<Vec<_>>().join("\n"))
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

/// Splits one chapter into verses by its verse markers.
pub fn split_verses(chapter: &str, language: Language) -> Vec<VerseEntry> {
    let markers: Vec<_> = VERSE_MARKER.captures_iter(chapter).collect();
    let mut verses = Vec::new();
    for (idx, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(chapter.len());
        let label: String = number
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == '–' || c == '—' { '-' } else { c })
            .collect();
        let fields = parse_verse_body(&chapter[whole.end()..end], language);
        if fields.is_empty() {
            continue;
        }
        verses.push(VerseEntry {
            verse_number: label,
            fields,
        });
    }
    verses
}

/// Leading Devanagari/Bengali lines are the original script, the lines after
/// them up to the first section label are the transliteration. Without any
/// section label the remaining text is taken as the translation.
fn parse_verse_body(body: &str, language: Language) -> VerseFields {
    let labels = SectionLabels::for_language(language);

    let mut found: Vec<(usize, usize, Section)> = Vec::new();
    for (regex, section) in [
        (&labels.synonyms, Section::Synonyms),
        (&labels.translation, Section::Translation),
        (&labels.commentary, Section::Commentary),
    ] {
        if let Some(m) = regex.find(body) {
            found.push((m.start(), m.end(), section));
        }
    }
    found.sort_by_key(|(start, _, _)| *start);

    let head_end = found.first().map(|(start, _, _)| *start).unwrap_or(body.len());
    let head: Vec<&str> = body[..head_end]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let script_len = head
        .iter()
        .take_while(|line| text::contains_indic_script(line))
        .count();
    let script = join_lines(&head[..script_len]);
    let rest = join_lines(&head[script_len..]);

    let mut fields = VerseFields {
        sanskrit: some(script),
        ..VerseFields::default()
    };
    let (translit, translation) = if found.is_empty() {
        (None, some(rest))
    } else {
        (some(rest), None)
    };
    let (translit_slot, synonyms_slot, translation_slot, commentary_slot) = match language {
        Language::En => (
            &mut fields.transliteration_en,
            &mut fields.synonyms_en,
            &mut fields.translation_en,
            &mut fields.commentary_en,
        ),
        Language::Uk => (
            &mut fields.transliteration_uk,
            &mut fields.synonyms_uk,
            &mut fields.translation_uk,
            &mut fields.commentary_uk,
        ),
    };
    *translit_slot = translit;
    *translation_slot = translation;

    for (idx, (_, content_start, section)) in found.iter().enumerate() {
        let content_end = found
            .get(idx + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(body.len());
        let content = some(body[*content_start..content_end].trim().to_owned());
        match section {
            Section::Synonyms => *synonyms_slot = content,
            Section::Translation => *translation_slot = content,
            Section::Commentary => *commentary_slot = content,
        }
    }
    fields
}

fn join_lines(lines: &[&str]) -> String {
    lines.join("\n")
}

fn some(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
