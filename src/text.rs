use std::collections::HashSet;

use scraper::{ElementRef, Node};

use crate::formats::FieldKind;

const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{FFFD}", ""),
    ("â€™", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€”", "—"),
    ("â€“", "–"),
    ("Ã¡", "á"),
    ("Ã©", "é"),
    ("Ã\u{AD}", "í"),
    ("Ã³", "ó"),
    ("Ãº", "ú"),
    ("\u{FEFF}", ""),
    ("\u{F0A0}", ""),
    ("``", "\""),
];

const WORD_FIXES: &[(&str, &str)] = &[
    ("Шрі Чайтан'я-чарітамріта", "Шрі Чайтанья-чарітамріта"),
    ("Чайтан'я", "Чайтанья"),
    ("Ніт'янанда", "Нітьянанда"),
    ("енерґія", "енергія"),
    ("Ачйута", "Ачьюта"),
];

/// Cleans one verse field: repairs mojibake, trims every line, collapses
/// inner whitespace and squeezes blank-line runs to a single paragraph break.
/// Translation and commentary also get the spelling fixes.
pub fn normalize_field(kind: FieldKind, text: &str) -> String {
    let mut out = text.replace("\r\n", "\n").replace('\u{a0}', " ");
    for (from, to) in MOJIBAKE {
        out = out.replace(from, to);
    }
    if matches!(kind, FieldKind::Translation | FieldKind::Commentary) {
        for (from, to) in WORD_FIXES {
            out = out.replace(from, to);
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for line in out.lines() {
        let line = collapse_whitespace(line);
        if line.is_empty() && lines.last().is_none_or(|last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an element with `<br>` turned into newlines and every
/// line trimmed.
pub fn element_text_with_breaks(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_node_text(element, &mut out);
    out.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_node_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_node_text(child, out);
                }
            }
            _ => {}
        }
    }
}

pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Direct `<p>` children of `container`, falling back to every descendant
/// `<p>` when there are none. Paragraphs shorter than `min_chars` and repeats
/// are dropped; the rest are joined by blank lines.
pub fn paragraphs(container: ElementRef<'_>, min_chars: usize) -> String {
    let direct: Vec<ElementRef<'_>> = container
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "p")
        .collect();
    let candidates: Vec<ElementRef<'_>> = if direct.is_empty() {
        container
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "p")
            .collect()
    } else {
        direct
    };

    let mut seen = HashSet::new();
    let mut parts = Vec::new();
    for p in candidates {
        let text = element_text(p);
        if text.chars().count() > min_chars && seen.insert(text.clone()) {
            parts.push(text);
        }
    }
    parts.join("\n\n")
}

/// Lowercases and strips combining marks so label matching ignores case and
/// diacritics (`Śloka` matches `sloka`).
pub fn fold_for_match(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        if is_combining_mark(ch) {
            continue;
        }
        out.push(base_letter(ch));
    }
    collapse_whitespace(&out)
}

fn is_combining_mark(ch: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&ch)
}

fn base_letter(ch: char) -> char {
    match ch {
        'ā' | 'á' | 'à' => 'a',
        'ī' | 'í' => 'i',
        'ū' | 'ú' => 'u',
        'ṛ' | 'ṝ' => 'r',
        'ṣ' | 'ś' => 's',
        'ṭ' => 't',
        'ḍ' => 'd',
        'ṇ' | 'ñ' | 'ṅ' => 'n',
        'ṁ' => 'm',
        'ḥ' => 'h',
        'é' => 'e',
        'ó' => 'o',
        other => other,
    }
}

pub fn contains_indic_script(text: &str) -> bool {
    text.chars()
        .any(|c| ('\u{0900}'..='\u{097F}').contains(&c) || ('\u{0980}'..='\u{09FF}').contains(&c))
}
