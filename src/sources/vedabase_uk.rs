use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::vedabase::library_path;
use super::{ChapterAddress, SourceExtractor, join_path, non_empty};
use crate::formats::{Language, VerseFields};
use crate::text;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid vedabase-uk selector")
}

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| selector("h1, h2, h3, h4, .section-header, [class*='heading']"));
static TRANSLIT: LazyLock<Selector> =
    LazyLock::new(|| selector(".transliteration, [class*='translit']"));
static SCRIPT_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| selector("p, div, span"));

static LEADING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:послівний переклад|пословний переклад|word for word|деванагарі|бенгальська|бенгалі|санскрит|переклад|синоніми|пояснення|коментар|devanagari|sanskrit|bengali|translation|synonyms|purport|commentary)\s*:?\s*",
    )
    .expect("valid label regex")
});
static STRAY_PURPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpurport\b").expect("valid purport regex"));

const SCRIPT_LABELS: &[&str] = &["Деванагарі", "Бенгалі", "Санскрит", "Бенгальська"];
const SYNONYM_LABELS: &[&str] = &["Послівний переклад", "Синоніми", "Пословний переклад"];
const TRANSLATION_LABELS: &[&str] = &["Переклад"];
const COMMENTARY_LABELS: &[&str] = &["Пояснення", "Коментар"];

/// Ukrainian side-by-side pages of the English library site. The markup has
/// no stable classes, so sections are found by their heading labels.
#[derive(Debug, Clone)]
pub struct VedabaseUkSource {
    base: Url,
}

impl VedabaseUkSource {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl SourceExtractor for VedabaseUkSource {
    fn id(&self) -> &'static str {
        "vedabase-uk"
    }

    fn language(&self) -> Language {
        Language::Uk
    }

    fn index_url(&self, at: &ChapterAddress<'_>) -> anyhow::Result<Url> {
        let mut path = library_path(at);
        path[0] = "uk".to_owned();
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        join_path(&self.base, &segments, true)
    }

    fn segment_url(&self, at: &ChapterAddress<'_>, segment: &str) -> anyhow::Result<Url> {
        let mut path = library_path(at);
        path.extend([segment.to_owned(), "side-by-side".to_owned(), "uk".to_owned()]);
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        join_path(&self.base, &segments, true)
    }

    fn parse_segment(&self, html: &str, url: &Url) -> Option<VerseFields> {
        let doc = Html::parse_document(html);
        let sections = Sections::new(&doc);

        let sanskrit = non_empty(sections.locate(SCRIPT_LABELS)).or_else(|| indic_block(&doc));
        let transliteration_uk = non_empty(
            doc.select(&TRANSLIT)
                .map(text::element_text_with_breaks)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let fields = VerseFields {
            sanskrit,
            transliteration_uk,
            synonyms_uk: non_empty(sections.locate(SYNONYM_LABELS)),
            translation_uk: non_empty(sections.locate(TRANSLATION_LABELS)),
            commentary_uk: non_empty(sections.locate(COMMENTARY_LABELS)),
            ..VerseFields::default()
        };
        if fields.is_empty() {
            tracing::debug!(%url, "no labelled sections found");
            return None;
        }
        Some(fields)
    }
}

struct Sections<'a> {
    headings: Vec<ElementRef<'a>>,
}

impl<'a> Sections<'a> {
    fn new(doc: &'a Html) -> Self {
        Self {
            headings: doc.select(&HEADINGS).collect(),
        }
    }

    fn is_heading(&self, el: &ElementRef<'a>) -> bool {
        self.headings.contains(el)
    }

    /// Content after the first heading matching one of `labels`, up to the
    /// next heading. An exact heading match beats a substring match, so
    /// `Переклад` does not land on `Послівний переклад`.
    fn locate(&self, labels: &[&str]) -> String {
        let folded: Vec<String> = self
            .headings
            .iter()
            .map(|h| text::fold_for_match(&text::element_text(*h)))
            .collect();

        for label in labels {
            let wanted = text::fold_for_match(label);
            let exact = folded.iter().position(|h| h.trim_end_matches(':') == wanted);
            let partial = || folded.iter().position(|h| h.contains(&wanted));
            let Some(idx) = exact.or_else(partial) else {
                continue;
            };

            let body = strip_labels(&self.collect_after(self.headings[idx]));
            if !body.is_empty() {
                return body;
            }
        }
        String::new()
    }

    fn collect_after(&self, heading: ElementRef<'a>) -> String {
        let mut parts = Vec::new();
        let siblings = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .skip_while(|el| self.is_heading(el));
        for sibling in siblings {
            if self.is_heading(&sibling) {
                break;
            }
            let text = text::element_text_with_breaks(sibling);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }
}

fn strip_labels(text: &str) -> String {
    let stripped = LEADING_LABEL.replace(text.trim(), "");
    STRAY_PURPORT.replace_all(&stripped, "").trim().to_owned()
}

fn indic_block(doc: &Html) -> Option<String> {
    doc.select(&SCRIPT_CANDIDATES)
        .map(text::element_text_with_breaks)
        .find(|text| text::contains_indic_script(text) && text.chars().count() > 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BookCatalog;

    fn source() -> VedabaseUkSource {
        VedabaseUkSource::new(Url::parse("https://vedabase.io").unwrap())
    }

    const PAGE: &str = r#"
        <html><body>
          <h1>Бг. 2.13</h1>
          <div class="transliteration">дегіно 'смін йатга деге</div>
          <h2>Деванагарі</h2>
          <div>देहिनोऽस्मिन्यथा देहे<br/>कौमारं यौवनं जरा</div>
          <h2>Послівний переклад</h2>
          <p>дегінах—втіленої душі; асмін—у цьому</p>
          <h2>Переклад</h2>
          <h3 class="section-header">Переклад:</h3>
          <p>Переклад: Як втілена душа переходить із дитинства в юність.</p>
          <h2>Пояснення</h2>
          <p>Кожна жива істота є індивідуальною душею.</p>
          <p>Її тіло змінюється щомиті.</p>
        </body></html>
    "#;

    #[test]
    fn locates_sections_by_label() {
        let url = Url::parse("https://vedabase.io/en/library/bg/2/13/side-by-side/uk/").unwrap();
        let fields = source().parse_segment(PAGE, &url).unwrap();

        assert_eq!(
            fields.sanskrit.as_deref(),
            Some("देहिनोऽस्मिन्यथा देहे\nकौमारं यौवनं जरा")
        );
        assert_eq!(
            fields.transliteration_uk.as_deref(),
            Some("дегіно 'смін йатга деге")
        );
        assert_eq!(
            fields.synonyms_uk.as_deref(),
            Some("дегінах—втіленої душі; асмін—у цьому")
        );
        assert_eq!(
            fields.translation_uk.as_deref(),
            Some("Як втілена душа переходить із дитинства в юність.")
        );
        assert_eq!(
            fields.commentary_uk.as_deref(),
            Some("Кожна жива істота є індивідуальною душею.\nЇї тіло змінюється щомиті.")
        );
    }

    #[test]
    fn unlabelled_page_is_no_match() {
        let url = Url::parse("https://vedabase.io/en/library/bg/2/13/side-by-side/uk/").unwrap();
        assert!(source().parse_segment("<p>nothing here</p>", &url).is_none());
    }

    #[test]
    fn segment_url_points_at_side_by_side_view() -> anyhow::Result<()> {
        let catalog = BookCatalog::builtin();
        let at = ChapterAddress {
            book: catalog.get("bg")?,
            canto: None,
            chapter: 2,
        };
        assert_eq!(
            source().segment_url(&at, "13")?.as_str(),
            "https://vedabase.io/en/library/bg/2/13/side-by-side/uk/"
        );
        assert_eq!(
            source().index_url(&at)?.as_str(),
            "https://vedabase.io/uk/library/bg/2/"
        );
        Ok(())
    }

    #[test]
    fn strip_labels_removes_leading_label_and_purport() {
        assert_eq!(strip_labels("Purport: The soul is eternal."), "The soul is eternal.");
        assert_eq!(strip_labels("  синоніми  текст"), "текст");
    }
}
