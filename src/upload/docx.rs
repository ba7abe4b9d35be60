use std::io::{Cursor, Read as _};
use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("valid paragraph regex"));
static RUN_PIECE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:(br|cr)\s*/>|<w:tab\s*/>")
        .expect("valid run regex")
});

/// Paragraph text of `word/document.xml`, one paragraph per line.
pub fn docx_text(bytes: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("open docx archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("missing word/document.xml")?
        .read_to_string(&mut xml)
        .context("read word/document.xml")?;

    let lines: Vec<String> = PARAGRAPH
        .find_iter(&xml)
        .map(|paragraph| paragraph_text(paragraph.as_str()))
        .collect();
    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &str) -> String {
    let mut out = String::new();
    for caps in RUN_PIECE.captures_iter(paragraph) {
        if let Some(text) = caps.get(1) {
            out.push_str(&unescape_xml(text.as_str()));
        } else if caps.get(2).is_some() {
            out.push('\n');
        } else {
            out.push('\t');
        }
    }
    out
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
