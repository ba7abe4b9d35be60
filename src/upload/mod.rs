//! Text extraction for uploaded books.

mod docx;
mod epub;

use std::path::Path;

use anyhow::Context as _;

pub use docx::docx_text;
pub use epub::{epub_text, xhtml_to_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Epub,
    Docx,
    Text,
    Markdown,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "epub" => Ok(Self::Epub),
            "docx" => Ok(Self::Docx),
            "txt" | "text" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            other => anyhow::bail!("unsupported file type {other:?}: {}", path.display()),
        }
    }
}

/// Reads the whole text layer of `path`, one paragraph per line group.
pub fn extract_text(path: &Path) -> anyhow::Result<String> {
    let format = FileFormat::from_path(path)?;
    let bytes = std::fs::read(path).with_context(|| format!("read: {}", path.display()))?;

    let text = match format {
        FileFormat::Pdf => pdf_extract::extract_text_from_mem(&bytes)
            .with_context(|| format!("extract pdf text: {}", path.display()))?,
        FileFormat::Epub => {
            epub_text(&bytes).with_context(|| format!("read epub: {}", path.display()))?
        }
        FileFormat::Docx => {
            docx_text(&bytes).with_context(|| format!("read docx: {}", path.display()))?
        }
        FileFormat::Text | FileFormat::Markdown => {
            let text = String::from_utf8(bytes)
                .with_context(|| format!("file is not utf-8: {}", path.display()))?;
            text.strip_prefix('\u{FEFF}').map(str::to_owned).unwrap_or(text)
        }
    };

    let text = tidy_lines(&text);
    if text.is_empty() {
        anyhow::bail!("no extractable text in {}", path.display());
    }
    tracing::debug!(
        path = %path.display(),
        ?format,
        chars = text.chars().count(),
        "extracted text"
    );
    Ok(text)
}

/// Trims lines and squeezes runs of blank lines to one.
fn tidy_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().is_none_or(|last| last.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|last| last.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() -> anyhow::Result<()> {
        assert_eq!(FileFormat::from_path(Path::new("book.EPUB"))?, FileFormat::Epub);
        assert_eq!(FileFormat::from_path(Path::new("notes.md"))?, FileFormat::Markdown);
        assert!(FileFormat::from_path(Path::new("scan.tiff")).is_err());
        Ok(())
    }

    #[test]
    fn plain_text_loses_bom_and_blank_runs() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("gita.txt");
        std::fs::write(&path, "\u{FEFF}ГЛАВА 1\r\n\r\n\r\n  ТЕКСТ 1  \n")?;
        assert_eq!(extract_text(&path)?, "ГЛАВА 1\n\nТЕКСТ 1");
        Ok(())
    }
}
