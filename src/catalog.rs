use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// How one book is addressed on the source sites and in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookSpec {
    /// Slug of the book in our store.
    pub slug: String,
    /// Slug on the English library site (`/en/library/{source_slug}/...`).
    pub source_slug: String,
    /// Slug on the Ukrainian site, when the book is published there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitabase_slug: Option<String>,
    pub name_en: String,
    pub name_uk: String,
    #[serde(default)]
    pub has_cantos: bool,
    /// Path names used instead of canto numbers (index 0 is canto 1).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub canto_paths: Vec<String>,
    /// Books without chapters address verses directly under the book.
    #[serde(default = "default_true")]
    pub has_chapters: bool,
}

fn default_true() -> bool {
    true
}

impl BookSpec {
    pub fn canto_path(&self, canto: u32) -> String {
        canto
            .checked_sub(1)
            .and_then(|idx| self.canto_paths.get(idx as usize))
            .cloned()
            .unwrap_or_else(|| canto.to_string())
    }

    /// Fallback book title used when the book row has to be created.
    pub fn fallback_title(&self) -> String {
        self.source_slug.to_uppercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCatalog {
    pub books: Vec<BookSpec>,
}

impl BookCatalog {
    pub fn builtin() -> Self {
        let book = |slug: &str,
                    source_slug: &str,
                    gitabase_slug: Option<&str>,
                    name_en: &str,
                    name_uk: &str,
                    has_cantos: bool,
                    canto_paths: &[&str],
                    has_chapters: bool| BookSpec {
            slug: slug.to_owned(),
            source_slug: source_slug.to_owned(),
            gitabase_slug: gitabase_slug.map(str::to_owned),
            name_en: name_en.to_owned(),
            name_uk: name_uk.to_owned(),
            has_cantos,
            canto_paths: canto_paths.iter().map(|s| (*s).to_owned()).collect(),
            has_chapters,
        };

        Self {
            books: vec![
                book(
                    "gita",
                    "bg",
                    Some("BG"),
                    "Bhagavad-gītā As It Is",
                    "Бгаґавад-ґіта як вона є",
                    false,
                    &[],
                    true,
                ),
                book(
                    "bhagavatam",
                    "sb",
                    Some("SB"),
                    "Śrīmad-Bhāgavatam",
                    "Шрімад-Бгаґаватам",
                    true,
                    &[],
                    true,
                ),
                book(
                    "scc",
                    "cc",
                    Some("CC"),
                    "Śrī Caitanya-caritāmṛta",
                    "Шрі Чайтанья-чарітамріта",
                    true,
                    &["adi", "madhya", "antya"],
                    true,
                ),
                book(
                    "iso",
                    "iso",
                    Some("ISO"),
                    "Śrī Īśopaniṣad",
                    "Шрі Ішопанішад",
                    false,
                    &[],
                    false,
                ),
                book(
                    "noi",
                    "noi",
                    None,
                    "Nectar of Instruction",
                    "Нектар настанов",
                    false,
                    &[],
                    false,
                ),
            ],
        }
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog: {}", path.display()))?;
        let catalog: Self = serde_yaml::from_str(&yaml).context("parse catalog yaml")?;
        if catalog.books.is_empty() {
            anyhow::bail!("catalog has no books: {}", path.display());
        }
        Ok(catalog)
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Looks a book up by our slug or by its source-site slug.
    pub fn get(&self, slug: &str) -> anyhow::Result<&BookSpec> {
        let needle = slug.trim().to_ascii_lowercase();
        self.books
            .iter()
            .find(|book| book.slug == needle || book.source_slug == needle)
            .ok_or_else(|| anyhow::anyhow!("unknown book: {slug}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_either_slug() -> anyhow::Result<()> {
        let catalog = BookCatalog::builtin();
        assert_eq!(catalog.get("bg")?.slug, "gita");
        assert_eq!(catalog.get("scc")?.source_slug, "cc");
        assert!(catalog.get("unknown").is_err());
        Ok(())
    }

    #[test]
    fn canto_path_uses_names_when_present() -> anyhow::Result<()> {
        let catalog = BookCatalog::builtin();
        assert_eq!(catalog.get("cc")?.canto_path(2), "madhya");
        assert_eq!(catalog.get("sb")?.canto_path(10), "10");
        assert_eq!(catalog.get("cc")?.canto_path(9), "9");
        Ok(())
    }

    #[test]
    fn parses_yaml_catalog() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("books.yaml");
        std::fs::write(
            &path,
            "books:\n  - slug: test\n    source_slug: tb\n    name_en: Test\n    name_uk: Тест\n",
        )?;
        let catalog = BookCatalog::from_yaml_file(&path)?;
        let book = catalog.get("tb")?;
        assert!(!book.has_cantos);
        assert!(book.has_chapters);
        assert_eq!(book.gitabase_slug, None);
        Ok(())
    }
}
