use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::{ChapterTarget, DEFAULT_PRIMARY, DEFAULT_SECONDARY};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import chapters from the web sources.
    Import(ImportArgs),
    /// Import chapters from a PDF, EPUB, DOCX or text file.
    ImportFile(ImportFileArgs),
    /// Print the segments and URLs a chapter import would fetch.
    Plan(PlanArgs),
    Canto {
        #[command(subcommand)]
        command: CantoCommand,
    },
    /// Print a stored chapter with its verses.
    Show(ShowArgs),
}

#[derive(Debug, Subcommand)]
pub enum CantoCommand {
    /// Register a canto so chapters can be imported into it.
    Add(CantoAddArgs),
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// YAML book catalog replacing the built-in one.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Book slug (e.g. `gita`, `bhagavatam`, `scc`).
    #[arg(long)]
    pub book: String,

    /// Canto for chapters that do not name their own.
    #[arg(long)]
    pub canto: Option<u32>,

    /// Chapters to import: `3`, `1-5`, `1,4,7-9`, or per canto `1.3,2.5-7`.
    #[arg(long, value_parser = parse_chapter_list)]
    pub chapters: ChapterList,

    /// Verse window, `N` or `N-M`.
    #[arg(long)]
    pub verses: Option<String>,

    #[arg(long, default_value = DEFAULT_PRIMARY)]
    pub primary: String,

    /// Second-language source, or `none`.
    #[arg(long, default_value = DEFAULT_SECONDARY)]
    pub secondary: String,

    /// Store directory (holds `library.json`).
    #[arg(long)]
    pub store: PathBuf,

    /// Also write the JSON report here.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Pause between segment fetches; overrides `VERSE_IMPORT_THROTTLE_MS`.
    #[arg(long)]
    pub throttle_ms: Option<u64>,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Debug, Args)]
pub struct ImportFileArgs {
    #[arg(long)]
    pub path: PathBuf,

    #[arg(long)]
    pub book: String,

    #[arg(long)]
    pub canto: Option<u32>,

    /// Language of the file's text.
    #[arg(long, default_value = "uk")]
    pub language: String,

    #[arg(long)]
    pub store: PathBuf,

    #[arg(long)]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[arg(long)]
    pub book: String,

    #[arg(long)]
    pub canto: Option<u32>,

    #[arg(long)]
    pub chapter: u32,

    #[arg(long)]
    pub verses: Option<String>,

    #[arg(long, default_value = DEFAULT_PRIMARY)]
    pub primary: String,

    #[arg(long, default_value = DEFAULT_SECONDARY)]
    pub secondary: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Debug, Args)]
pub struct CantoAddArgs {
    #[arg(long)]
    pub book: String,

    #[arg(long)]
    pub number: u32,

    #[arg(long)]
    pub title_en: Option<String>,

    #[arg(long)]
    pub title_uk: Option<String>,

    #[arg(long)]
    pub store: PathBuf,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub book: String,

    #[arg(long)]
    pub canto: Option<u32>,

    #[arg(long)]
    pub chapter: u32,

    #[arg(long)]
    pub store: PathBuf,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

/// Widest range a single `--chapters` item may span.
pub const MAX_CHAPTER_SPAN: u32 = 1000;

/// Parsed `--chapters` value, sorted by canto then chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterList(pub Vec<ChapterTarget>);

/// Parses comma-separated items of the form `N`, `N-M`, `C.N` or `C.N-M`
/// into a sorted, de-duplicated chapter list.
pub fn parse_chapter_list(raw: &str) -> anyhow::Result<ChapterList> {
    let mut targets = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (canto, chapters) = match part.split_once('.') {
            Some((canto, chapters)) => (Some(parse_number(canto, "canto")?), chapters),
            None => (None, part),
        };
        let (from, to) = match chapters.split_once('-') {
            Some((from, to)) => (parse_number(from, "chapter")?, parse_number(to, "chapter")?),
            None => {
                let n = parse_number(chapters, "chapter")?;
                (n, n)
            }
        };
        if from > to {
            anyhow::bail!("chapter range {part:?} runs backwards");
        }
        if to - from >= MAX_CHAPTER_SPAN {
            anyhow::bail!("chapter range {part:?} spans more than {MAX_CHAPTER_SPAN} chapters");
        }
        targets.extend((from..=to).map(|chapter| ChapterTarget::new(canto, chapter)));
    }
    if targets.is_empty() {
        anyhow::bail!("no chapters given");
    }
    targets.sort_unstable();
    targets.dedup();
    Ok(ChapterList(targets))
}

fn parse_number(raw: &str, what: &str) -> anyhow::Result<u32> {
    let n: u32 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid {what} number: {raw:?}"))?;
    if n == 0 {
        anyhow::bail!("{what} numbers start at 1");
    }
    Ok(n)
}

/// `none` (or an empty value) disables the second source.
pub fn secondary_source(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(raw.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(raw: &str) -> anyhow::Result<Vec<(Option<u32>, u32)>> {
        let ChapterList(targets) = parse_chapter_list(raw)?;
        Ok(targets.into_iter().map(|t| (t.canto, t.chapter)).collect())
    }

    #[test]
    fn chapter_lists_expand_and_dedup() -> anyhow::Result<()> {
        assert_eq!(chapters("3")?, vec![(None, 3)]);
        assert_eq!(chapters("1-3")?, vec![(None, 1), (None, 2), (None, 3)]);
        assert_eq!(
            chapters("7-8, 1,2,8")?,
            vec![(None, 1), (None, 2), (None, 7), (None, 8)]
        );
        assert!(parse_chapter_list("5-2").is_err());
        assert!(parse_chapter_list("0").is_err());
        assert!(parse_chapter_list(" , ").is_err());
        Ok(())
    }

    #[test]
    fn chapter_items_can_name_their_canto() -> anyhow::Result<()> {
        assert_eq!(
            chapters("2.5-6, 1.3, 4")?,
            vec![(None, 4), (Some(1), 3), (Some(2), 5), (Some(2), 6)]
        );
        assert!(parse_chapter_list("0.3").is_err());
        assert!(parse_chapter_list("x.3").is_err());
        Ok(())
    }

    #[test]
    fn oversized_ranges_are_rejected() -> anyhow::Result<()> {
        assert_eq!(chapters("1-1000")?.len(), 1000);
        assert!(parse_chapter_list("1-1001").is_err());
        assert!(parse_chapter_list("1-4294967295").is_err());

        let err = Cli::try_parse_from([
            "verse-import",
            "import",
            "--book",
            "gita",
            "--chapters",
            "1-4294967295",
            "--store",
            "/tmp/store",
        ])
        .expect_err("range is too wide");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        Ok(())
    }

    #[test]
    fn none_disables_secondary() {
        assert_eq!(secondary_source("none"), None);
        assert_eq!(secondary_source("NONE"), None);
        assert_eq!(secondary_source("gitabase").as_deref(), Some("gitabase"));
    }

    #[test]
    fn import_args_parse() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "verse-import",
            "import",
            "--book",
            "gita",
            "--chapters",
            "1-2",
            "--store",
            "/tmp/store",
            "--secondary",
            "none",
        ])?;
        let Command::Import(args) = cli.command else {
            anyhow::bail!("expected import command");
        };
        assert_eq!(args.primary, "vedabase");
        assert_eq!(args.chapters.0.len(), 2);
        assert_eq!(secondary_source(&args.secondary), None);
        assert!(args.catalog.catalog.is_none());
        Ok(())
    }
}
