use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)(?:\.(\d+))?(?:\.(\d+))?([a-z])?$").expect("valid verse number regex")
});

/// Inclusive window of verse numbers requested by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseWindow {
    pub from: u32,
    pub to: u32,
}

impl VerseWindow {
    pub fn new(from: u32, to: u32) -> anyhow::Result<Self> {
        if from > to {
            anyhow::bail!("verse window start {from} is after end {to}");
        }
        Ok(Self { from, to })
    }

    pub fn all() -> Self {
        Self {
            from: 0,
            to: u32::MAX,
        }
    }

    /// Parses `N` or `N-M`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let (start, end) = split_range(raw.trim())
            .ok_or_else(|| anyhow::anyhow!("invalid verse window: {raw:?}"))?;
        let from = parse_u32(start)?;
        let to = match end {
            Some(end) => parse_u32(end)?,
            None => from,
        };
        Self::new(from, to)
    }
}

/// A verse label as it appears on a source site: `12`, `263-264`, `12a`, `1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerseNumber {
    raw: String,
    start: u32,
    end: u32,
}

impl VerseNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (start, end) = split_range(raw)?;
        let start_value = leading_number(start)?;
        let end_value = match end {
            Some(end) => leading_number(end)?,
            None => start_value,
        };
        if end_value < start_value {
            return None;
        }
        Some(Self {
            raw: raw.to_owned(),
            start: start_value,
            end: end_value,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn is_composite(&self) -> bool {
        self.end > self.start
    }

    pub fn overlaps(&self, window: VerseWindow) -> bool {
        self.start <= window.to && self.end >= window.from
    }

    pub fn sort_key(&self) -> String {
        sort_key(&self.raw)
    }
}

impl fmt::Display for VerseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Sort key stored next to each verse so composite and suffixed labels order
/// naturally: `NNN.NNN.NNN.SSS`, where `SSS` is the suffix char code.
pub fn sort_key(raw: &str) -> String {
    let left = raw
        .split(['-', '–'])
        .next()
        .unwrap_or_default()
        .trim();

    let Some(caps) = DOTTED.captures(left) else {
        return match leading_number(left) {
            Some(n) => format!("{n:06}"),
            None => left.to_owned(),
        };
    };

    let part = |idx: usize| {
        caps.get(idx)
            .map(|m| format!("{:0>3}", m.as_str()))
            .unwrap_or_else(|| "000".to_owned())
    };
    let suffix = caps
        .get(4)
        .and_then(|m| m.as_str().chars().next())
        .map(|c| format!("{:03}", c.to_ascii_lowercase() as u32))
        .unwrap_or_else(|| "000".to_owned());

    format!("{}.{}.{}.{suffix}", part(1), part(2), part(3))
}

/// Orders verse labels by their numeric start, then by sort key.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    let start = |raw: &str| VerseNumber::parse(raw).map(|v| v.start).unwrap_or(u32::MAX);
    start(a)
        .cmp(&start(b))
        .then_with(|| sort_key(a).cmp(&sort_key(b)))
        .then_with(|| a.cmp(b))
}

fn split_range(raw: &str) -> Option<(&str, Option<&str>)> {
    if raw.is_empty() {
        return None;
    }
    match raw.split_once(['-', '–']) {
        Some((start, end)) => Some((start.trim(), Some(end.trim()))),
        None => Some((raw, None)),
    }
}

fn leading_number(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn parse_u32(raw: &str) -> anyhow::Result<u32> {
    raw.trim()
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid number {raw:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_range_and_suffix() {
        let single = VerseNumber::parse("7").unwrap();
        assert_eq!((single.start(), single.end()), (7, 7));
        assert!(!single.is_composite());

        let range = VerseNumber::parse("263-264").unwrap();
        assert_eq!((range.start(), range.end()), (263, 264));
        assert!(range.is_composite());

        let suffixed = VerseNumber::parse("12a").unwrap();
        assert_eq!(suffixed.start(), 12);

        assert!(VerseNumber::parse("intro").is_none());
        assert!(VerseNumber::parse("5-3").is_none());
    }

    #[test]
    fn overlap_uses_whole_range() {
        let window = VerseWindow::new(1, 4).unwrap();
        assert!(VerseNumber::parse("4-5").unwrap().overlaps(window));
        assert!(!VerseNumber::parse("5-6").unwrap().overlaps(window));
    }

    #[test]
    fn sort_keys_match_dotted_layout() {
        assert_eq!(sort_key("1"), "001.000.000.000");
        assert_eq!(sort_key("12a"), "012.000.000.097");
        assert_eq!(sort_key("263-264"), "263.000.000.000");
        assert_eq!(sort_key("1.2.3"), "001.002.003.000");
        assert_eq!(sort_key("7 text"), "000007");
        assert_eq!(sort_key("intro"), "intro");
    }

    #[test]
    fn compare_labels_orders_numerically() {
        let mut labels = vec!["10", "9", "4-5", "4a", "intro"];
        labels.sort_by(|a, b| compare_labels(a, b));
        assert_eq!(labels, vec!["4-5", "4a", "9", "10", "intro"]);
    }

    #[test]
    fn window_parses_single_and_range() {
        assert_eq!(VerseWindow::parse("3").unwrap(), VerseWindow { from: 3, to: 3 });
        assert_eq!(VerseWindow::parse("1-10").unwrap(), VerseWindow { from: 1, to: 10 });
        assert!(VerseWindow::parse("10-1").is_err());
    }
}
