use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::fetch::{DirectFetcher, HtmlFetcher, ProxyFetcher};
use crate::retry::RetryPolicy;

pub const DEFAULT_VEDABASE_BASE: &str = "https://vedabase.io";
pub const DEFAULT_GITABASE_BASE: &str = "https://gitabase.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    Direct,
    Proxy { endpoint: Url, token: Option<String> },
}

/// Everything that steers an import run. Built once from the environment and
/// CLI overrides, then passed down explicitly.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub fetch_mode: FetchMode,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    /// Fixed pause between consecutive segment fetches.
    pub throttle: Duration,
    pub vedabase_base: Url,
    pub gitabase_base: Url,
    pub extra_allowed_hosts: Vec<String>,
    pub derive_uk_transliteration: bool,
    pub normalize_fields: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            fetch_mode: FetchMode::Direct,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(15),
            throttle: Duration::from_millis(500),
            vedabase_base: Url::parse(DEFAULT_VEDABASE_BASE).expect("valid default url"),
            gitabase_base: Url::parse(DEFAULT_GITABASE_BASE).expect("valid default url"),
            extra_allowed_hosts: Vec::new(),
            derive_uk_transliteration: true,
            normalize_fields: true,
        }
    }
}

impl ImportConfig {
    /// Reads `VERSE_IMPORT_*` variables on top of the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("VERSE_IMPORT_PROXY_URL").filter(|v| !v.trim().is_empty())
        {
            let endpoint = Url::parse(endpoint.trim()).context("parse VERSE_IMPORT_PROXY_URL")?;
            let token = lookup("VERSE_IMPORT_PROXY_TOKEN").filter(|v| !v.trim().is_empty());
            config.fetch_mode = FetchMode::Proxy { endpoint, token };
        }
        if let Some(raw) = lookup("VERSE_IMPORT_THROTTLE_MS") {
            config.throttle = Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid VERSE_IMPORT_THROTTLE_MS={raw:?}"))?,
            );
        }
        if let Some(raw) = lookup("VERSE_IMPORT_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid VERSE_IMPORT_TIMEOUT_SECS={raw:?}"))?,
            );
        }
        if let Some(raw) = lookup("VERSE_IMPORT_MAX_ATTEMPTS") {
            config.retry.max_attempts = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid VERSE_IMPORT_MAX_ATTEMPTS={raw:?}"))?;
        }
        if let Some(raw) = lookup("VERSE_IMPORT_VEDABASE_BASE") {
            config.vedabase_base =
                Url::parse(raw.trim()).context("parse VERSE_IMPORT_VEDABASE_BASE")?;
        }
        if let Some(raw) = lookup("VERSE_IMPORT_GITABASE_BASE") {
            config.gitabase_base =
                Url::parse(raw.trim()).context("parse VERSE_IMPORT_GITABASE_BASE")?;
        }
        if let Some(raw) = lookup("VERSE_IMPORT_ALLOWED_HOSTS") {
            config.extra_allowed_hosts = raw
                .split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(raw) = lookup("VERSE_IMPORT_DERIVE_UK_TRANSLITERATION") {
            config.derive_uk_transliteration = parse_bool(&raw)
                .context("invalid VERSE_IMPORT_DERIVE_UK_TRANSLITERATION")?;
        }

        Ok(config)
    }

    /// Source hosts plus operator-supplied extras, with and without `www.`.
    pub fn allowed_hosts(&self) -> Vec<String> {
        let mut hosts = Vec::new();
        for base in [&self.vedabase_base, &self.gitabase_base] {
            if let Some(host) = base.host_str() {
                let host = host.to_ascii_lowercase();
                match host.strip_prefix("www.") {
                    Some(bare) => hosts.push(bare.to_owned()),
                    None => hosts.push(format!("www.{host}")),
                }
                hosts.push(host);
            }
        }
        hosts.extend(self.extra_allowed_hosts.iter().map(|h| h.to_ascii_lowercase()));
        hosts.sort();
        hosts.dedup();
        hosts
    }

    pub fn build_fetcher(&self) -> anyhow::Result<Arc<dyn HtmlFetcher>> {
        match &self.fetch_mode {
            FetchMode::Direct => {
                let fetcher = DirectFetcher::new(self.request_timeout, self.allowed_hosts())
                    .context("build direct fetcher")?;
                Ok(Arc::new(fetcher))
            }
            FetchMode::Proxy { endpoint, token } => {
                let fetcher =
                    ProxyFetcher::new(endpoint.clone(), token.clone(), self.request_timeout)
                        .context("build proxy fetcher")?;
                Ok(Arc::new(fetcher))
            }
        }
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_policy() -> anyhow::Result<()> {
        let config = ImportConfig::from_lookup(lookup(&[]))?;
        assert_eq!(config.fetch_mode, FetchMode::Direct);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.derive_uk_transliteration);
        Ok(())
    }

    #[test]
    fn proxy_mode_from_env() -> anyhow::Result<()> {
        let config = ImportConfig::from_lookup(lookup(&[
            ("VERSE_IMPORT_PROXY_URL", "https://project.example/functions/v1/fetch-html"),
            ("VERSE_IMPORT_PROXY_TOKEN", "secret"),
            ("VERSE_IMPORT_THROTTLE_MS", "0"),
        ]))?;
        match config.fetch_mode {
            FetchMode::Proxy { endpoint, token } => {
                assert_eq!(endpoint.host_str(), Some("project.example"));
                assert_eq!(token.as_deref(), Some("secret"));
            }
            FetchMode::Direct => panic!("expected proxy mode"),
        }
        assert!(config.throttle.is_zero());
        Ok(())
    }

    #[test]
    fn rejects_bad_numbers() {
        let result = ImportConfig::from_lookup(lookup(&[("VERSE_IMPORT_THROTTLE_MS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn allowed_hosts_cover_www_variants() -> anyhow::Result<()> {
        let config = ImportConfig::from_lookup(lookup(&[(
            "VERSE_IMPORT_ALLOWED_HOSTS",
            "kksongs.org, ",
        )]))?;
        let hosts = config.allowed_hosts();
        for host in [
            "vedabase.io",
            "www.vedabase.io",
            "gitabase.com",
            "www.gitabase.com",
            "kksongs.org",
        ] {
            assert!(hosts.contains(&host.to_owned()), "missing {host}");
        }
        Ok(())
    }
}
