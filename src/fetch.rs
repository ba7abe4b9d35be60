use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::retry::RetryPolicy;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";
const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {0}")]
    Upstream(u16),
    #[error("{message}")]
    Backend { message: String, retriable: bool },
    #[error("host not allowed: {0}")]
    HostNotAllowed(String),
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream(status) => *status == 429 || *status >= 500,
            Self::Backend { retriable, .. } => *retriable,
            Self::NotFound | Self::HostNotAllowed(_) | Self::InvalidUrl { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// What the pipeline sees after retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Html(String),
    NotFound,
    Error(String),
}

#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError>;
}

pub async fn fetch_with_retry(
    fetcher: &dyn HtmlFetcher,
    policy: &RetryPolicy,
    url: &Url,
) -> FetchOutcome {
    let result = policy
        .run(
            |attempt| async move {
                let result = fetcher.fetch_html(url).await;
                if let Err(err) = &result {
                    tracing::debug!(%url, attempt, %err, "fetch attempt failed");
                }
                result
            },
            FetchError::is_retriable,
        )
        .await;

    match result {
        Ok(html) => FetchOutcome::Html(html),
        Err(FetchError::NotFound) => FetchOutcome::NotFound,
        Err(err) => FetchOutcome::Error(err.to_string()),
    }
}

fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("build http client")
}

/// Fetches pages straight from the source sites, restricted to an allow-list
/// of hosts.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: reqwest::Client,
    allowed_hosts: HashSet<String>,
}

impl DirectFetcher {
    pub fn new(
        timeout: Duration,
        allowed_hosts: impl IntoIterator<Item = String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|host| host.to_ascii_lowercase())
                .collect(),
        })
    }

    fn check_host(&self, url: &Url) -> Result<(), FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_owned(),
            })?
            .to_ascii_lowercase();
        if self.allowed_hosts.contains(&host) {
            return Ok(());
        }
        Err(FetchError::HostNotAllowed(host))
    }
}

#[async_trait]
impl HtmlFetcher for DirectFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        self.check_host(url)?;

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, HTML_ACCEPT)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9,uk;q=0.8")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Upstream(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyResponse {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    retriable: bool,
    #[serde(default)]
    not_found: bool,
}

/// Fetches through a "fetch HTML" backend function that answers
/// `{html}`, `{error, retriable}` or `{notFound: true}`.
#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl ProxyFetcher {
    pub fn new(endpoint: Url, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
            token,
        })
    }
}

#[async_trait]
impl HtmlFetcher for ProxyFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&ProxyRequest { url: url.as_str() });
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProxyResponse>(&raw)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("proxy returned {status}"));
            // Auth and request-shape rejections will not change on retry.
            let retriable = !matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            );
            return Err(FetchError::Backend { message, retriable });
        }

        decode_proxy_response(&raw)
    }
}

fn decode_proxy_response(raw: &str) -> Result<String, FetchError> {
    let body: ProxyResponse = serde_json::from_str(raw).map_err(|err| FetchError::Backend {
        message: format!("malformed proxy response: {err}"),
        retriable: true,
    })?;

    if body.not_found {
        return Err(FetchError::NotFound);
    }
    if let Some(html) = body.html {
        return Ok(html);
    }
    Err(FetchError::Backend {
        message: body.error.unwrap_or_else(|| "empty proxy response".to_owned()),
        retriable: body.retriable,
    })
}
