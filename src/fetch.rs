use crate::error::FetchError;
use scraper::Html;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://atcoder.jp";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetches pages of one judge site and parses them into documents.
///
/// Cloning is cheap: the underlying connection pool and the cancellation
/// token are shared between clones.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
    cancel: CancellationToken,
}

impl Fetcher {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            cancel,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET `path` relative to the site root. Non-2xx statuses are errors.
    pub async fn fetch(&self, path: &str) -> Result<Html, FetchError> {
        let url = self.url(path);
        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            body = self.get_text(&url) => Some(body?),
        };
        let Some(body) = body else {
            return Err(FetchError::Cancelled { url });
        };

        Ok(Html::parse_document(&body))
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(%url, "fetching");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        res.text().await.map_err(|e| transport_error(url, e))
    }
}

fn transport_error(url: &str, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source,
        }
    }
}
