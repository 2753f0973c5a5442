//! Raw series retrieval: HTTP(S) URLs or local files, as text.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request to '{url}' failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Where a price series comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Http(String),
    File(PathBuf),
}

impl SourceLocator {
    /// `http://` and `https://` locators are URLs; anything else is a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceLocator::Http(trimmed.to_string())
        } else {
            SourceLocator::File(PathBuf::from(trimmed))
        }
    }

    pub async fn fetch_text(&self) -> Result<String, FetchError> {
        match self {
            SourceLocator::Http(url) => fetch_http(url).await,
            SourceLocator::File(path) => {
                debug!(path = %path.display(), "reading series file");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Http(url) => write!(f, "{url}"),
            SourceLocator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch the raw text behind `locator` (URL or path).
pub async fn fetch_text(locator: &str) -> Result<String, FetchError> {
    SourceLocator::parse(locator).fetch_text().await
}

async fn fetch_http(url: &str) -> Result<String, FetchError> {
    let http_err = |source| FetchError::Http {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("forecastlab/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(http_err)?;

    debug!(url, "fetching series");
    let response = client.get(url).send().await.map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(http_err)
}
