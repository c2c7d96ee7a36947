use crate::target::ClientConfig;
use crate::types::SkipReason;

use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Failed to decode body of {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl From<ScraperError> for SkipReason {
    fn from(err: ScraperError) -> Self {
        match err {
            ScraperError::HttpError(e) => SkipReason::Transport(e.to_string()),
            ScraperError::Status { status, .. } => SkipReason::Status(status),
            ScraperError::Decode { reason, .. } => SkipReason::Unparseable(reason),
        }
    }
}

/// Source of HTML pages. [`WebScraper`] is the network implementation.
pub trait Fetch {
    fn get_html(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>>;
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
}

impl WebScraper {
    pub fn new(config: &ClientConfig) -> Result<Self, ScraperError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        });

        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if config.accept_invalid_certs {
            log::warn!("TLS certificate verification is disabled for this client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetch for WebScraper {
    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::debug!("HTTP error: {e:?}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ScraperError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
