use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FetchSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Rate limits, server errors and timeouts are worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
        }
    }
}

/// Anything that can turn a URL into page text.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    base_backoff: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(HttpFetcher {
            client,
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
        })
    }

    fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "ja-JP,ja;q=0.9")
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.text().map_err(transport)
    }
}

impl Fetch for HttpFetcher {
    /// Exponential backoff from `base_backoff` on retryable failures,
    /// at most `max_retries` extra attempts.
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Ok(text) => {
                    info!(
                        url,
                        bytes = text.len(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "page fetched"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = backoff_delay(self.base_backoff, attempt);
                    warn!(
                        url,
                        error = %e,
                        "fetch failed (attempt {}/{}), backing off {:.1}s",
                        attempt + 1,
                        self.max_retries + 1,
                        backoff.as_secs_f64()
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `base * 2^attempt`, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
