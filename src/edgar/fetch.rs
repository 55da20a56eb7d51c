// src/edgar/fetch.rs
use std::time::Duration;

use rand::Rng;
use reqwest::header;
use serde::de::DeserializeOwned;

use crate::utils::error::FetchError;

/// Retry/timeout knobs for EDGAR requests.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Attempts per JSON fetch before giving up.
    pub max_attempts: u32,
    /// Per-attempt timeout for JSON endpoints.
    pub json_timeout: Duration,
    /// Per-attempt timeout for document downloads.
    pub doc_timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            json_timeout: Duration::from_secs(20),
            doc_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP front door for everything the archiver asks of EDGAR.
///
/// All requests carry the configured User-Agent; SEC's fair-access policy
/// requires a descriptive client identity with a contact address, and
/// requests without one risk being blocked.
pub struct SecFetcher {
    client: reqwest::Client,
    policy: FetchPolicy,
}

impl SecFetcher {
    pub fn new(user_agent: &str, policy: FetchPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, policy })
    }

    /// Fetches and deserializes a JSON document, retrying transient failures
    /// with exponential backoff plus jitter. Exhausting all attempts yields a
    /// terminal error carrying the URL and the last underlying cause.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let mut last_error = String::new();
        for attempt in 0..self.policy.max_attempts {
            match self.try_json::<T>(url).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        "GET failed ({}). Retry {}/{} in {:.2}s: {}",
                        url,
                        attempt + 1,
                        self.policy.max_attempts,
                        delay.as_secs_f64(),
                        err
                    );
                    last_error = err.to_string();
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.policy.max_attempts,
            last_error,
        })
    }

    async fn try_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.policy.json_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status));
        }
        Ok(response.json::<T>().await?)
    }

    /// Fetches a raw document body in a single attempt. Document downloads
    /// keep the simpler no-retry policy of the JSON fetcher's callers.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.policy.doc_timeout)
            // SEC serves filings under a few content types
            .header(header::ACCEPT, "application/xml,text/html,text/plain,*/*")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            return Err(FetchError::Http(status));
        }
        tracing::debug!("Status: {}", status);
        tracing::debug!(
            "Content-Type: {:?}",
            response.headers().get(header::CONTENT_TYPE)
        );
        tracing::debug!("Final URL: {}", response.url());
        let body = response.bytes().await?;
        tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

/// Waits 2^attempt seconds plus a uniform 0.2-1.2s jitter term, so retrying
/// clients don't hit EDGAR in lockstep.
fn backoff_delay(attempt: u32) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.2..1.2);
    Duration::from_secs_f64((1u64 << attempt.min(16)) as f64 + jitter)
}
