// src/fetch/mod.rs
pub mod urls;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

pub use urls::{Jurisdiction, DEFAULT_BASE_URL};

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 500;
const USER_AGENT: &str = concat!("wahlscraper/", env!("CARGO_PKG_VERSION"));

/// Downloads poll pages. Retries transient failures with exponential backoff.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base: Url,
    max_retries: u32,
    backoff_ms: u64,
}

impl Fetcher {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid base url {:?}", base))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            base,
            max_retries: DEFAULT_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// HTML of the jurisdiction's poll page, decoded as UTF-8 whatever the
    /// server declares.
    #[instrument(level = "info", skip(self, jurisdiction), fields(jurisdiction = %jurisdiction))]
    pub async fn fetch(&self, jurisdiction: &Jurisdiction) -> Result<String> {
        let url = jurisdiction.page_url(&self.base)?;
        let text = get_text_with_retry(&self.client, &url, self.max_retries, self.backoff_ms)
            .await
            .with_context(|| format!("fetching polls for {}", jurisdiction))?;
        debug!(bytes = text.len(), "page downloaded");
        Ok(text)
    }
}

async fn get_text_core(client: &Client, url: &Url) -> Result<String> {
    debug!("Fetching text from {}", url);
    let bytes = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn get_text_with_retry(
    client: &Client,
    url: &Url,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<String> {
    let mut attempts = 0;
    loop {
        match get_text_core(client, url).await {
            Ok(t) => return Ok(t),
            Err(e) if attempts < max_retries => {
                attempts += 1;
                let backoff = initial_backoff_ms * 2u64.pow(attempts - 1);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetcher_keeps_base_and_settings() -> Result<()> {
        let fetcher = Fetcher::new(DEFAULT_BASE_URL)?.with_retries(5, 10);
        assert_eq!(fetcher.base().as_str(), "https://www.wahlrecht.de/");
        assert_eq!(fetcher.max_retries, 5);
        assert_eq!(fetcher.backoff_ms, 10);
        Ok(())
    }

    #[test]
    fn invalid_base_is_an_error() {
        let err = Fetcher::new("not a url").expect_err("relative base must be rejected");
        assert!(err.to_string().contains("invalid base url"));
    }
}
