//! Page fetching.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Anything that can turn a URL into page text.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher with browser-like headers.
pub struct HttpFetcher {
    client: Client,
    retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            retries: config.retries,
        })
    }

    fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().map_err(classify)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Ok(body) => {
                    debug!(url, bytes = body.len(), "fetched page");
                    return Ok(body);
                }
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    warn!(url, attempt, error = %err, "fetch failed, retrying");
                    thread::sleep(Duration::from_millis(500 * u64::from(attempt)));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Transport(err.to_string())
    }
}
