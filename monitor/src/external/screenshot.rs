use reqwest::blocking::Client;

use super::Screenshotter;
use crate::config::ScreenshotConfig;
use crate::error::ExternalError;

const SERVICE: &str = "screenshot service";

/// Screenshot API taking the target as query parameters and answering with
/// the image body.
pub struct HttpScreenshotter {
    client: Client,
    config: ScreenshotConfig,
}

impl HttpScreenshotter {
    pub fn new(client: Client, config: ScreenshotConfig) -> Self {
        Self { client, config }
    }
}

impl Screenshotter for HttpScreenshotter {
    fn capture(&self, url: &str) -> Result<Vec<u8>, ExternalError> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("access_key", self.config.api_key.as_str()),
                ("url", url),
                ("format", "png"),
                ("full_page", "true"),
            ])
            .send()
            .map_err(|err| ExternalError::Request {
                service: SERVICE,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExternalError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|err| ExternalError::Response {
            service: SERVICE,
            message: err.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(ExternalError::Response {
                service: SERVICE,
                message: "empty image".to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}
