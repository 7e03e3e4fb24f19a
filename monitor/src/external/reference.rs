use std::fs;
use std::path::Path;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use super::{RecordDraft, RecordRef, ReferenceManager, RemoteRecord};
use crate::config::ReferenceConfig;
use crate::error::ExternalError;

const SERVICE: &str = "reference manager";

/// JSON client for the reference-manager web API.
///
/// Records live in one collection; files are uploaded as raw bodies to the
/// record's attachment endpoint.
pub struct HttpReferenceManager {
    client: Client,
    config: ReferenceConfig,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    key: String,
    #[serde(default)]
    link: Option<String>,
}

impl HttpReferenceManager {
    pub fn new(client: Client, config: ReferenceConfig) -> Self {
        Self { client, config }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn items_url(&self) -> String {
        format!("{}/collections/{}/items", self.base(), self.config.collection)
    }

    fn record_link(&self, key: &str) -> String {
        format!("{}/items/{}", self.base(), key)
    }
}

impl ReferenceManager for HttpReferenceManager {
    fn list_records(&self) -> Result<Vec<RemoteRecord>, ExternalError> {
        let response = self
            .client
            .get(self.items_url())
            .bearer_auth(&self.config.api_key)
            .send()
            .map_err(request_error)?;
        checked(response)?.json().map_err(response_error)
    }

    fn create_record(&self, draft: &RecordDraft) -> Result<RecordRef, ExternalError> {
        let response = self
            .client
            .post(self.items_url())
            .bearer_auth(&self.config.api_key)
            .json(draft)
            .send()
            .map_err(request_error)?;
        let created: CreatedRecord = checked(response)?.json().map_err(response_error)?;
        let link = created
            .link
            .filter(|link| !link.trim().is_empty())
            .unwrap_or_else(|| self.record_link(&created.key));
        Ok(RecordRef {
            key: created.key,
            link,
        })
    }

    fn attach_file(&self, record: &RecordRef, path: &Path) -> Result<(), ExternalError> {
        let body = fs::read(path).map_err(|source| ExternalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.html".to_string());

        let response = self
            .client
            .put(format!("{}/attachment", self.record_link(&record.key)))
            .bearer_auth(&self.config.api_key)
            .query(&[("filename", filename.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(body)
            .send()
            .map_err(request_error)?;
        checked(response)?;
        Ok(())
    }
}

fn checked(response: Response) -> Result<Response, ExternalError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ExternalError::Status {
            service: SERVICE,
            status: status.as_u16(),
        })
    }
}

fn request_error(err: reqwest::Error) -> ExternalError {
    ExternalError::Request {
        service: SERVICE,
        message: err.to_string(),
    }
}

fn response_error(err: reqwest::Error) -> ExternalError {
    ExternalError::Response {
        service: SERVICE,
        message: err.to_string(),
    }
}
