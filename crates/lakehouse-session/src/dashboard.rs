//! # Dashboard Collaborators
//!
//! Catalog, metrics, upload and search endpoints.
//!
//! These responses are presentation data the session core does not
//! interpret, so they are returned as raw JSON. Every call goes through
//! [`ApiClient`] and therefore carries the current credential.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::interceptor::ApiClient;

/// Extensions the backend accepts for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "csv", "json", "parquet", "pdf", "docx", "doc", "png", "jpg", "jpeg", "tiff", "pptx", "ppt",
];

/// Filters for the file listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileQuery {
    /// Page size.
    pub limit: u32,
    /// Rows to skip.
    pub offset: u32,
    /// Restrict to one file format (`pdf`, `image`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Case-insensitive substring of the object name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for FileQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            format: None,
            search: None,
        }
    }
}

/// Which statistics panel to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    /// Bucket usage by prefix.
    Storage,
    /// Pipeline throughput.
    Processing,
}

impl StatsKind {
    fn path(self) -> &'static str {
        match self {
            Self::Storage => "/stats/storage",
            Self::Processing => "/stats/processing",
        }
    }
}

/// Client for the dashboard's collaborator endpoints.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    api: ApiClient,
}

impl DashboardClient {
    /// Creates a client sending through `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Checks if the API is reachable and healthy.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the request fails.
    pub async fn health(&self) -> ApiResult<bool> {
        let res = self
            .api
            .execute(self.api.request(Method::GET, "/health"))
            .await?;
        Ok(res.status().is_success())
    }

    /// Metric cards for the dashboard.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiClient::send_json`] errors.
    pub async fn metrics(&self) -> ApiResult<Value> {
        self.api
            .send_json(self.api.request(Method::GET, "/dashboard/metrics"))
            .await
    }

    /// One page of the file catalog.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiClient::send_json`] errors.
    pub async fn list_files(&self, query: &FileQuery) -> ApiResult<Value> {
        self.api
            .send_json(self.api.request(Method::GET, "/files").query(query))
            .await
    }

    /// Catalog entry for one file, with object-store status.
    ///
    /// # Errors
    ///
    /// * [`ApiError::Server`] - File not found (404)
    pub async fn file_details(&self, catalog_id: i64) -> ApiResult<Value> {
        self.api
            .send_json(
                self.api
                    .request(Method::GET, &format!("/files/{catalog_id}")),
            )
            .await
    }

    /// Delete a file from the catalog and object store.
    ///
    /// # Errors
    ///
    /// * [`ApiError::Server`] - File not found (404)
    pub async fn delete_file(&self, catalog_id: i64) -> ApiResult<Value> {
        self.api
            .send_json(
                self.api
                    .request(Method::DELETE, &format!("/files/{catalog_id}")),
            )
            .await
    }

    /// Upload a file into the raw zone.
    ///
    /// # Errors
    ///
    /// * [`ApiError::InvalidInput`] - empty name or unsupported extension,
    ///   refused before anything is sent
    /// * [`ApiError::Server`] - upload rejected
    pub async fn upload(&self, file_name: &str, contents: Vec<u8>) -> ApiResult<Value> {
        check_upload_name(file_name)?;

        let part = Part::bytes(contents).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        self.api
            .send_json(self.api.request(Method::POST, "/upload").multipart(form))
            .await
    }

    /// Full-text search over extracted document text.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiClient::send_json`] errors.
    pub async fn search(&self, query: &str, limit: u32) -> ApiResult<Value> {
        self.api
            .send_json(
                self.api
                    .request(Method::GET, "/search")
                    .query(&[("query", query.to_string()), ("limit", limit.to_string())]),
            )
            .await
    }

    /// Storage or processing statistics.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiClient::send_json`] errors.
    pub async fn stats(&self, kind: StatsKind) -> ApiResult<Value> {
        self.api
            .send_json(self.api.request(Method::GET, kind.path()))
            .await
    }
}

fn check_upload_name(file_name: &str) -> ApiResult<()> {
    if file_name.trim().is_empty() {
        return Err(ApiError::InvalidInput("No filename provided".to_string()));
    }

    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "File type .{ext} not supported"
        )))
    }
}
