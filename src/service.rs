//! Analytics service client.
//!
//! Blocking reqwest client; callers run it off the UI thread.

use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::{AreaList, HealthStatus, QueryFailure, Record, ResultSet, UploadReceipt};
use crate::upload::UploadFile;

pub const QUERY_FALLBACK_MESSAGE: &str = "Failed to process query. Please try again.";
pub const UPLOAD_FALLBACK_MESSAGE: &str = "Upload failed. Please try again.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {0}: {1}")]
    Http(u16, String),
    /// The service answered with a structured `{error, suggestions?}` body.
    #[error("{0}")]
    Rejected(QueryFailure),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Validation(String),
}

impl ServiceError {
    /// Banner text for a failed query.
    pub fn query_message(&self) -> String {
        match self {
            ServiceError::Rejected(failure) if !failure.error.is_empty() => failure.error.clone(),
            _ => QUERY_FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Toast text for a failed upload.
    pub fn upload_message(&self) -> String {
        match self {
            ServiceError::Rejected(failure) if !failure.error.is_empty() => failure.error.clone(),
            ServiceError::Validation(msg) => msg.clone(),
            _ => UPLOAD_FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            ServiceError::Rejected(failure) => failure.suggestions.as_deref().unwrap_or(&[]),
            _ => &[],
        }
    }
}

/// Operations the client consumes from the analytics backend.
pub trait AnalyticsService: Send + Sync {
    fn submit_query(&self, query: &str) -> Result<ResultSet, ServiceError>;
    fn upload_dataset(&self, file: &UploadFile) -> Result<UploadReceipt, ServiceError>;
    fn list_areas(&self) -> Result<Vec<String>, ServiceError>;
    fn health(&self) -> Result<HealthStatus, ServiceError>;
    fn download_sample(&self) -> Result<Vec<u8>, ServiceError>;
    fn generate_spreadsheet(&self, rows: &[Record]) -> Result<Vec<u8>, ServiceError>;
}

/// HTTP implementation of [`AnalyticsService`].
#[derive(Clone)]
pub struct HttpService {
    http: Client,
    api_base: String,
}

impl HttpService {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .user_agent(format!("prop-analytics/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}/", self.api_base, route)
    }

    fn get(&self, route: &str) -> Result<Response, ServiceError> {
        let url = self.url(route);
        log::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        check_status(response)
    }

    fn post_json(&self, route: &str, body: &serde_json::Value) -> Result<Response, ServiceError> {
        let url = self.url(route);
        log::debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        check_status(response)
    }
}

impl AnalyticsService for HttpService {
    fn submit_query(&self, query: &str) -> Result<ResultSet, ServiceError> {
        let resp = self.post_json("query", &serde_json::json!({ "query": query }))?;
        decode(resp)
    }

    fn upload_dataset(&self, file: &UploadFile) -> Result<UploadReceipt, ServiceError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let url = self.url("upload");
        log::debug!("POST {} ({} bytes)", url, file.bytes.len());
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        decode(check_status(response)?)
    }

    fn list_areas(&self) -> Result<Vec<String>, ServiceError> {
        let list: AreaList = decode(self.get("areas")?)?;
        Ok(list.areas)
    }

    fn health(&self) -> Result<HealthStatus, ServiceError> {
        decode(self.get("health")?)
    }

    fn download_sample(&self) -> Result<Vec<u8>, ServiceError> {
        bytes(self.get("download-sample")?)
    }

    fn generate_spreadsheet(&self, rows: &[Record]) -> Result<Vec<u8>, ServiceError> {
        let resp = self.post_json("generate-excel", &serde_json::json!({ "data": rows }))?;
        bytes(resp)
    }
}

// ── Internal helpers ────────────────────────────────────────────────

fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.text().unwrap_or_default();
    log::debug!("service answered {}: {}", code, body);

    match serde_json::from_str::<QueryFailure>(&body) {
        Ok(failure) => Err(ServiceError::Rejected(failure)),
        Err(_) => Err(ServiceError::Http(code, body)),
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    response.json::<T>().map_err(|e| ServiceError::Parse(e.to_string()))
}

fn bytes(response: Response) -> Result<Vec<u8>, ServiceError> {
    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| ServiceError::Network(e.to_string()))
}
