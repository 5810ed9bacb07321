//! # API client for the dataframe backend
//!
//! Thin wrapper over `reqwest` bound to the configured base URL. No retries: callers
//! decide what to do with a failure.

use crate::config::ClientConfig;
use crate::error::CleanerError;
use crate::model::{DataFrameMeta, ProcessRequest, SyncUpload, UploadAccepted, VersionPayload};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("dataframe-cleaner/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const UPLOAD_ASYNC_PATH: &str = "/api/dataframes-async/";
pub const UPLOAD_V1_PATH: &str = "/api/rest/dataframes/";
pub const UPLOAD_V2_PATH: &str = "/api/rest/dataframesv2/";

pub fn dataframe_path(dataframe_id: &str) -> String {
    format!("/api/dataframes/{dataframe_id}/")
}

pub fn version_path(dataframe_id: &str, version_id: &str) -> String {
    format!("/api/dataframes/{dataframe_id}/versions/{version_id}")
}

pub fn process_path(dataframe_id: &str) -> String {
    format!("/api/dataframes/{dataframe_id}/process-async/")
}

pub fn download_path(dataframe_id: &str, version_id: &str) -> String {
    format!("/api/rest/dataframes/{dataframe_id}/download/{version_id}")
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, CleanerError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = config.auth_token.as_deref() {
            let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {token}"))?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Uploads a file for asynchronous processing and returns the new dataframe id.
    pub async fn upload(&self, path: &Path) -> Result<UploadAccepted, CleanerError> {
        let url = self.config.url(UPLOAD_ASYNC_PATH);
        let res = self.post_file(&url, path).await?;
        let accepted: UploadAccepted = parse_json(&url, res).await?;
        log::info!("upload accepted as dataframe {}", accepted.dataframe_id);
        Ok(accepted)
    }

    /// Synchronous upload returning a column-oriented object.
    pub async fn upload_columns(&self, path: &Path) -> Result<Map<String, Value>, CleanerError> {
        let url = self.config.url(UPLOAD_V1_PATH);
        let res = self.post_file(&url, path).await?;
        parse_json(&url, res).await
    }

    /// Synchronous upload returning rows plus schema.
    pub async fn upload_table(&self, path: &Path) -> Result<SyncUpload, CleanerError> {
        let url = self.config.url(UPLOAD_V2_PATH);
        let res = self.post_file(&url, path).await?;
        parse_json(&url, res).await
    }

    pub async fn dataframe(&self, dataframe_id: &str) -> Result<DataFrameMeta, CleanerError> {
        let url = self.config.url(&dataframe_path(dataframe_id));
        log::debug!("api::dataframe {url}");
        let res = self.client.get(&url).send().await?;
        parse_json(&url, res).await
    }

    pub async fn version(
        &self,
        dataframe_id: &str,
        version_id: &str,
    ) -> Result<VersionPayload, CleanerError> {
        let url = self.config.url(&version_path(dataframe_id, version_id));
        log::debug!("api::version {url}");
        let res = self.client.get(&url).send().await?;
        parse_json(&url, res).await
    }

    /// Requests a new version. The backend processes it asynchronously, so the
    /// response body carries nothing the client needs.
    pub async fn process(
        &self,
        dataframe_id: &str,
        request: &ProcessRequest,
    ) -> Result<(), CleanerError> {
        let url = self.config.url(&process_path(dataframe_id));
        log::debug!(
            "api::process {url} {} on {}",
            request.operation.kind(),
            request.column
        );
        let res = self.client.post(&url).json(request).send().await?;
        check_status(&url, res).await.map(|_| ())
    }

    pub async fn download(
        &self,
        dataframe_id: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, CleanerError> {
        let url = self.config.url(&download_path(dataframe_id, version_id));
        log::debug!("api::download {url}");
        let res = self.client.get(&url).send().await?;
        let res = check_status(&url, res).await?;
        Ok(res.bytes().await?.to_vec())
    }

    async fn post_file(&self, url: &str, path: &Path) -> Result<Response, CleanerError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        log::debug!("api::post_file {url} {file_name} ({} bytes)", bytes.len());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        Ok(self.client.post(url).multipart(form).send().await?)
    }
}

async fn check_status(url: &str, res: Response) -> Result<Response, CleanerError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await?;
    log::debug!("url: {url}\nstatus: {status}\nbody: {body}");
    Err(CleanerError::from_response_body(status.as_u16(), &body))
}

async fn parse_json<T: DeserializeOwned>(url: &str, res: Response) -> Result<T, CleanerError> {
    let res = check_status(url, res).await?;
    let body = res.text().await?;
    log::debug!("url: {url}\nbody: {} bytes", body.len());
    Ok(serde_json::from_str(&body)?)
}
