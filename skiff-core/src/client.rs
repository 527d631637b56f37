use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::activity::ActivityStream;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5960";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("gateway returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("malformed activity event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Handle on one archive exposed by the host runtime's local gateway.
#[derive(Clone)]
pub struct ArchiveClient {
    http: Client,
    base_url: Url,
    key: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub recursive: bool,
    pub include_stat: bool,
}

impl ArchiveClient {
    pub fn new(key: impl Into<String>) -> Result<Self, ArchiveError> {
        Self::with_base_url(DEFAULT_BASE_URL, key)
    }

    pub fn with_base_url(base_url: &str, key: impl Into<String>) -> Result<Self, ArchiveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn get_info(&self) -> Result<ArchiveInfo, ArchiveError> {
        let url = self.endpoint("info")?;
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    pub async fn stat(&self, path: &str) -> Result<EntryStat, ArchiveError> {
        let mut url = self.endpoint("stat")?;
        url.query_pairs_mut().append_pair("path", path);
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    pub async fn list_directory(
        &self,
        path: &str,
        options: ListOptions,
    ) -> Result<Vec<DirEntry>, ArchiveError> {
        let mut url = self.endpoint("listing")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", path);
            query.append_pair("recursive", bool_str(options.recursive));
            query.append_pair("stat", bool_str(options.include_stat));
        }
        let response = self.http.get(url).send().await?;
        let payload: EntryListResponse = Self::handle_response(response).await?;
        Ok(payload.entries)
    }

    pub async fn history(
        &self,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<Vec<HistoryEntry>, ArchiveError> {
        let mut url = self.endpoint("history")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(start) = start {
                query.append_pair("start", &start.to_string());
            }
            if let Some(end) = end {
                query.append_pair("end", &end.to_string());
            }
        }
        let response = self.http.get(url).send().await?;
        let payload: HistoryResponse = Self::handle_response(response).await?;
        Ok(payload.entries)
    }

    pub async fn update_manifest(&self, update: &ManifestUpdate) -> Result<(), ArchiveError> {
        let url = self.endpoint("manifest")?;
        let response = self.http.patch(url).json(update).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Opens the long-lived activity feed. One event is emitted per line;
    /// drop the stream to close the subscription.
    pub async fn subscribe_activity(&self) -> Result<ActivityStream, ArchiveError> {
        let url = self.endpoint("activity")?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(ActivityStream::from_response(response))
    }

    fn endpoint(&self, suffix: &str) -> Result<Url, ArchiveError> {
        Ok(self
            .base_url
            .join(&format!("/v1/archives/{}/{}", self.key, suffix))?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ArchiveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> ArchiveError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ArchiveError::Api { status, body }
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveInfo {
    pub key: String,
    pub version: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub mtime: Option<String>,
    #[serde(default)]
    pub user_settings: UserSettings,
    #[serde(default)]
    pub fork_of: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub is_saved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStat {
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub blocks: u64,
    #[serde(default)]
    pub downloaded: u64,
    #[serde(default)]
    pub modified: Option<String>,
}

impl EntryStat {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Synthetic stat for a directory whose real metadata is not known yet.
    pub fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            size: None,
            blocks: 0,
            downloaded: 0,
            modified: None,
        }
    }
}

/// One row of a directory listing. `name` is slash-delimited and relative to
/// the listed path; `stat` is present when the listing was requested with stat.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(default)]
    pub stat: Option<EntryStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOp {
    Put,
    Del,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub version: u64,
    pub op: HistoryOp,
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntryListResponse {
    entries: Vec<DirEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}
