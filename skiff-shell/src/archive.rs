use std::time::Duration;

use skiff_core::{ArchiveClient, ArchiveError, ArchiveInfo, HistoryEntry, ManifestUpdate};
use thiserror::Error;

use crate::notify::{ChangeListener, ChangeNotifier};
use crate::progress::{MonitorError, ProgressMonitor};

// how much time to wait between coalesced 'changed' deliveries
const EMIT_CHANGED_WAIT: Duration = Duration::from_millis(30);

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("archive gateway error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("progress monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// One archive as the library view sees it: cached info and history, an
/// optional download monitor, and a coalesced changed signal for re-renders.
pub struct LibraryArchive {
    client: ArchiveClient,
    info: Option<ArchiveInfo>,
    history: Vec<HistoryEntry>,
    fetching_history: bool,
    progress: Option<ProgressMonitor>,
    changed: ChangeNotifier,
}

impl LibraryArchive {
    pub fn new(client: ArchiveClient) -> Self {
        Self {
            client,
            info: None,
            history: Vec::new(),
            fetching_history: false,
            progress: None,
            changed: ChangeNotifier::new(EMIT_CHANGED_WAIT),
        }
    }

    pub async fn setup(&mut self) -> Result<(), LibraryError> {
        let info = self.client.get_info().await?;
        self.info = Some(info);
        self.changed.trigger();
        Ok(())
    }

    /// Loads the archive's change history. A call that lands while another
    /// fetch is in flight returns without fetching.
    pub async fn fetch_history(&mut self) -> Result<(), LibraryError> {
        if self.fetching_history {
            return Ok(());
        }
        self.fetching_history = true;
        let result = self.client.history(None, None).await;
        self.fetching_history = false;

        self.history = result?;
        self.changed.trigger();
        Ok(())
    }

    /// Starts download-progress monitoring; repeat calls keep the running
    /// monitor.
    pub async fn start_download_monitor(&mut self) -> Result<(), LibraryError> {
        if self.progress.is_some() {
            return Ok(());
        }
        let mut monitor = ProgressMonitor::new(self.client.clone());
        monitor.start().await?;
        self.progress = Some(monitor);
        Ok(())
    }

    /// Renames the archive through its manifest and refreshes the cached
    /// title.
    pub async fn rename(&mut self, title: impl Into<String>) -> Result<(), LibraryError> {
        let title = title.into();
        self.client
            .update_manifest(&ManifestUpdate {
                title: Some(title.clone()),
                description: None,
            })
            .await?;
        if let Some(info) = self.info.as_mut() {
            info.title = Some(title);
        }
        self.changed.trigger();
        Ok(())
    }

    /// Tears down the monitor and the changed signal. Idempotent.
    pub fn destroy(&mut self) {
        if let Some(mut monitor) = self.progress.take() {
            monitor.destroy();
        }
        self.changed.close();
    }

    pub fn subscribe(&self) -> ChangeListener {
        self.changed.subscribe()
    }

    pub fn progress(&self) -> Option<&ProgressMonitor> {
        self.progress.as_ref()
    }

    pub fn info(&self) -> Option<&ArchiveInfo> {
        self.info.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn key(&self) -> &str {
        self.client.key()
    }

    pub fn nice_name(&self) -> &str {
        self.info
            .as_ref()
            .and_then(|info| info.title.as_deref())
            .filter(|title| !title.is_empty())
            .unwrap_or("Untitled")
    }

    pub fn is_saved(&self) -> bool {
        self.info
            .as_ref()
            .is_some_and(|info| info.user_settings.is_saved)
    }

    pub fn fork_of(&self) -> Option<&str> {
        self.info
            .as_ref()?
            .fork_of
            .first()
            .map(String::as_str)
    }
}

impl Drop for LibraryArchive {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn archive_for(server: &MockServer) -> LibraryArchive {
        let client = ArchiveClient::with_base_url(&server.uri(), "k").unwrap();
        LibraryArchive::new(client)
    }

    fn info_body(title: &str) -> serde_json::Value {
        json!({
            "key": "k",
            "version": 7,
            "title": title,
            "isOwner": true,
            "userSettings": {"isSaved": true},
            "forkOf": ["origin-key"]
        })
    }

    #[tokio::test]
    async fn setup_caches_info_and_exposes_accessors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/archives/k/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body("My Site")))
            .mount(&server)
            .await;

        let mut archive = archive_for(&server).await;
        assert_eq!(archive.nice_name(), "Untitled");
        assert!(!archive.is_saved());

        archive.setup().await.unwrap();

        assert_eq!(archive.key(), "k");
        assert_eq!(archive.nice_name(), "My Site");
        assert!(archive.is_saved());
        assert_eq!(archive.fork_of(), Some("origin-key"));
    }

    #[tokio::test]
    async fn empty_title_falls_back_to_untitled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/archives/k/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body("")))
            .mount(&server)
            .await;

        let mut archive = archive_for(&server).await;
        archive.setup().await.unwrap();
        assert_eq!(archive.nice_name(), "Untitled");
    }

    #[tokio::test]
    async fn fetch_history_stores_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/archives/k/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    {"version": 1, "op": "put", "path": "/index.html"}
                ]
            })))
            .mount(&server)
            .await;

        let mut archive = archive_for(&server).await;
        archive.fetch_history().await.unwrap();

        assert_eq!(archive.history().len(), 1);
        assert_eq!(archive.history()[0].path, "/index.html");
    }

    #[tokio::test]
    async fn overlapped_history_fetch_is_skipped() {
        let server = MockServer::start().await;
        // no history mock: a fetch that actually ran would fail
        let mut archive = archive_for(&server).await;

        archive.fetching_history = true;
        archive.fetch_history().await.unwrap();
        assert!(archive.history().is_empty());
    }

    #[tokio::test]
    async fn rename_updates_manifest_and_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/archives/k/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body("Old")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1/archives/k/manifest"))
            .and(body_json(json!({"title": "New"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut archive = archive_for(&server).await;
        archive.setup().await.unwrap();
        archive.rename("New").await.unwrap();

        assert_eq!(archive.nice_name(), "New");
    }

    #[tokio::test]
    async fn start_download_monitor_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/archives/k/listing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entries": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/archives/k/activity"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("", "application/x-ndjson"))
            .mount(&server)
            .await;

        let mut archive = archive_for(&server).await;
        archive.start_download_monitor().await.unwrap();
        archive.start_download_monitor().await.unwrap();
        assert!(archive.progress().is_some());
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_closes_listeners() {
        let server = MockServer::start().await;
        let mut archive = archive_for(&server).await;
        let mut listener = archive.subscribe();

        archive.destroy();
        archive.destroy();

        assert!(!listener.changed().await);
    }
}
