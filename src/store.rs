//! Persistence boundary: where layout documents are loaded from and saved to
//!
//! A store hands out the whole document (`layout`, `default_layout`, `frames`)
//! on load and accepts a whole `layout` on save. There are no partial updates.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::catalog::{FrameCatalog, FrameInfo};
use crate::error::StoreError;
use crate::ipc::IpcStore;
use crate::layout::Layout;

/// Payload returned by a load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub default_layout: Layout,
    #[serde(default)]
    pub frames: Vec<FrameInfo>,
}

impl LayoutDocument {
    /// Document for a store that has never been saved to: every built-in
    /// frame shown in catalog order
    pub fn builtin() -> Self {
        let catalog = FrameCatalog::builtin();
        let default_layout = Layout::with_order(catalog.ids());
        Self {
            layout: default_layout.clone(),
            default_layout,
            frames: catalog.frames().to_vec(),
        }
    }
}

/// Payload accepted by a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub layout: Layout,
}

/// Remote store contract. Both calls may suspend; neither has a timeout.
pub trait LayoutStore {
    fn load(&self) -> impl Future<Output = Result<LayoutDocument, StoreError>>;
    fn save(&self, layout: &Layout) -> impl Future<Output = Result<(), StoreError>>;
}

/// In-process store with switchable failures
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<LayoutDocument>,
    fail_load: AtomicBool,
    fail_save: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new(document: LayoutDocument) -> Self {
        Self {
            document: Mutex::new(document),
            ..Self::default()
        }
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn document(&self) -> LayoutDocument {
        self.document.lock().await.clone()
    }
}

impl LayoutStore for MemoryStore {
    async fn load(&self) -> Result<LayoutDocument, StoreError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("load refused".to_string()));
        }
        Ok(self.document.lock().await.clone())
    }

    async fn save(&self, layout: &Layout) -> Result<(), StoreError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("save refused".to_string()));
        }
        self.document.lock().await.layout = layout.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// JSON document on local disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file yields the built-in document
    pub fn load_blocking(&self) -> Result<LayoutDocument, StoreError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No layout document yet, using built-in frames");
            return Ok(LayoutDocument::builtin());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let document: LayoutDocument = serde_json::from_str(&contents)?;
        debug!(path = %self.path.display(), frames = document.frames.len(), "Loaded layout document");
        Ok(document)
    }

    /// Replace the document's layout and rewrite the file
    pub fn save_blocking(&self, layout: &Layout) -> Result<(), StoreError> {
        let mut document = self.load_blocking()?;
        document.layout = layout.clone();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, contents)?;
        info!(path = %self.path.display(), frames = layout.settings.len(), "Saved layout document");
        Ok(())
    }
}

impl LayoutStore for FileStore {
    async fn load(&self) -> Result<LayoutDocument, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_blocking())
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
    }

    async fn save(&self, layout: &Layout) -> Result<(), StoreError> {
        let store = self.clone();
        let layout = layout.clone();
        tokio::task::spawn_blocking(move || store.save_blocking(&layout))
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
    }
}

/// Store selected by the console configuration
#[derive(Debug, Clone)]
pub enum StoreBackend {
    File(FileStore),
    Ipc(IpcStore),
}

impl LayoutStore for StoreBackend {
    async fn load(&self) -> Result<LayoutDocument, StoreError> {
        match self {
            StoreBackend::File(store) => store.load().await,
            StoreBackend::Ipc(store) => store.load().await,
        }
    }

    async fn save(&self, layout: &Layout) -> Result<(), StoreError> {
        match self {
            StoreBackend::File(store) => store.save(layout).await,
            StoreBackend::Ipc(store) => store.save(layout).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameBox;

    #[test]
    fn test_document_wire_shape() {
        let mut layout = Layout::with_order(["summary", "todo"]);
        layout.set_hidden("todo", true);
        layout.set_box("summary", FrameBox::new(0, 0, 360, 280));
        let value = serde_json::to_value(SaveRequest { layout }).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "layout": {
                    "order": ["summary", "todo"],
                    "hidden": ["todo"],
                    "settings": { "summary": { "x": 0, "y": 0, "w": 360, "h": 280 } }
                }
            })
        );
    }

    #[test]
    fn test_document_tolerates_malformed_layout() {
        let document: LayoutDocument =
            serde_json::from_str(r#"{"layout": 42, "frames": [{"id": "summary"}]}"#).unwrap();
        assert_eq!(document.layout, Layout::default());
        assert_eq!(document.default_layout, Layout::default());
        assert_eq!(document.frames.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_save_and_fail() {
        let store = MemoryStore::new(LayoutDocument::builtin());
        let layout = Layout::with_order(["todo"]);

        store.save(&layout).await.unwrap();
        assert_eq!(store.document().await.layout, layout);
        assert_eq!(store.save_count(), 1);

        store.set_fail_save(true);
        assert!(matches!(store.save(&Layout::default()).await, Err(StoreError::Remote(_))));
        assert_eq!(store.document().await.layout, layout);
        assert_eq!(store.save_count(), 1);

        store.set_fail_load(true);
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("dashboard.json"));
        let document = store.load().await.unwrap();
        assert_eq!(document, LayoutDocument::builtin());
    }

    #[tokio::test]
    async fn test_file_store_save_replaces_layout_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("dashboard.json"));

        let mut layout = Layout::with_order(["todo", "summary"]);
        layout.set_box("todo", FrameBox::new(20, 40, 300, 300));
        store.save(&layout).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.layout, layout);
        assert_eq!(reloaded.default_layout, LayoutDocument::builtin().default_layout);
        assert_eq!(reloaded.frames, LayoutDocument::builtin().frames);
    }

    #[tokio::test]
    async fn test_file_store_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(path);
        assert!(matches!(store.load().await, Err(StoreError::Parse(_))));
    }
}
