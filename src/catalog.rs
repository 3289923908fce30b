//! Frame catalog boundary
//!
//! The catalog owns what is drawn inside a frame. The layout engine only needs
//! each frame's id, a display title and an optional default size.

use serde::{Deserialize, Serialize};

use crate::types::FrameSize;

/// One available widget, as announced by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_size: Option<FrameSize>,
}

impl FrameInfo {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: Some(title.to_string()),
            default_size: None,
        }
    }

    pub fn with_default_size(mut self, w: i32, h: i32) -> Self {
        self.default_size = Some(FrameSize::new(w, h));
        self
    }

    /// Title for lists and headers, falling back to the id
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// Lookup over the frames a backend reported
#[derive(Debug, Clone, Default)]
pub struct FrameCatalog {
    frames: Vec<FrameInfo>,
}

impl FrameCatalog {
    pub fn new(frames: Vec<FrameInfo>) -> Self {
        Self { frames }
    }

    /// Widgets shipped with the console, used when a store has no document yet
    pub fn builtin() -> Self {
        Self::new(vec![
            FrameInfo::new("summary", "Summary").with_default_size(360, 280),
            FrameInfo::new("todo", "To-do"),
            FrameInfo::new("incidents", "Open incidents"),
            FrameInfo::new("tasks", "Tasks"),
            FrameInfo::new("monitoring", "Monitoring").with_default_size(480, 300),
        ])
    }

    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    pub fn get(&self, id: &str) -> Option<&FrameInfo> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn title(&self, id: &str) -> String {
        self.get(id)
            .map(|f| f.display_title().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Catalog size hint for `id`, or `fallback` when there is none
    pub fn default_frame_size(&self, id: &str, fallback: FrameSize) -> FrameSize {
        self.get(id).and_then(|f| f.default_size).unwrap_or(fallback)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(|f| f.id.as_str())
    }
}
