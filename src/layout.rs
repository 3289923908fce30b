//! Layout model: which frames exist, their order, which are hidden, and where they sit
//!
//! The layout is plain data. Anything read from disk or the wire goes through
//! [`normalize`], which never fails: malformed fields are replaced by safe
//! defaults so a damaged document degrades to "frames without boxes" instead of
//! an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::geometry::MIN_SIZE;
use crate::types::FrameBox;

/// Persisted arrangement of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct Layout {
    /// Display/tab order and default placement order
    pub order: Vec<String>,

    /// Frames currently hidden (serialized as a sorted array)
    pub hidden: BTreeSet<String>,

    /// Last known box per frame, created lazily on first placement
    pub settings: BTreeMap<String, FrameBox>,
}

impl From<Value> for Layout {
    fn from(raw: Value) -> Self {
        normalize(&raw)
    }
}

impl Layout {
    /// Build a layout showing `ids` in the given order, with no boxes yet
    pub fn with_order<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut layout = Self::default();
        for id in ids {
            let id: String = id.into();
            layout.insert_order(&id);
        }
        layout
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.order.iter().any(|o| o == id) && !self.hidden.contains(id)
    }

    /// Add or remove `id` from the hidden set. Boxes are kept so a re-shown
    /// frame returns to where it was. Returns whether anything changed.
    pub fn set_hidden(&mut self, id: &str, hidden: bool) -> bool {
        if hidden {
            self.hidden.insert(id.to_string())
        } else {
            self.hidden.remove(id)
        }
    }

    /// Append `id` to the order if it is not already there
    pub fn insert_order(&mut self, id: &str) -> bool {
        if id.is_empty() || self.order.iter().any(|o| o == id) {
            return false;
        }
        self.order.push(id.to_string());
        true
    }

    pub fn get_box(&self, id: &str) -> Option<FrameBox> {
        self.settings.get(id).copied()
    }

    pub fn set_box(&mut self, id: &str, frame_box: FrameBox) {
        self.settings.insert(id.to_string(), frame_box);
    }

    /// Visible frame ids in display order
    pub fn visible_ids(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|id| !self.hidden.contains(*id))
    }
}

/// Coerce a possibly malformed layout document into a valid [`Layout`].
///
/// Idempotent: `normalize(&to_value(normalize(x))) == normalize(x)`.
pub fn normalize(raw: &Value) -> Layout {
    let Some(obj) = raw.as_object() else {
        return Layout::default();
    };

    let mut layout = Layout::default();

    if let Some(order) = obj.get("order").and_then(Value::as_array) {
        for id in order.iter().filter_map(Value::as_str) {
            layout.insert_order(id);
        }
    }

    match obj.get("hidden") {
        Some(Value::Array(ids)) => {
            layout.hidden.extend(
                ids.iter()
                    .filter_map(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            );
        }
        // Older documents stored hidden frames as `{ "id": true }`
        Some(Value::Object(flags)) => {
            layout.hidden.extend(
                flags
                    .iter()
                    .filter(|(id, v)| !id.is_empty() && v.as_bool() == Some(true))
                    .map(|(id, _)| id.clone()),
            );
        }
        _ => {}
    }

    if let Some(settings) = obj.get("settings").and_then(Value::as_object) {
        for (id, entry) in settings {
            if id.is_empty() {
                continue;
            }
            if let Some(frame_box) = entry.as_object().map(normalize_box) {
                layout.settings.insert(id.clone(), frame_box);
            }
        }
    }

    layout
}

fn normalize_box(entry: &Map<String, Value>) -> FrameBox {
    let field = |name: &str| -> Option<i32> {
        entry
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    };

    FrameBox {
        x: field("x").unwrap_or(0).max(0),
        y: field("y").unwrap_or(0).max(0),
        w: field("w").unwrap_or(MIN_SIZE).max(MIN_SIZE),
        h: field("h").unwrap_or(MIN_SIZE).max(MIN_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renormalize(layout: &Layout) -> Layout {
        normalize(&serde_json::to_value(layout).unwrap())
    }

    #[test]
    fn test_normalize_non_object_is_empty() {
        assert_eq!(normalize(&json!(null)), Layout::default());
        assert_eq!(normalize(&json!("layout")), Layout::default());
        assert_eq!(normalize(&json!([1, 2, 3])), Layout::default());
    }

    #[test]
    fn test_normalize_missing_fields_default_to_empty() {
        let layout = normalize(&json!({ "order": ["summary"] }));
        assert_eq!(layout.order, vec!["summary".to_string()]);
        assert!(layout.hidden.is_empty());
        assert!(layout.settings.is_empty());
    }

    #[test]
    fn test_normalize_drops_junk_and_duplicates() {
        let layout = normalize(&json!({
            "order": ["summary", 7, null, "todo", "summary", ""],
            "hidden": ["todo", false, ""],
            "settings": {
                "summary": { "x": -20, "y": 40.4, "w": 100, "h": "tall" },
                "todo": "not a box",
                "": { "x": 0, "y": 0, "w": 300, "h": 300 }
            }
        }));

        assert_eq!(layout.order, vec!["summary".to_string(), "todo".to_string()]);
        assert_eq!(layout.hidden.len(), 1);
        assert!(layout.hidden.contains("todo"));
        assert_eq!(layout.settings.len(), 1);
        assert_eq!(layout.get_box("summary"), Some(FrameBox::new(0, 40, 240, 240)));
    }

    #[test]
    fn test_normalize_accepts_hidden_flag_map() {
        let layout = normalize(&json!({
            "order": ["a", "b"],
            "hidden": { "a": true, "b": false }
        }));
        assert!(layout.hidden.contains("a"));
        assert!(!layout.hidden.contains("b"));
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            json!(null),
            json!({}),
            json!({ "order": "summary" }),
            json!({ "order": ["a", "a", 3], "hidden": { "a": true, "z": 1 } }),
            json!({ "settings": { "a": { "x": 1e12, "y": -3, "w": 12.5 } } }),
            json!({
                "order": ["summary", "todo"],
                "hidden": ["todo"],
                "settings": { "summary": { "x": 0, "y": 0, "w": 300, "h": 300 } }
            }),
        ];

        for raw in inputs {
            let once = normalize(&raw);
            assert_eq!(renormalize(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_deserialize_goes_through_normalize() {
        let layout: Layout = serde_json::from_str(r#"{"order":["a"],"hidden":"x"}"#).unwrap();
        assert_eq!(layout.order, vec!["a".to_string()]);
        assert!(layout.hidden.is_empty());
    }

    #[test]
    fn test_visibility_requires_order_and_not_hidden() {
        let mut layout = Layout::with_order(["summary", "todo"]);
        assert!(layout.is_visible("summary"));
        assert!(!layout.is_visible("charts"));

        assert!(layout.set_hidden("todo", true));
        assert!(!layout.is_visible("todo"));
        assert!(!layout.set_hidden("todo", true));

        layout.set_hidden("charts", false);
        assert!(!layout.is_visible("charts"));
    }

    #[test]
    fn test_set_hidden_keeps_box() {
        let mut layout = Layout::with_order(["summary"]);
        layout.set_box("summary", FrameBox::new(20, 40, 300, 300));

        layout.set_hidden("summary", true);
        layout.set_hidden("summary", false);

        assert_eq!(layout.get_box("summary"), Some(FrameBox::new(20, 40, 300, 300)));
    }

    #[test]
    fn test_visible_ids_follow_order() {
        let mut layout = Layout::with_order(["c", "a", "b"]);
        layout.set_hidden("a", true);
        assert_eq!(layout.visible_ids().collect::<Vec<_>>(), vec!["c", "b"]);
    }

    #[test]
    fn test_hidden_serializes_as_sorted_array() {
        let mut layout = Layout::with_order(["b", "a"]);
        layout.set_hidden("b", true);
        layout.set_hidden("a", true);
        let value = serde_json::to_value(&layout).unwrap();
        assert_eq!(value["hidden"], json!(["a", "b"]));
    }
}
