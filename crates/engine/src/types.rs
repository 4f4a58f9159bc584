use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque, stable identifier of one item in a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Media metadata carried alongside a caption. The engine never reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Size of the image in bytes
    #[serde(default)]
    pub size_bytes: u64,

    /// MIME type when known (e.g. "image/png")
    #[serde(default)]
    pub content_type: Option<String>,

    /// Where the image bytes can be read from, if anywhere
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Time the item entered the collection
    #[serde(default)]
    pub added_at_unix_ms: u64,
}

/// One image-and-caption record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    /// File name of the image as it was imported
    pub name: String,

    /// Free-text, comma-delimited caption
    #[serde(default)]
    pub caption: String,

    #[serde(default)]
    pub media: MediaInfo,
}

impl Item {
    /// Create an item without media metadata
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            caption: caption.into(),
            media: MediaInfo::default(),
        }
    }

    /// Builder: attach media metadata
    #[must_use]
    pub fn with_media(mut self, media: MediaInfo) -> Self {
        self.media = media;
        self
    }

    /// True when the caption holds anything besides whitespace
    pub fn is_captioned(&self) -> bool {
        !self.caption.trim().is_empty()
    }
}

/// Captioning progress over a collection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub captioned: usize,
    /// Percentage of captioned items, 0.0 for an empty collection
    pub percent: f32,
}

impl Progress {
    pub fn from_items(items: &[Item]) -> Self {
        let total = items.len();
        let captioned = items.iter().filter(|item| item.is_captioned()).count();
        let percent = if total > 0 {
            captioned as f32 / total as f32 * 100.0
        } else {
            0.0
        };
        Self {
            total,
            captioned,
            percent,
        }
    }
}

/// Human-readable file size ("0 Bytes", "1.5 KB", "2 MB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts_non_blank_captions() {
        let items = vec![
            Item::new("a", "a.png", "cat, dog"),
            Item::new("b", "b.png", "   "),
            Item::new("c", "c.png", ""),
            Item::new("d", "d.png", "bird"),
        ];
        let progress = Progress::from_items(&items);
        assert_eq!(progress.total, 4);
        assert_eq!(progress.captioned, 2);
        assert!((progress.percent - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_progress_empty_collection() {
        let progress = Progress::from_items(&[]);
        assert_eq!(progress.total, 0);
        assert_eq!(progress.percent, 0.0);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn test_item_serde_defaults() {
        let item: Item = serde_json::from_str(r#"{"id":"x1","name":"x.png"}"#).unwrap();
        assert_eq!(item.id, ItemId::new("x1"));
        assert_eq!(item.caption, "");
        assert_eq!(item.media, MediaInfo::default());
    }
}
