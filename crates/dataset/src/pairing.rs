use crate::error::{DatasetError, Result};
use caption_engine::{Item, ItemId, MediaInfo};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Extensions recognised as images (lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

const CAPTION_EXTENSION: &str = "txt";
const ID_HEX_CHARS: usize = 16;

/// One file offered for import
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name, or `/`-separated path relative to the import root
    pub name: String,
    pub bytes: Vec<u8>,
    /// Where the file was read from, if it came from disk
    pub source: Option<PathBuf>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Result of pairing a set of uploaded files
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportBatch {
    /// New items in upload order
    pub items: Vec<Item>,

    /// Items that received a caption from a sibling `.txt` file
    pub captioned: usize,

    /// Caption files with no image of the same base name
    pub orphan_captions: Vec<String>,

    /// Files that are neither images nor captions, or repeat an earlier image
    pub skipped: Vec<String>,
}

/// File name without its last extension: `"cat.png"` -> `"cat"`.
///
/// Names without an extension are returned unchanged. Directory parts of a
/// relative path are kept (`"a.b/cat"` stays `"a.b/cat"`).
pub fn base_name(file_name: &str) -> &str {
    let file_start = file_name.rfind('/').map_or(0, |idx| idx + 1);
    match file_name[file_start..].rfind('.') {
        Some(dot) if file_start + dot + 1 < file_name.len() => &file_name[..file_start + dot],
        _ => file_name,
    }
}

fn extension(file_name: &str) -> Option<String> {
    let base = base_name(file_name);
    if base.len() == file_name.len() {
        return None;
    }
    Some(file_name[base.len() + 1..].to_ascii_lowercase())
}

/// Name of the caption file that pairs with `image_name`
pub fn caption_file_name(image_name: &str) -> String {
    format!("{}.{CAPTION_EXTENSION}", base_name(image_name))
}

pub fn is_image(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_caption_file(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| ext == CAPTION_EXTENSION)
}

/// MIME type guessed from the extension
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let content_type = match extension(file_name)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(content_type)
}

/// Content-derived item id: the same file imported twice gets the same id
pub fn item_id(name: &str, bytes: &[u8]) -> ItemId {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    let digest = hasher.finalize();
    ItemId::new(to_lower_hex(&digest[..ID_HEX_CHARS / 2]))
}

fn to_lower_hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(LUT[(byte >> 4) as usize] as char);
        out.push(LUT[(byte & 0x0f) as usize] as char);
    }
    out
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Pair images with their `.txt` captions by base name.
///
/// Caption text is trimmed. An image without a caption file gets an empty
/// caption. When two caption files share a base name the later one wins.
pub fn pair_uploads(files: Vec<UploadFile>) -> Result<ImportBatch> {
    let mut captions: BTreeMap<String, (String, String)> = BTreeMap::new();
    let mut images = Vec::new();
    let mut batch = ImportBatch::default();

    for file in files {
        if is_caption_file(&file.name) {
            let text = String::from_utf8_lossy(&file.bytes).trim().to_string();
            captions.insert(base_name(&file.name).to_string(), (file.name, text));
        } else if is_image(&file.name) {
            images.push(file);
        } else {
            log::debug!("Skipping {} (not an image or caption)", file.name);
            batch.skipped.push(file.name);
        }
    }

    if images.is_empty() {
        return Err(DatasetError::NoImages);
    }

    let added_at_unix_ms = unix_now_ms();
    let mut used_captions = HashSet::new();
    let mut seen_ids = HashSet::new();

    for image in images {
        let id = item_id(&image.name, &image.bytes);
        if !seen_ids.insert(id.clone()) {
            log::debug!("Skipping repeated image {}", image.name);
            batch.skipped.push(image.name);
            continue;
        }

        let base = base_name(&image.name);
        let caption = match captions.get(base) {
            Some((_, text)) => {
                used_captions.insert(base.to_string());
                batch.captioned += 1;
                text.clone()
            }
            None => String::new(),
        };

        let media = MediaInfo {
            size_bytes: image.bytes.len() as u64,
            content_type: content_type_for(&image.name).map(str::to_string),
            source: image.source,
            added_at_unix_ms,
        };
        batch
            .items
            .push(Item::new(id, image.name, caption).with_media(media));
    }

    batch.orphan_captions = captions
        .into_iter()
        .filter(|(base, _)| !used_captions.contains(base))
        .map(|(_, (name, _))| name)
        .collect();

    log::info!(
        "Paired {} images ({} with captions, {} orphan captions)",
        batch.items.len(),
        batch.captioned,
        batch.orphan_captions.len()
    );
    Ok(batch)
}
