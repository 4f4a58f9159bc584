//! # Caption Dataset
//!
//! Moves image/caption datasets in and out of a collection.
//!
//! The pairing rule is the same both ways: an image `name.ext` goes with the
//! caption file `name.txt` in the same directory.
//!
//! ```text
//! directory ──scan──> UploadFile[] ──pair_uploads──> ImportBatch { items, orphan_captions, skipped }
//! Item[] ──plan_export──> ExportPlan ──write_plan──> directory (+ ExportSummary)
//! ```

mod error;
mod export;
mod pairing;
mod scan;

pub use error::{DatasetError, Result};
pub use export::{
    export_to_dir, plan_export, write_export_file, write_plan, ExportContent, ExportEntry,
    ExportPlan, ExportSummary,
};
pub use pairing::{
    base_name, caption_file_name, content_type_for, is_caption_file, is_image, item_id,
    pair_uploads, ImportBatch, UploadFile, IMAGE_EXTENSIONS,
};
pub use scan::{import_directory, scan_directory, ScanOptions};
