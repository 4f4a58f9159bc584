//! # Caption Engine
//!
//! Tag-caption consistency engine for image captioning datasets.
//!
//! ## Model
//!
//! Every item carries a free-text caption whose comma-separated pieces are
//! its tags. The engine derives everything else from those captions:
//! - A tag index counting how many distinct items use each tag
//! - Bulk rewrites across the collection (delete/rename a tag, find and
//!   replace, insert next to a match, delete text, append a caption)
//! - Navigation through the items that contain a tag
//!
//! ## Architecture
//!
//! ```text
//! CollectionStore (memory / local file / remote)
//!     │
//!     ├──> get_all() snapshot
//!     │      ├─> Caption Parser → tokens
//!     │      └─> TagIndex::recompute → ranked tags
//!     │
//!     ├──> mutation::plan(Operation) → CaptionEdit[]
//!     │      └─> batched set_caption writes → BulkReport
//!     │
//!     └──> MatchNavigator (select / next / prev)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use caption_engine::{EngineConfig, EngineState, Item, MemoryStore, Operation};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> caption_engine::Result<()> {
//!     let store = MemoryStore::with_items(vec![
//!         Item::new("1", "cat.png", "cat, sitting, indoors"),
//!         Item::new("2", "dog.png", "dog, sitting"),
//!     ])?;
//!     let mut engine = EngineState::open(Arc::new(store), EngineConfig::default()).await?;
//!
//!     let report = engine
//!         .apply(Operation::RenameTag { old: "sitting".into(), new: "seated".into() })
//!         .await?;
//!     println!("{}", report.summary());
//!
//!     for tag in engine.ranked_tags() {
//!         println!("{} ({})", tag.tag, tag.count);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod mutation;
mod navigator;
pub mod parser;
mod pattern;
mod report;
mod state;
mod store;
mod tag_index;
mod types;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use mutation::{plan, CaptionEdit, InsertPosition, MutationPlan, Operation};
pub use navigator::{highlight_range, MatchNavigator, MatchPosition};
pub use pattern::PatternSpec;
pub use report::{BulkOutcome, BulkReport, DryRun, ItemFailure};
pub use state::{EngineEvent, EngineState};
pub use store::{check_unique_ids, CollectionStore, MemoryStore};
pub use tag_index::{TagCount, TagIndex};
pub use types::{format_file_size, Item, ItemId, MediaInfo, Progress};
