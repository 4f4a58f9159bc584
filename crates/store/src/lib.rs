//! # Caption Store
//!
//! Persistent [`CollectionStore`](caption_engine::CollectionStore) backends.
//!
//! - [`JsonFileStore`]: the whole collection in one local JSON snapshot,
//!   rewritten atomically after every mutation
//! - [`HttpStore`]: a remote image API; captions are edited in place on the
//!   server and the collection is listed on every read
//!
//! ## Example
//!
//! ```no_run
//! use caption_engine::{EngineConfig, EngineState};
//! use caption_store::JsonFileStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileStore::open("captions.json").await?;
//! let engine = EngineState::open(Arc::new(store), EngineConfig::default()).await?;
//! println!("{} tags", engine.tag_index().len());
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod json_file;

pub use error::{Result, StoreError};
pub use http::{HttpStore, RemoteImage};
pub use json_file::JsonFileStore;
