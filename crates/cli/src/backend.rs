use anyhow::{Context as AnyhowContext, Result};
use caption_engine::CollectionStore;
use caption_store::{HttpStore, JsonFileStore};
use std::path::Path;
use std::sync::Arc;

/// The collection a command works on
pub(crate) enum Backend {
    Local(Arc<JsonFileStore>),
    Remote(Arc<HttpStore>),
}

impl Backend {
    pub(crate) async fn open(store_path: &Path, remote: Option<&str>) -> Result<Self> {
        if let Some(url) = remote {
            let store = HttpStore::new(url).with_context(|| format!("Invalid remote '{url}'"))?;
            log::debug!("Using remote collection at {}", store.base_url());
            return Ok(Self::Remote(Arc::new(store)));
        }

        let store = JsonFileStore::open(store_path)
            .await
            .with_context(|| format!("Failed to open collection {}", store_path.display()))?;
        log::debug!("Using local collection {}", store_path.display());
        Ok(Self::Local(Arc::new(store)))
    }

    pub(crate) fn store(&self) -> Arc<dyn CollectionStore> {
        match self {
            Self::Local(store) => Arc::clone(store) as Arc<dyn CollectionStore>,
            Self::Remote(store) => Arc::clone(store) as Arc<dyn CollectionStore>,
        }
    }

    pub(crate) fn remote(&self) -> Option<&HttpStore> {
        match self {
            Self::Local(_) => None,
            Self::Remote(store) => Some(store),
        }
    }
}
