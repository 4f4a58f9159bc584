use crate::error::{EngineError, Result};
use crate::types::{Item, ItemId};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Owner of the item collection.
///
/// Implementations keep exactly one item per id and preserve collection order.
/// The engine only reaches storage through this trait.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Snapshot of every item in collection order
    async fn get_all(&self) -> Result<Vec<Item>>;

    /// Current caption of one item
    async fn get_caption(&self, id: &ItemId) -> Result<String> {
        self.get_all()
            .await?
            .into_iter()
            .find(|item| &item.id == id)
            .map(|item| item.caption)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))
    }

    /// Replace the caption of one item
    async fn set_caption(&self, id: &ItemId, caption: &str) -> Result<()>;

    /// Replace several captions, returning one result per entry in order.
    ///
    /// The default writes entries one by one. Stores that persist the whole
    /// collection override this to write once per batch.
    async fn set_captions(&self, edits: &[(ItemId, String)]) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(edits.len());
        for (id, caption) in edits {
            results.push(self.set_caption(id, caption).await);
        }
        results
    }

    /// How many `set_captions` batches are worth running at once.
    ///
    /// Stores that serialize every write behind one lock return 1 so a bulk
    /// edit reaches them as a single batch.
    fn write_lanes(&self) -> usize {
        usize::MAX
    }

    /// Append new items; fails without inserting anything if any id is already taken
    async fn insert(&self, items: Vec<Item>) -> Result<usize>;

    /// Remove one item, returning whether it existed
    async fn remove(&self, id: &ItemId) -> Result<bool>;

    /// Remove every item, returning how many were removed
    async fn clear(&self) -> Result<usize>;
}

/// Reject a batch whose ids collide with each other or with `existing`
pub fn check_unique_ids(existing: &[Item], incoming: &[Item]) -> Result<()> {
    let mut seen: HashSet<&ItemId> = existing.iter().map(|item| &item.id).collect();
    for item in incoming {
        if !seen.insert(&item.id) {
            return Err(EngineError::DuplicateItem(item.id.to_string()));
        }
    }
    Ok(())
}

/// Session-only store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `items`
    pub fn with_items(items: Vec<Item>) -> Result<Self> {
        check_unique_ids(&[], &items)?;
        Ok(Self {
            items: RwLock::new(items),
        })
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<Item>> {
        Ok(self.items.read().await.clone())
    }

    async fn get_caption(&self, id: &ItemId) -> Result<String> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.caption.clone())
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))
    }

    async fn set_caption(&self, id: &ItemId, caption: &str) -> Result<()> {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
        item.caption = caption.to_string();
        Ok(())
    }

    async fn set_captions(&self, edits: &[(ItemId, String)]) -> Vec<Result<()>> {
        let mut items = self.items.write().await;
        edits
            .iter()
            .map(|(id, caption)| {
                let item = items
                    .iter_mut()
                    .find(|item| &item.id == id)
                    .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
                item.caption = caption.clone();
                Ok(())
            })
            .collect()
    }

    fn write_lanes(&self) -> usize {
        1
    }

    async fn insert(&self, new_items: Vec<Item>) -> Result<usize> {
        let mut items = self.items.write().await;
        check_unique_ids(&items, &new_items)?;
        let count = new_items.len();
        items.extend(new_items);
        Ok(count)
    }

    async fn remove(&self, id: &ItemId) -> Result<bool> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|item| &item.id != id);
        Ok(items.len() != before)
    }

    async fn clear(&self) -> Result<usize> {
        let mut items = self.items.write().await;
        let count = items.len();
        items.clear();
        Ok(count)
    }
}
