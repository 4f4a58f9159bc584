use crate::error::{Result, StoreError};
use async_trait::async_trait;
use caption_engine::{check_unique_ids, CollectionStore, EngineError, Item, ItemId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at_unix_ms: u64,
    items: Vec<Item>,
}

/// Collection persisted as one JSON snapshot file.
///
/// Every mutation rewrites the snapshot through a temporary file and a rename,
/// so a crash leaves either the old or the new collection on disk. The
/// in-memory copy only changes after the write succeeded. A batch of caption
/// edits is persisted with a single rewrite.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<Vec<Item>>,
    snapshot_writes: AtomicU64,
}

impl JsonFileStore {
    /// Load the snapshot at `path`; a missing file opens an empty collection
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = read_snapshot(&path).await?;
        log::debug!("Opened {} with {} items", path.display(), items.len());
        Ok(Self {
            path,
            items: Mutex::new(items),
            snapshot_writes: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot rewrites performed since the store was opened
    pub fn snapshot_writes(&self) -> u64 {
        self.snapshot_writes.load(Ordering::Relaxed)
    }

    async fn persist(&self, items: &[Item]) -> Result<()> {
        write_snapshot(&self.path, items).await?;
        self.snapshot_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

async fn read_snapshot(path: &Path) -> Result<Vec<Item>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = tokio::fs::read(path).await?;
    let snapshot: Snapshot =
        serde_json::from_slice(&bytes).map_err(|err| StoreError::corrupted(path, err))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    check_unique_ids(&[], &snapshot.items).map_err(|err| StoreError::corrupted(path, err))?;
    Ok(snapshot.items)
}

async fn write_snapshot(path: &Path, items: &[Item]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at_unix_ms: unix_now_ms(),
        items: items.to_vec(),
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl CollectionStore for JsonFileStore {
    async fn get_all(&self) -> caption_engine::Result<Vec<Item>> {
        Ok(self.items.lock().await.clone())
    }

    async fn set_caption(&self, id: &ItemId, caption: &str) -> caption_engine::Result<()> {
        let mut items = self.items.lock().await;
        let pos = items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;

        let mut next = items.clone();
        next[pos].caption = caption.to_string();
        self.persist(&next).await?;
        *items = next;
        Ok(())
    }

    async fn set_captions(
        &self,
        edits: &[(ItemId, String)],
    ) -> Vec<caption_engine::Result<()>> {
        let mut items = self.items.lock().await;
        let mut next = items.clone();
        let mut results: Vec<caption_engine::Result<()>> = edits
            .iter()
            .map(|(id, caption)| {
                let item = next
                    .iter_mut()
                    .find(|item| &item.id == id)
                    .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
                item.caption = caption.clone();
                Ok(())
            })
            .collect();

        if !results.iter().any(|result| result.is_ok()) {
            return results;
        }
        match self.persist(&next).await {
            Ok(()) => *items = next,
            Err(err) => {
                log::warn!("Failed to persist caption batch to {}: {err}", self.path.display());
                let message = err.to_string();
                for result in results.iter_mut().filter(|result| result.is_ok()) {
                    *result = Err(EngineError::store(message.clone()));
                }
            }
        }
        results
    }

    fn write_lanes(&self) -> usize {
        1
    }

    async fn insert(&self, new_items: Vec<Item>) -> caption_engine::Result<usize> {
        let mut items = self.items.lock().await;
        check_unique_ids(&items, &new_items)?;
        let count = new_items.len();
        if count == 0 {
            return Ok(0);
        }

        let mut next = items.clone();
        next.extend(new_items);
        self.persist(&next).await?;
        *items = next;
        Ok(count)
    }

    async fn remove(&self, id: &ItemId) -> caption_engine::Result<bool> {
        let mut items = self.items.lock().await;
        if !items.iter().any(|item| &item.id == id) {
            return Ok(false);
        }

        let next: Vec<Item> = items.iter().filter(|item| &item.id != id).cloned().collect();
        self.persist(&next).await?;
        *items = next;
        Ok(true)
    }

    async fn clear(&self) -> caption_engine::Result<usize> {
        let mut items = self.items.lock().await;
        let count = items.len();
        self.persist(&[]).await?;
        items.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("captions.json"))
            .await
            .unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupted_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptedSnapshot { .. }));
    }

    #[tokio::test]
    async fn newer_snapshot_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions.json");
        std::fs::write(&path, br#"{"version": 7, "saved_at_unix_ms": 0, "items": []}"#).unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedVersion {
                found: 7,
                expected: 1
            }
        ));
    }

    #[tokio::test]
    async fn writes_leave_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("captions.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .insert(vec![Item::new("a", "a.png", "cat")])
            .await
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_item_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let err = store
            .set_caption(&ItemId::new("ghost"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ItemNotFound(_)));
        assert!(!store.remove(&ItemId::new("ghost")).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn caption_batch_is_persisted_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .insert(vec![
                Item::new("a", "a.png", "cat"),
                Item::new("b", "b.png", "dog"),
            ])
            .await
            .unwrap();
        assert_eq!(store.snapshot_writes(), 1);

        let results = store
            .set_captions(&[
                (ItemId::new("a"), "kitten".into()),
                (ItemId::new("ghost"), "x".into()),
                (ItemId::new("b"), "puppy".into()),
            ])
            .await;
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(EngineError::ItemNotFound(_))));
        assert!(results[2].is_ok());
        assert_eq!(store.snapshot_writes(), 2);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let captions: Vec<String> = reopened
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.caption)
            .collect();
        assert_eq!(captions, vec!["kitten", "puppy"]);
    }

    #[tokio::test]
    async fn batch_of_unknown_items_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let results = store.set_captions(&[(ItemId::new("ghost"), "x".into())]).await;
        assert!(results[0].is_err());
        assert_eq!(store.snapshot_writes(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .insert(vec![Item::new("a", "a.png", "cat")])
            .await
            .unwrap();

        let err = store
            .insert(vec![Item::new("a", "again.png", "")])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateItem(_)));

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_all().await.unwrap().len(), 1);
    }
}
