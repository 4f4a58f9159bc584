use crate::config::EngineConfig;
use crate::error::Result;
use crate::mutation::{self, CaptionEdit, Operation};
use crate::navigator::{MatchNavigator, MatchPosition};
use crate::report::{BulkReport, DryRun};
use crate::store::CollectionStore;
use crate::tag_index::{TagCount, TagIndex};
use crate::types::{Item, ItemId, Progress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

const EVENT_CAPACITY: usize = 256;

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    CaptionChanged { id: ItemId, caption: String },
    ItemsAdded { count: usize },
    ItemRemoved { id: ItemId },
    Cleared { count: usize },
    /// The tag index was rebuilt; consumers should re-read it
    IndexRecomputed { tags: usize },
}

/// One editing session over a collection store.
///
/// Holds the derived tag index and navigation state. Every mutation goes
/// through the store and is followed by exactly one index rebuild.
pub struct EngineState {
    store: Arc<dyn CollectionStore>,
    config: EngineConfig,
    index: TagIndex,
    navigator: MatchNavigator,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineState {
    /// Validate the config and build the initial tag index from the store
    pub async fn open(store: Arc<dyn CollectionStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut state = Self {
            store,
            config,
            index: TagIndex::default(),
            navigator: MatchNavigator::new(),
            events,
        };
        state.refresh().await?;
        Ok(state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Rebuild the tag index from the current captions
    pub async fn refresh(&mut self) -> Result<&TagIndex> {
        let items = self.store.get_all().await?;
        self.index = TagIndex::recompute_with(
            items.iter().map(|item| item.caption.as_str()),
            self.config.min_tag_chars,
        );
        log::debug!(
            "Tag index rebuilt: {} tags over {} items",
            self.index.len(),
            items.len()
        );
        self.emit(EngineEvent::IndexRecomputed {
            tags: self.index.len(),
        });
        Ok(&self.index)
    }

    pub async fn items(&self) -> Result<Vec<Item>> {
        self.store.get_all().await
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.index
    }

    pub fn ranked_tags(&self) -> Vec<TagCount> {
        self.index.ranked()
    }

    pub async fn progress(&self) -> Result<Progress> {
        Ok(Progress::from_items(&self.store.get_all().await?))
    }

    /// Manual caption edit of a single item
    pub async fn update_caption(&mut self, id: &ItemId, caption: &str) -> Result<()> {
        self.store.set_caption(id, caption).await?;
        self.emit(EngineEvent::CaptionChanged {
            id: id.clone(),
            caption: caption.to_string(),
        });
        self.refresh().await?;
        Ok(())
    }

    pub async fn add_items(&mut self, items: Vec<Item>) -> Result<usize> {
        let count = self.store.insert(items).await?;
        log::info!("Added {count} items");
        self.emit(EngineEvent::ItemsAdded { count });
        self.refresh().await?;
        Ok(count)
    }

    pub async fn remove_item(&mut self, id: &ItemId) -> Result<bool> {
        let removed = self.store.remove(id).await?;
        if removed {
            self.navigator.forget(id);
            self.emit(EngineEvent::ItemRemoved { id: id.clone() });
            self.refresh().await?;
        }
        Ok(removed)
    }

    pub async fn clear_all(&mut self) -> Result<usize> {
        let count = self.store.clear().await?;
        self.navigator.clear();
        log::info!("Cleared {count} items");
        self.emit(EngineEvent::Cleared { count });
        self.refresh().await?;
        Ok(count)
    }

    /// Count what an operation would touch without writing anything
    pub async fn dry_run(&self, operation: &Operation) -> Result<DryRun> {
        let items = self.store.get_all().await?;
        let plan = mutation::plan(operation, &items, &self.config)?;
        Ok(DryRun::from_plan(operation.name(), &plan))
    }

    /// Plan an operation, write every changed caption, then rebuild the index once.
    ///
    /// Edits are split into at most `write_concurrency` batches (fewer when the
    /// store asks for fewer lanes) that run concurrently. A failed write is
    /// recorded in the report and does not stop the others. The report is
    /// returned only after every write has settled, and is still returned when
    /// the final index rebuild fails.
    pub async fn apply(&mut self, operation: Operation) -> Result<BulkReport> {
        let items = self.store.get_all().await?;
        let plan = mutation::plan(&operation, &items, &self.config)?;
        let mut report = BulkReport::new(operation.name(), &plan);

        if plan.edits.is_empty() {
            log::info!("{}: {}", operation.name(), report.summary());
            return Ok(report);
        }

        let lanes = self
            .config
            .write_concurrency
            .min(self.store.write_lanes())
            .clamp(1, plan.edits.len());
        let batch_size = plan.edits.len().div_ceil(lanes);

        let mut batches: Vec<Vec<CaptionEdit>> = Vec::with_capacity(lanes);
        let mut edits = plan.edits.into_iter().peekable();
        while edits.peek().is_some() {
            batches.push(edits.by_ref().take(batch_size).collect());
        }
        log::debug!(
            "Writing {} captions in {} batch(es)",
            report.attempted,
            batches.len()
        );

        let mut writes = JoinSet::new();
        for (slot, batch) in batches.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let entries: Vec<(ItemId, String)> = batch
                .iter()
                .map(|edit| (edit.id.clone(), edit.after.clone()))
                .collect();
            writes.spawn(async move {
                let results = store.set_captions(&entries).await;
                (slot, results)
            });
        }

        let mut settled: HashMap<usize, Vec<Result<()>>> = HashMap::with_capacity(batches.len());
        while let Some(joined) = writes.join_next().await {
            match joined {
                Ok((slot, results)) => {
                    settled.insert(slot, results);
                }
                Err(err) => log::warn!("Caption write task did not complete: {err}"),
            }
        }

        for (slot, batch) in batches.into_iter().enumerate() {
            let mut results = settled.remove(&slot).map(Vec::into_iter);
            for edit in batch {
                match results.as_mut().and_then(Iterator::next) {
                    Some(Ok(())) => {
                        log::debug!("Updated caption of {}", edit.id);
                        self.emit(EngineEvent::CaptionChanged {
                            id: edit.id.clone(),
                            caption: edit.after.clone(),
                        });
                        report.record_success(edit);
                    }
                    Some(Err(err)) => {
                        log::warn!("Failed to update caption of {}: {err}", edit.id);
                        report.record_failure(edit.id, err.to_string());
                    }
                    // the batch task panicked or the store returned too few results
                    None => report.record_failure(edit.id, "write task did not complete"),
                }
            }
        }

        if let Err(err) = self.refresh().await {
            log::warn!(
                "{}: captions were written but the tag index could not be rebuilt: {err}",
                operation.name()
            );
        }
        log::info!("{}: {}", operation.name(), report.summary());
        Ok(report)
    }

    /// Select a tag for navigation; `None` when no item contains it
    pub async fn select_tag(&mut self, tag: &str) -> Result<Option<MatchPosition>> {
        let items = self.store.get_all().await?;
        Ok(self.navigator.select(tag, &items))
    }

    pub fn next_match(&mut self) -> Option<MatchPosition> {
        self.navigator.next()
    }

    pub fn prev_match(&mut self) -> Option<MatchPosition> {
        self.navigator.prev()
    }

    pub fn navigator(&self) -> &MatchNavigator {
        &self.navigator
    }
}
