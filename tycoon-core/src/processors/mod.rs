//! Event processors: one per slice of the state tree.
//!
//! A processor declares which events it owns through [`Processor::matches`]
//! and turns a snapshot into the next one. Processors only replace the
//! collection they touch; every other `Arc` is shared with the input.

mod ad;
mod content;
mod notification;
mod passthrough;
mod person;
mod site;
mod task;
mod worker;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::GameEvent;
use crate::state::{Snapshot, merge_patch};

pub use ad::{AdProcessor, ExtraAdProcessor};
pub use content::ContentProcessor;
pub use notification::NotificationProcessor;
pub use passthrough::{ChatProcessor, SessionProcessor};
pub use person::PersonProcessor;
pub use site::SiteProcessor;
pub use task::TaskProcessor;
pub use worker::WorkerProcessor;

/// Reducer for the events of one entity type.
pub trait Processor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn matches(&self, event: &GameEvent) -> bool;

    /// Next snapshot after `event`. An event naming a missing entity
    /// returns the input unchanged.
    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot;
}

/// Processors in dispatch order.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn Processor>>,
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.processors.iter().map(|processor| processor.name()))
            .finish()
    }
}

impl ProcessorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every processor the game server's events need, ad journal included.
    #[must_use]
    pub fn default_registry() -> Self {
        Self::new()
            .with(AdProcessor)
            .with(ExtraAdProcessor)
            .with(ChatProcessor)
            .with(SessionProcessor)
            .with(ContentProcessor)
            .with(NotificationProcessor)
            .with(PersonProcessor)
            .with(SiteProcessor)
            .with(TaskProcessor)
            .with(WorkerProcessor)
    }

    #[must_use]
    pub fn with<P: Processor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|processor| processor.name()).collect()
    }

    /// Run every matching processor in registration order.
    ///
    /// Returns the final snapshot and how many processors matched.
    #[must_use]
    pub fn dispatch(&self, snapshot: &Snapshot, event: &GameEvent) -> (Snapshot, usize) {
        let mut current = snapshot.clone();
        let mut matched = 0;
        for processor in self.processors.iter().filter(|p| p.matches(event)) {
            current = processor.apply(&current, event);
            matched += 1;
        }
        (current, matched)
    }
}

/// Merge `patch` onto `entity`, logging patches that do not fit the type.
pub(crate) fn patched<T>(entity: &T, patch: &Value, what: &str, id: &str) -> Option<T>
where
    T: Serialize + DeserializeOwned,
{
    let merged = merge_patch(entity, patch);
    if merged.is_none() {
        log::warn!("ignoring {what} {id} patch that does not fit: {patch}");
    }
    merged
}

/// Merge a patch into the entity with `id`, cloning the list only on change.
pub(crate) fn update_by_id<T, F>(
    items: &mut Arc<Vec<T>>,
    id: &str,
    key: F,
    patch: &Value,
    what: &str,
) -> bool
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
    F: Fn(&T) -> &str,
{
    let Some(index) = items.iter().position(|item| key(item) == id) else {
        return false;
    };
    let Some(merged) = patched(&items[index], patch, what, id) else {
        return false;
    };
    if merged == items[index] {
        return false;
    }
    Arc::make_mut(items)[index] = merged;
    true
}

/// Insert `item`, replacing any existing entry with the same id.
pub(crate) fn upsert_by_id<T, F>(items: &mut Arc<Vec<T>>, item: T, key: F)
where
    T: Clone + PartialEq,
    F: Fn(&T) -> &str,
{
    match items.iter().position(|existing| key(existing) == key(&item)) {
        Some(index) if items[index] == item => {}
        Some(index) => Arc::make_mut(items)[index] = item,
        None => Arc::make_mut(items).push(item),
    }
}

/// Drop every entry with `id`, cloning the list only on change.
pub(crate) fn remove_by_id<T, F>(items: &mut Arc<Vec<T>>, id: &str, key: F) -> bool
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    if !items.iter().any(|item| key(item) == id) {
        return false;
    }
    Arc::make_mut(items).retain(|item| key(item) != id);
    true
}
