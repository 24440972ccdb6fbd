//! Event-sourced state synchronizer.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::event::{GameEvent, RawEvent, parse_message};
use crate::processors::ProcessorRegistry;
use crate::state::Snapshot;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closed,
    Cancelled,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

/// Applies events in arrival order, publishing a fresh snapshot per event.
#[derive(Debug)]
pub struct Synchronizer {
    registry: ProcessorRegistry,
    snapshot: Arc<Snapshot>,
    applied: u64,
}

impl Synchronizer {
    #[must_use]
    pub fn new(initial: Snapshot) -> Self {
        Self::with_registry(initial, ProcessorRegistry::default_registry())
    }

    #[must_use]
    pub fn with_registry(initial: Snapshot, registry: ProcessorRegistry) -> Self {
        Self {
            registry,
            snapshot: Arc::new(initial),
            applied: 0,
        }
    }

    /// Frozen view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Leaf events applied so far.
    #[must_use]
    pub const fn applied(&self) -> u64 {
        self.applied
    }

    /// Flatten `event` and apply each leaf in order.
    ///
    /// Returns the number of leaf events applied.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed batch; nothing is applied then.
    pub fn apply_event(&mut self, event: RawEvent) -> Result<usize, SyncError> {
        let leaves = event.flatten()?;
        let count = leaves.len();
        for leaf in leaves {
            self.dispatch(GameEvent::from_raw(leaf));
        }
        Ok(count)
    }

    /// Parse a text frame and apply it.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid envelope; nothing is
    /// applied then.
    pub fn apply_message(&mut self, text: &str) -> Result<usize, SyncError> {
        let leaves = parse_message(text)?;
        let count = leaves.len();
        for leaf in leaves {
            self.dispatch(GameEvent::from_raw(leaf));
        }
        log::trace!(
            "applied {count} events, snapshot {:016x}",
            self.snapshot.fingerprint()
        );
        Ok(count)
    }

    fn dispatch(&mut self, event: GameEvent) {
        let (next, matched) = self.registry.dispatch(&self.snapshot, &event);
        if matched == 0 {
            let label = match &event {
                GameEvent::Unknown(raw) => raw.label(),
                other => format!("{:?}", other.kind()),
            };
            log::warn!("no processor for event {label}");
            return;
        }
        if next != *self.snapshot {
            self.snapshot = Arc::new(next);
        }
        self.applied += 1;
    }
}

fn default_registry() -> &'static ProcessorRegistry {
    static REGISTRY: OnceLock<ProcessorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ProcessorRegistry::default_registry)
}

/// Apply one (possibly batched) event to a snapshot with the default processors.
///
/// # Errors
///
/// Returns an error for a malformed batch.
pub fn apply(snapshot: &Snapshot, event: RawEvent) -> Result<Snapshot, SyncError> {
    let registry = default_registry();
    let mut current = snapshot.clone();
    for leaf in event.flatten()? {
        let event = GameEvent::from_raw(leaf);
        let (next, matched) = registry.dispatch(&current, &event);
        if matched == 0 {
            log::warn!("no processor for event {event:?}");
        }
        current = next;
    }
    Ok(current)
}
