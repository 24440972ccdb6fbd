use std::sync::Arc;

use super::{Processor, patched};
use crate::event::GameEvent;
use crate::state::Snapshot;

/// `self` events patch the account owner.
pub struct PersonProcessor;

impl Processor for PersonProcessor {
    fn name(&self) -> &'static str {
        "self"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(event, GameEvent::SelfUpdate { .. })
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        if let GameEvent::SelfUpdate { patch } = event
            && let Some(person) = patched(snapshot.person.as_ref(), patch, "person", "self")
            && person != *snapshot.person
        {
            next.person = Arc::new(person);
        }
        next
    }
}
