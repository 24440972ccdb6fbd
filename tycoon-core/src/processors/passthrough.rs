use super::Processor;
use crate::event::{EntityKind, GameEvent};
use crate::state::Snapshot;

fn acknowledge(kind: EntityKind, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
    if let GameEvent::Passthrough { target, action, .. } = event {
        log::debug!("{kind:?} event {target}:{action} acknowledged");
    }
    snapshot.clone()
}

/// Login, connection id and ping frames carry no state.
pub struct SessionProcessor;

impl Processor for SessionProcessor {
    fn name(&self) -> &'static str {
        "session"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        event.kind() == Some(EntityKind::Session)
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        acknowledge(EntityKind::Session, snapshot, event)
    }
}

/// Chat channels are not mirrored.
pub struct ChatProcessor;

impl Processor for ChatProcessor {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        event.kind() == Some(EntityKind::Chat)
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        acknowledge(EntityKind::Chat, snapshot, event)
    }
}
