use super::{Processor, update_by_id};
use crate::event::GameEvent;
use crate::state::{Snapshot, Worker};

pub struct WorkerProcessor;

impl Processor for WorkerProcessor {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(event, GameEvent::WorkerUpdate { .. })
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        if let GameEvent::WorkerUpdate { id, patch } = event {
            update_by_id(
                &mut next.workers,
                id,
                |worker: &Worker| worker.id.as_str(),
                patch,
                "worker",
            );
        }
        next
    }
}
