use serde_json::Value;

use super::{Processor, remove_by_id, update_by_id, upsert_by_id};
use crate::constants::TASK_STATUS_FINISHED;
use crate::event::GameEvent;
use crate::state::{Snapshot, Task};

/// Task lifecycle: added, updated, and removed once finished.
pub struct TaskProcessor;

impl Processor for TaskProcessor {
    fn name(&self) -> &'static str {
        "task"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(event, GameEvent::TaskAdd(_) | GameEvent::TaskUpdate { .. })
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        match event {
            GameEvent::TaskAdd(task) => {
                upsert_by_id(&mut next.tasks, task.clone(), |t: &Task| t.id.as_str());
            }
            GameEvent::TaskUpdate { id, patch } => {
                let finished =
                    patch.get("status").and_then(Value::as_i64) == Some(TASK_STATUS_FINISHED);
                if finished {
                    remove_by_id(&mut next.tasks, id, |t: &Task| t.id.as_str());
                } else {
                    update_by_id(&mut next.tasks, id, |t: &Task| t.id.as_str(), patch, "task");
                }
            }
            _ => {}
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;
    use serde_json::json;

    #[test]
    fn finished_tasks_leave_the_list() {
        let add = GameEvent::from_raw(RawEvent::new(
            "task",
            "add",
            json!({"id": "t1", "status": 0, "zone": "design"}),
        ));
        let added = TaskProcessor.apply(&Snapshot::default(), &add);
        assert_eq!(added.tasks.len(), 1);
        assert_eq!(added.tasks[0].extra["zone"], json!("design"));

        let progress = GameEvent::from_raw(
            RawEvent::new("task", "update", json!({"status": 1})).with_id("t1"),
        );
        let running = TaskProcessor.apply(&added, &progress);
        assert_eq!(running.tasks[0].status, 1);

        let done = GameEvent::from_raw(
            RawEvent::new("task", "update", json!({"status": 3})).with_id("t1"),
        );
        assert!(TaskProcessor.apply(&running, &done).tasks.is_empty());
    }
}
