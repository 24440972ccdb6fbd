use super::{Processor, remove_by_id, upsert_by_id};
use crate::event::GameEvent;
use crate::state::{Notification, Snapshot};

pub struct NotificationProcessor;

impl Processor for NotificationProcessor {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(
            event,
            GameEvent::NotificationAdd(_) | GameEvent::NotificationDelete { .. }
        )
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        match event {
            GameEvent::NotificationAdd(notification) => {
                upsert_by_id(
                    &mut next.notifications,
                    notification.clone(),
                    |n: &Notification| n.id.as_str(),
                );
            }
            GameEvent::NotificationDelete { id } => {
                remove_by_id(&mut next.notifications, id, |n: &Notification| n.id.as_str());
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
    fn add_then_delete() {
        let add = GameEvent::from_raw(RawEvent::new(
            "notification",
            "add",
            json!({"id": "n1", "message": "site is down", "priority": 2}),
        ));
        let added = NotificationProcessor.apply(&Snapshot::default(), &add);
        assert_eq!(added.notifications[0].message, "site is down");
        let twice = NotificationProcessor.apply(&added, &add);
        assert_eq!(twice.notifications.len(), 1);

        let delete = GameEvent::from_raw(RawEvent::new(
            "notification",
            "delete",
            json!({"id": "n1"}),
        ));
        assert!(NotificationProcessor.apply(&added, &delete).notifications.is_empty());
    }
}
