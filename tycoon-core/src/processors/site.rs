use std::sync::Arc;

use super::{Processor, update_by_id};
use crate::event::GameEvent;
use crate::state::{Site, Snapshot};

/// Site attribute updates and speed record pushes.
pub struct SiteProcessor;

impl Processor for SiteProcessor {
    fn name(&self) -> &'static str {
        "site"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(
            event,
            GameEvent::SiteUpdate { .. } | GameEvent::SitePush { .. }
        )
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        match event {
            GameEvent::SiteUpdate { id, patch } => {
                update_by_id(&mut next.sites, id, |site: &Site| site.id.as_str(), patch, "site");
            }
            GameEvent::SitePush { id, speed } => {
                let Some(index) = snapshot.sites.iter().position(|site| site.id == *id) else {
                    return next;
                };
                let site = &mut Arc::make_mut(&mut next.sites)[index];
                // Fixed window: oldest out, newest in.
                if !site.sitespeed.is_empty() {
                    site.sitespeed.remove(0);
                }
                site.sitespeed.push(speed.as_ref().clone());
            }
            _ => {}
        }
        next
    }
}
