use std::sync::Arc;

use super::{Processor, patched};
use crate::event::GameEvent;
use crate::state::Snapshot;

/// Content items live under their site; ids are unique across sites.
pub struct ContentProcessor;

impl Processor for ContentProcessor {
    fn name(&self) -> &'static str {
        "content"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(
            event,
            GameEvent::ContentUpdate { .. } | GameEvent::ContentDelete { .. }
        )
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        match event {
            GameEvent::ContentUpdate { id, patch } => {
                let mut changes = Vec::new();
                for (site_index, site) in snapshot.sites.iter().enumerate() {
                    for (item_index, item) in site.content.iter().enumerate() {
                        if item.id == *id
                            && let Some(merged) = patched(item, patch, "content", id)
                            && merged != *item
                        {
                            changes.push((site_index, item_index, merged));
                        }
                    }
                }
                if !changes.is_empty() {
                    let sites = Arc::make_mut(&mut next.sites);
                    for (site_index, item_index, merged) in changes {
                        sites[site_index].content[item_index] = merged;
                    }
                }
            }
            GameEvent::ContentDelete { id } => {
                let present = snapshot
                    .sites
                    .iter()
                    .any(|site| site.content.iter().any(|item| item.id == *id));
                if present {
                    for site in Arc::make_mut(&mut next.sites) {
                        site.content.retain(|item| item.id != *id);
                    }
                }
            }
            _ => {}
        }
        next
    }
}
