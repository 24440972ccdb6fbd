use std::sync::Arc;

use serde_json::Value;

use super::{Processor, patched, remove_by_id, upsert_by_id};
use crate::constants::AD_STATUS_ENABLED;
use crate::event::GameEvent;
use crate::state::{Ad, Snapshot};

/// Merges ad updates into the ads of owned sites.
pub struct AdProcessor;

impl Processor for AdProcessor {
    fn name(&self) -> &'static str {
        "ad"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(event, GameEvent::AdUpdate { .. })
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let GameEvent::AdUpdate { id, patch } = event else {
            return snapshot.clone();
        };
        let mut merged_ads = Vec::new();
        for (site_index, site) in snapshot.sites.iter().enumerate() {
            for (ad_index, ad) in site.ad.iter().enumerate() {
                if ad.id != *id {
                    continue;
                }
                if let Some(merged) = patched(ad, patch, "ad", id)
                    && merged != *ad
                {
                    merged_ads.push((site_index, ad_index, merged));
                }
            }
        }
        if merged_ads.is_empty() {
            return snapshot.clone();
        }
        let mut next = snapshot.clone();
        let sites = Arc::make_mut(&mut next.sites);
        for (site_index, ad_index, merged) in merged_ads {
            sites[site_index].ad[ad_index] = merged;
        }
        next
    }
}

/// Journals ads of sites this account does not own in `extra_ads`.
pub struct ExtraAdProcessor;

impl ExtraAdProcessor {
    fn enables(patch: &Value) -> bool {
        patch.get("status").and_then(Value::as_i64) == Some(AD_STATUS_ENABLED)
    }
}

impl Processor for ExtraAdProcessor {
    fn name(&self) -> &'static str {
        "extra-ad"
    }

    fn matches(&self, event: &GameEvent) -> bool {
        matches!(
            event,
            GameEvent::AdAdd(_) | GameEvent::AdUpdate { .. } | GameEvent::AdDelete { .. }
        )
    }

    fn apply(&self, snapshot: &Snapshot, event: &GameEvent) -> Snapshot {
        let mut next = snapshot.clone();
        match event {
            GameEvent::AdAdd(ad) if !snapshot.owns_site(&ad.site_id) => {
                log::info!("found new ad {} on site {}", ad.id, ad.site_id);
                upsert_by_id(&mut next.extra_ads, ad.clone(), |a: &Ad| a.id.as_str());
            }
            GameEvent::AdUpdate { id, patch } if Self::enables(patch) => {
                if remove_by_id(&mut next.extra_ads, id, |a: &Ad| a.id.as_str()) {
                    log::info!("ad {id} was placed, dropping it from the journal");
                }
            }
            GameEvent::AdDelete { id, site_id } => {
                let foreign = site_id
                    .as_deref()
                    .is_none_or(|site| !snapshot.owns_site(site));
                if foreign && remove_by_id(&mut next.extra_ads, id, |a: &Ad| a.id.as_str()) {
                    log::info!("deleted ad {id}");
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
    use crate::state::Site;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            sites: Arc::new(vec![Site {
                id: "s1".into(),
                ad: vec![Ad {
                    id: "X".into(),
                    site_id: "s1".into(),
                    cpc: 400.0,
                    ctr_base: 1.2,
                    ..Ad::default()
                }],
                ..Site::default()
            }]),
            ..Snapshot::default()
        }
    }

    fn event(action: &str, value: serde_json::Value) -> GameEvent {
        GameEvent::from_raw(RawEvent::new("ad", action, value))
    }

    #[test]
    fn update_merges_into_owned_ad() {
        let update = GameEvent::from_raw(RawEvent::new("ad", "update", json!({"cpc": 500})).with_id("X"));
        let next = AdProcessor.apply(&snapshot(), &update);
        let ad = &next.sites[0].ad[0];
        assert_eq!(ad.cpc, 500.0);
        assert_eq!(ad.ctr_base, 1.2);

        let missing = GameEvent::from_raw(RawEvent::new("ad", "update", json!({"cpc": 500})).with_id("Y"));
        let before = snapshot();
        let unchanged = AdProcessor.apply(&before, &missing);
        assert_eq!(unchanged, before);
        assert!(Arc::ptr_eq(&unchanged.sites, &before.sites));
    }

    #[test]
    fn foreign_ads_are_journaled_and_dropped() {
        let base = snapshot();
        let added = ExtraAdProcessor.apply(
            &base,
            &event("add", json!({"id": "F1", "siteId": "other", "cpc": 10})),
        );
        assert_eq!(added.extra_ads.len(), 1);
        let again = ExtraAdProcessor.apply(
            &added,
            &event("add", json!({"id": "F1", "siteId": "other", "cpc": 10})),
        );
        assert_eq!(again.extra_ads.len(), 1);

        let own = ExtraAdProcessor.apply(
            &base,
            &event("add", json!({"id": "O1", "siteId": "s1"})),
        );
        assert!(own.extra_ads.is_empty());

        let placed = GameEvent::from_raw(RawEvent::new("ad", "update", json!({"status": 1})).with_id("F1"));
        assert!(ExtraAdProcessor.apply(&added, &placed).extra_ads.is_empty());

        let deleted = ExtraAdProcessor.apply(&added, &event("delete", json!({"id": "F1"})));
        assert!(deleted.extra_ads.is_empty());
    }
}
