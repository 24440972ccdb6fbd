use std::sync::Arc;

use serde_json::json;
use tycoon_core::{
    Ad, JsonSnapshotLoader, RawEvent, Site, Snapshot, SnapshotLoader, SyncError, Synchronizer,
    apply, parse_message,
};

fn state() -> Snapshot {
    JsonSnapshotLoader::new(
        json!({
            "person": {"id": "p1", "username": "owner", "balanceUsd": 12.5},
            "workers": [{"id": "w1", "name": "Ann", "status": 0}],
            "sites": [{
                "id": "s1",
                "domain": "cats.example",
                "ad": [
                    {"id": "X", "siteId": "s1", "status": 1, "cpc": 400, "ctrBase": 1.2},
                    {"id": "Y", "siteId": "s1", "status": 1, "cpc": 250, "ctrBase": 0.8}
                ],
                "sitespeed": []
            }],
            "tasks": [],
            "notifications": [],
            "serverTime": 1_700_000_000_000_i64,
            "version": "2.4.0"
        })
        .to_string(),
    )
    .load_snapshot()
    .unwrap()
}

fn ad<'a>(snapshot: &'a Snapshot, id: &str) -> &'a Ad {
    snapshot
        .ads()
        .map(|(_, ad)| ad)
        .find(|ad| ad.id == id)
        .unwrap()
}

#[test]
fn ad_update_touches_only_its_ad() {
    let before = state();
    let after = apply(
        &before,
        RawEvent::new("ad", "update", json!({"cpc": 500})).with_id("X"),
    )
    .unwrap();
    assert_eq!(ad(&after, "X").cpc, 500.0);
    assert_eq!(ad(&after, "X").ctr_base, 1.2);
    assert_eq!(ad(&after, "Y"), ad(&before, "Y"));
    // The untouched collections are shared with the previous snapshot.
    assert!(Arc::ptr_eq(&before.workers, &after.workers));
    assert!(Arc::ptr_eq(&before.person, &after.person));
    assert_eq!(ad(&before, "X").cpc, 400.0);
}

#[test]
fn batch_flattens_in_document_order() {
    let inner = RawEvent::batch(&[
        RawEvent::new("notification", "add", json!({"id": "n2", "message": "b"})),
        RawEvent::new("notification", "add", json!({"id": "n3", "message": "c"})),
    ])
    .unwrap();
    let outer = RawEvent::batch(&[
        RawEvent::new("notification", "add", json!({"id": "n1", "message": "a"})),
        inner,
        RawEvent::new("notification", "add", json!({"id": "n4", "message": "d"})),
    ])
    .unwrap();

    let leaves = outer.clone().flatten().unwrap();
    let ids: Vec<_> = leaves.iter().map(|leaf| leaf.value["id"].clone()).collect();
    assert_eq!(ids, vec![json!("n1"), json!("n2"), json!("n3"), json!("n4")]);

    // Applying the batch equals applying its leaves one by one.
    let batched = apply(&state(), outer).unwrap();
    let mut sequential = state();
    for leaf in leaves {
        sequential = apply(&sequential, leaf).unwrap();
    }
    assert_eq!(batched, sequential);
    assert_eq!(batched.fingerprint(), sequential.fingerprint());
}

#[test]
fn task_added_then_finished_in_one_batch() {
    let frame = json!({
        "target": "batch",
        "action": "batch",
        "value": [
            {"target": "task", "action": "add", "value": {"id": "t1", "status": 0, "siteId": "s1"}},
            {"target": "task", "action": "update", "id": "t1", "value": {"status": 3}}
        ]
    })
    .to_string();
    let mut sync = Synchronizer::new(state());
    assert_eq!(sync.apply_message(&frame).unwrap(), 2);
    assert!(sync.snapshot().tasks.is_empty());
    assert_eq!(sync.applied(), 2);
}

#[test]
fn updates_are_idempotent() {
    let update = RawEvent::new("worker", "update", json!({"status": 2})).with_id("w1");
    let once = apply(&state(), update.clone()).unwrap();
    let twice = apply(&once, update).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.workers[0].status, 2);
    assert_eq!(once.workers[0].name, "Ann");
}

#[test]
fn unknown_events_leave_state_alone() {
    let before = state();
    let mut sync = Synchronizer::new(before.clone());
    let original = sync.snapshot();
    sync.apply_event(RawEvent::new("weather", "update", json!({"sunny": true})))
        .unwrap();
    assert!(Arc::ptr_eq(&original, &sync.snapshot()));
    assert_eq!(sync.applied(), 0);

    let after = apply(&before, RawEvent::new("quest", "add", json!({"id": 1}))).unwrap();
    assert_eq!(after, before);
}

#[test]
fn passthrough_events_are_acknowledged_without_change() {
    let mut sync = Synchronizer::new(state());
    let original = sync.snapshot();
    sync.apply_event(RawEvent::new("ping", "update", json!(null)))
        .unwrap();
    sync.apply_event(RawEvent::new("connectionId", "add", json!("abc")))
        .unwrap();
    assert_eq!(sync.applied(), 2);
    assert!(Arc::ptr_eq(&original, &sync.snapshot()));
}

#[test]
fn malformed_batch_is_rejected_whole() {
    let mut sync = Synchronizer::new(state());
    let frame = json!({
        "target": "batch",
        "action": "batch",
        "value": [
            {"target": "worker", "action": "update", "id": "w1", "value": {"status": 9}},
            {"nonsense": true}
        ]
    })
    .to_string();
    assert!(matches!(
        sync.apply_message(&frame),
        Err(SyncError::Json(_))
    ));
    assert_eq!(sync.snapshot().workers[0].status, 0);
    assert!(matches!(parse_message("[1, 2]"), Err(SyncError::Shape(_))));
    assert!(parse_message("not json").is_err());
}

#[test]
fn foreign_ads_are_journalled_until_placed() {
    let add = RawEvent::new(
        "ad",
        "add",
        json!({"id": "F", "siteId": "elsewhere", "status": 0, "cpc": 90}),
    );
    let journalled = apply(&state(), add).unwrap();
    assert_eq!(journalled.extra_ads.len(), 1);

    let placed = apply(
        &journalled,
        RawEvent::new("ad", "update", json!({"status": 1})).with_id("F"),
    )
    .unwrap();
    assert!(placed.extra_ads.is_empty());

    let own = apply(
        &state(),
        RawEvent::new("ad", "add", json!({"id": "Z", "siteId": "s1"})),
    )
    .unwrap();
    assert!(own.extra_ads.is_empty());
}

#[test]
fn site_push_appends_a_speed_record() {
    let push = RawEvent::new(
        "site",
        "push",
        json!({
            "siteId": "s1",
            "communityValue": 10.0, "communityVector": 1.0,
            "genericValue": 20.0, "genericVector": 0.0,
            "linkValue": 5.0, "linkVector": 0.0,
            "limit": 1000.0,
            "ts": 1_700_000_000_000_i64
        }),
    )
    .with_id("s1");
    let after = apply(&state(), push).unwrap();
    let site: &Site = after.site("s1").unwrap();
    assert_eq!(site.sitespeed.len(), 1);
    assert_eq!(site.last_speed().unwrap().speed().generic_value, 20.0);
}

#[test]
fn site_push_ignores_the_record_id() {
    let push = RawEvent::new(
        "site",
        "push",
        json!({
            "id": "speed-41",
            "siteId": "s1",
            "communityValue": 3.0, "communityVector": 0.0,
            "genericValue": 4.0, "genericVector": 0.0,
            "linkValue": 5.0, "linkVector": 0.0,
            "limit": 1000.0,
            "ts": 1_700_000_000_000_i64
        }),
    )
    .with_id("s1");
    let after = apply(&state(), push).unwrap();
    let site: &Site = after.site("s1").unwrap();
    assert_eq!(site.sitespeed.len(), 1);
    assert_eq!(site.last_speed().unwrap().id, "speed-41");

    let without_site = RawEvent::new(
        "site",
        "push",
        json!({
            "id": "s1",
            "communityValue": 3.0, "communityVector": 0.0,
            "genericValue": 4.0, "genericVector": 0.0,
            "linkValue": 5.0, "linkVector": 0.0,
            "limit": 1000.0,
            "ts": 1_700_000_000_000_i64
        }),
    );
    let before = state();
    let unchanged = apply(&before, without_site).unwrap();
    assert_eq!(unchanged.fingerprint(), before.fingerprint());
}

#[test]
fn fingerprint_tracks_content() {
    let a = state();
    let b = state();
    assert_eq!(a.fingerprint(), b.fingerprint());
    let changed = apply(
        &a,
        RawEvent::new("self", "update", json!({"balanceUsd": 99.0})),
    )
    .unwrap();
    assert_eq!(changed.person.balance_usd, 99.0);
    assert_ne!(changed.fingerprint(), a.fingerprint());
}
