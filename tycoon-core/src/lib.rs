//! Tycoon Core
//!
//! Projection engine and state synchronizer for web-tycoon automation.
//! Projections are pure functions of a recorded speed snapshot; the
//! synchronizer turns the server's event stream into immutable snapshots.
//! The connection loop is available behind the `async` feature.

#[cfg(feature = "async")]
pub mod connection;
pub mod constants;
pub mod error;
pub mod event;
pub mod history;
pub mod numbers;
pub mod processors;
pub mod regime;
pub mod revenue;
pub mod site_math;
pub mod state;
pub mod sync;
pub mod traffic;
pub mod vector;

// Re-export commonly used types
#[cfg(feature = "async")]
pub use connection::{ChannelPeer, ChannelTransport, SyncHandle, Transport, open};
pub use error::{ProjectionError, SyncError, TransportError};
pub use event::{EntityKind, GameEvent, RawEvent, parse_message};
pub use history::SpeedHistory;
pub use processors::{Processor, ProcessorRegistry};
pub use regime::{Regime, Regimes, reset_at};
pub use revenue::{
    AdStats, AdTerms, RevenueProjection, SpeedRatio, ad_stats, amount, anno_ratio, current_ctr,
    project_revenue, rate, speed_ratio_for_ad, speed_ratio_for_ads,
};
pub use site_math::{front_ratio, generic_base, retention, traffic_limit};
pub use state::{
    Ad, Content, JsonMap, Notification, Person, Site, SiteSpeed, Snapshot, Task, Worker,
    merge_patch,
};
pub use sync::{ConnectionState, Synchronizer, apply};
pub use traffic::{
    SpeedSnapshot, TrafficResult, capacity, community_traffic, ddos_traffic, generic_traffic,
    generic_value, limited_total, link_traffic, project_traffic, traffic_amount,
};
pub use vector::{Vector, solve_for_target, tiered_price};
#[cfg(feature = "async")]
pub use tokio_util::sync::CancellationToken;

/// Trait for abstracting where the initial state tree comes from
/// Platform-specific implementations should provide this
pub trait SnapshotLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the state tree the event stream starts from
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or parsed.
    fn load_snapshot(&self) -> Result<Snapshot, Self::Error>;
}

/// Snapshot loader backed by an in-memory JSON document
#[derive(Debug, Clone)]
pub struct JsonSnapshotLoader {
    document: String,
}

impl JsonSnapshotLoader {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

impl SnapshotLoader for JsonSnapshotLoader {
    type Error = serde_json::Error;

    fn load_snapshot(&self) -> Result<Snapshot, Self::Error> {
        serde_json::from_str(&self.document)
    }
}

/// Per-site view combining the synchronizer's state with the projections.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProjection {
    pub site_id: String,
    pub domain: String,
    pub at: i64,
    pub traffic: TrafficResult,
    pub ads: Vec<AdProjection>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdProjection {
    pub ad_id: String,
    pub enabled: bool,
    pub stats: AdStats,
}

/// Project every owned site with at least one speed record at `at`.
///
/// Sites without speed records are skipped. `at` earlier than a site's last
/// record is treated as the record time.
///
/// # Errors
///
/// Returns the first projection error raised by a site or one of its ads.
pub fn project_sites(snapshot: &Snapshot, at: i64) -> Result<Vec<SiteProjection>, ProjectionError> {
    let mut projections = Vec::new();
    for site in snapshot.sites.iter() {
        let Some(record) = site.last_speed() else {
            log::debug!("site {} has no speed records yet", site.id);
            continue;
        };
        let speed = record.speed();
        let when = at.max(speed.ts);
        let ads = site
            .ad
            .iter()
            .map(|ad| {
                Ok(AdProjection {
                    ad_id: ad.id.clone(),
                    enabled: ad.is_enabled(),
                    stats: ad_stats(&speed, ad, when)?,
                })
            })
            .collect::<Result<Vec<_>, ProjectionError>>()?;
        projections.push(SiteProjection {
            site_id: site.id.clone(),
            domain: site.domain.clone(),
            at: when,
            traffic: project_traffic(&speed, when)?,
            ads,
        });
    }
    Ok(projections)
}
