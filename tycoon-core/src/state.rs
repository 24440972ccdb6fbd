//! Game state tree mirrored from the server.
//!
//! Entities model the fields the projection and the processors read; every
//! other field the server sends is kept verbatim in `extra` so merging a
//! patch never drops data.

use std::hash::Hasher;
use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use twox_hash::XxHash64;

use crate::constants::{AD_STATUS_DISABLED, AD_STATUS_ENABLED};
use crate::revenue::AdTerms;
use crate::traffic::SpeedSnapshot;

pub type JsonMap = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub balance_usd: f64,
    #[serde(default)]
    pub level: i64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub level: i64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub workers: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub cpc: f64,
    #[serde(default)]
    pub ctr_base: f64,
    #[serde(default)]
    pub ctr_vector: f64,
    /// Epoch seconds.
    #[serde(default)]
    pub start_date: i64,
    /// Money already earned, in cents.
    #[serde(default)]
    pub money: f64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Ad {
    #[must_use]
    pub const fn terms(&self) -> AdTerms {
        AdTerms {
            ctr_base: self.ctr_base,
            ctr_vector: self.ctr_vector,
            start_date: self.start_date,
            cpc: self.cpc,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.status == AD_STATUS_ENABLED
    }

    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.status == AD_STATUS_DISABLED
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub ts: i64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ts: i64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// A recorded speed sample of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpeed {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub site_id: String,
    pub community_value: f64,
    pub community_vector: f64,
    pub generic_value: f64,
    pub generic_vector: f64,
    pub link_value: f64,
    pub link_vector: f64,
    #[serde(default)]
    pub speed_ratio_value: f64,
    #[serde(default)]
    pub speed_ratio_vector: f64,
    #[serde(default)]
    pub ddos_value: f64,
    pub limit: f64,
    #[serde(default)]
    pub anno: f64,
    #[serde(default = "SiteSpeed::default_front_ratio")]
    pub front_ratio: f64,
    pub ts: i64,
    /// Money earned during the segment ending at this record, in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money: Option<f64>,
    /// Visitors received during the segment ending at this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<f64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl SiteSpeed {
    const fn default_front_ratio() -> f64 {
        1.0
    }

    #[must_use]
    pub const fn speed(&self) -> SpeedSnapshot {
        SpeedSnapshot {
            community_value: self.community_value,
            community_vector: self.community_vector,
            generic_value: self.generic_value,
            generic_vector: self.generic_vector,
            link_value: self.link_value,
            link_vector: self.link_vector,
            speed_ratio_value: self.speed_ratio_value,
            speed_ratio_vector: self.speed_ratio_vector,
            ddos_value: self.ddos_value,
            limit: self.limit,
            anno: self.anno,
            front_ratio: self.front_ratio,
            ts: self.ts,
        }
    }

    /// Record built from a snapshot, without accumulators.
    #[must_use]
    pub fn from_speed(site_id: &str, speed: &SpeedSnapshot) -> Self {
        Self {
            id: String::new(),
            site_id: site_id.to_string(),
            community_value: speed.community_value,
            community_vector: speed.community_vector,
            generic_value: speed.generic_value,
            generic_vector: speed.generic_vector,
            link_value: speed.link_value,
            link_vector: speed.link_vector,
            speed_ratio_value: speed.speed_ratio_value,
            speed_ratio_vector: speed.speed_ratio_vector,
            ddos_value: speed.ddos_value,
            limit: speed.limit,
            anno: speed.anno,
            front_ratio: speed.front_ratio,
            ts: speed.ts,
            money: None,
            traffic: None,
            extra: JsonMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub anno: f64,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub ad: Vec<Ad>,
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default)]
    pub sitespeed: Vec<SiteSpeed>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Site {
    /// Most recent speed record.
    #[must_use]
    pub fn last_speed(&self) -> Option<&SiteSpeed> {
        self.sitespeed.iter().max_by_key(|record| record.ts)
    }
}

/// Full state tree.
///
/// Collections sit behind `Arc` so a transition that touches one collection
/// shares every other one with the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub person: Arc<Person>,
    #[serde(default)]
    pub workers: Arc<Vec<Worker>>,
    #[serde(default)]
    pub sites: Arc<Vec<Site>>,
    #[serde(default)]
    pub tasks: Arc<Vec<Task>>,
    #[serde(default)]
    pub notifications: Arc<Vec<Notification>>,
    /// Ads seen on sites this account does not own.
    #[serde(default)]
    pub extra_ads: Arc<Vec<Ad>>,
    #[serde(default)]
    pub server_time: i64,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: JsonMap,
}

struct HashWriter(XxHash64);

impl io::Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Snapshot {
    /// Stable 64-bit hash of the canonical JSON form.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut writer = HashWriter(XxHash64::with_seed(0));
        if let Err(err) = serde_json::to_writer(&mut writer, self) {
            log::warn!("snapshot fingerprint is partial: {err}");
        }
        writer.0.finish()
    }

    #[must_use]
    pub fn site(&self, id: &str) -> Option<&Site> {
        self.sites.iter().find(|site| site.id == id)
    }

    #[must_use]
    pub fn owns_site(&self, id: &str) -> bool {
        self.site(id).is_some()
    }

    /// Every ad on every owned site, paired with its site.
    pub fn ads(&self) -> impl Iterator<Item = (&Site, &Ad)> {
        self.sites
            .iter()
            .flat_map(|site| site.ad.iter().map(move |ad| (site, ad)))
    }
}

/// Merge a JSON object patch onto a typed entity.
///
/// Returns `None` when the patch is not an object or the merged form no
/// longer parses as `T`.
#[must_use]
pub fn merge_patch<T>(entity: &T, patch: &Value) -> Option<T>
where
    T: Serialize + DeserializeOwned,
{
    let Value::Object(fields) = patch else {
        return None;
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(entity) else {
        return None;
    };
    for (key, value) in fields {
        merged.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(merged)).ok()
}
