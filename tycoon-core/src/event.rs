//! Wire events and their typed form.
//!
//! The server pushes `{target, action, id?, value}` envelopes, optionally
//! wrapped in (nested) batches. Envelopes are flattened first, then each leaf
//! is parsed once into [`GameEvent`]; shapes the processors do not know land
//! in [`GameEvent::Unknown`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{ACTION_ADD, BATCH_MARKER, CHAT_TARGETS, TARGET_LOGIN};
use crate::error::SyncError;
use crate::state::{Ad, Notification, SiteSpeed, Task};

/// Untyped wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub target: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl RawEvent {
    pub fn new(target: impl Into<String>, action: impl Into<String>, value: Value) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
            id: None,
            value,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Batch envelope wrapping `events` in order.
    ///
    /// # Errors
    ///
    /// Returns an error if an event cannot be serialized.
    pub fn batch(events: &[Self]) -> Result<Self, SyncError> {
        Ok(Self::new(
            BATCH_MARKER,
            BATCH_MARKER,
            serde_json::to_value(events)?,
        ))
    }

    /// Login event sent when a connection opens.
    #[must_use]
    pub fn login(credential: &str) -> Self {
        Self::new(TARGET_LOGIN, ACTION_ADD, Value::String(credential.to_string()))
    }

    #[must_use]
    pub fn is_batch(&self) -> bool {
        self.target == BATCH_MARKER && self.action == BATCH_MARKER
    }

    /// Leaf events in document order, expanding nested batches depth-first.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch does not carry a list of events. Nothing
    /// is returned for a malformed message, so it is applied all-or-nothing.
    pub fn flatten(self) -> Result<Vec<Self>, SyncError> {
        let mut leaves = Vec::new();
        let mut pending = vec![self];
        while let Some(event) = pending.pop() {
            if !event.is_batch() {
                leaves.push(event);
                continue;
            }
            let Value::Array(items) = event.value else {
                return Err(SyncError::Shape("batch value is not a list".into()));
            };
            let children = items
                .into_iter()
                .map(serde_json::from_value::<Self>)
                .collect::<Result<Vec<_>, _>>()?;
            pending.extend(children.into_iter().rev());
        }
        Ok(leaves)
    }

    /// `target:action`, for logs.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}", self.target, self.action)
    }

    fn value_id(&self) -> Option<String> {
        self.value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Id of the entity an update targets: the envelope id, else `value.id`.
    fn update_id(&self) -> Option<String> {
        self.id.clone().or_else(|| self.value_id())
    }

    /// Id of the entity a delete targets: `value.id`, else the envelope id.
    fn delete_id(&self) -> Option<String> {
        self.value_id().or_else(|| self.id.clone())
    }
}

/// Parse a text frame into its leaf events.
///
/// # Errors
///
/// Returns an error if the frame is not JSON or not an event envelope.
pub fn parse_message(text: &str) -> Result<Vec<RawEvent>, SyncError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(SyncError::Shape(format!("expected an object, got {value}")));
    }
    serde_json::from_value::<RawEvent>(value)?.flatten()
}

/// Which slice of the state tree an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Ad,
    Site,
    Worker,
    Task,
    Notification,
    Content,
    Person,
    /// Login, connection id and ping acknowledgements.
    Session,
    Chat,
}

/// A leaf event parsed into one of the shapes the processors handle.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    AdUpdate { id: String, patch: Value },
    AdAdd(Ad),
    AdDelete { id: String, site_id: Option<String> },
    SiteUpdate { id: String, patch: Value },
    SitePush { id: String, speed: Box<SiteSpeed> },
    WorkerUpdate { id: String, patch: Value },
    TaskAdd(Task),
    TaskUpdate { id: String, patch: Value },
    NotificationAdd(Notification),
    NotificationDelete { id: String },
    ContentUpdate { id: String, patch: Value },
    ContentDelete { id: String },
    SelfUpdate { patch: Value },
    Passthrough { kind: EntityKind, target: String, action: String },
    Unknown(RawEvent),
}

fn typed<T: DeserializeOwned>(raw: &RawEvent) -> Option<T> {
    match serde_json::from_value(raw.value.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("{} carries a malformed value: {err}", raw.label());
            None
        }
    }
}

fn passthrough_kind(target: &str) -> Option<EntityKind> {
    match target {
        "login" | "connectionId" | "ping" => Some(EntityKind::Session),
        chat if CHAT_TARGETS.contains(&chat) => Some(EntityKind::Chat),
        _ => None,
    }
}

impl GameEvent {
    #[must_use]
    pub fn from_raw(raw: RawEvent) -> Self {
        let parsed = match (raw.target.as_str(), raw.action.as_str()) {
            ("ad", "update") => raw.update_id().map(|id| Self::AdUpdate {
                id,
                patch: raw.value.clone(),
            }),
            ("ad", "add") => typed(&raw).map(Self::AdAdd),
            ("ad", "delete") => raw.delete_id().map(|id| Self::AdDelete {
                id,
                site_id: raw
                    .value
                    .get("siteId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            ("site", "update") => raw.update_id().map(|id| Self::SiteUpdate {
                id,
                patch: raw.value.clone(),
            }),
            // The value's own id names the speed record, never the site.
            ("site", "push") => match (raw.id.clone(), typed::<SiteSpeed>(&raw)) {
                (Some(id), Some(speed)) => Some(Self::SitePush {
                    id,
                    speed: Box::new(speed),
                }),
                _ => None,
            },
            ("worker", "update") => raw.update_id().map(|id| Self::WorkerUpdate {
                id,
                patch: raw.value.clone(),
            }),
            ("task", "add") => typed(&raw).map(Self::TaskAdd),
            ("task", "update") => raw.update_id().map(|id| Self::TaskUpdate {
                id,
                patch: raw.value.clone(),
            }),
            ("notification", "add") => typed(&raw).map(Self::NotificationAdd),
            ("notification", "delete") => raw.delete_id().map(|id| Self::NotificationDelete { id }),
            ("content", "update") => raw.update_id().map(|id| Self::ContentUpdate {
                id,
                patch: raw.value.clone(),
            }),
            ("content", "delete") => raw.delete_id().map(|id| Self::ContentDelete { id }),
            ("self", "update") => Some(Self::SelfUpdate {
                patch: raw.value.clone(),
            }),
            (target, action) => passthrough_kind(target).map(|kind| Self::Passthrough {
                kind,
                target: target.to_string(),
                action: action.to_string(),
            }),
        };
        parsed.unwrap_or(Self::Unknown(raw))
    }

    /// Slice of state the event touches; `None` for unknown events.
    #[must_use]
    pub const fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::AdUpdate { .. } | Self::AdAdd(_) | Self::AdDelete { .. } => Some(EntityKind::Ad),
            Self::SiteUpdate { .. } | Self::SitePush { .. } => Some(EntityKind::Site),
            Self::WorkerUpdate { .. } => Some(EntityKind::Worker),
            Self::TaskAdd(_) | Self::TaskUpdate { .. } => Some(EntityKind::Task),
            Self::NotificationAdd(_) | Self::NotificationDelete { .. } => {
                Some(EntityKind::Notification)
            }
            Self::ContentUpdate { .. } | Self::ContentDelete { .. } => Some(EntityKind::Content),
            Self::SelfUpdate { .. } => Some(EntityKind::Person),
            Self::Passthrough { kind, .. } => Some(*kind),
            Self::Unknown(_) => None,
        }
    }
}

impl From<RawEvent> for GameEvent {
    fn from(raw: RawEvent) -> Self {
        Self::from_raw(raw)
    }
}
