//! Centralized constants for projection math and the event wire protocol.
//!
//! These values mirror the game server's arithmetic. Keeping them together
//! ensures the projection only changes through reviewed code, never through
//! runtime configuration.

// Time ---------------------------------------------------------------------
/// Milliseconds per hour; every vector rate is expressed per hour.
pub const HOUR_MS: i64 = 3_600_000;
/// Milliseconds per second; ad start dates arrive in epoch seconds.
pub const SECOND_MS: i64 = 1_000;

// Tiered price -------------------------------------------------------------
pub(crate) const PRICE_TIER_MINUTES_SECS: f64 = 300.0;
pub(crate) const PRICE_TIER_HOUR_SECS: f64 = 3_600.0;
pub(crate) const PRICE_TIER_DAY_SECS: f64 = 86_400.0;
pub(crate) const PRICE_TIER_HOUR_SPAN: f64 = 4.0;
pub(crate) const PRICE_TIER_HOUR_BASE: f64 = 1.0;
pub(crate) const PRICE_TIER_DAY_SPAN: f64 = 45.0;
pub(crate) const PRICE_TIER_DAY_BASE: f64 = 5.0;
pub(crate) const PRICE_TIER_LONG_DIVISOR: f64 = 35.0;

// Revenue ------------------------------------------------------------------
/// CTR is a percentage on the wire.
pub(crate) const CTR_PERCENT: f64 = 100.0;
/// CPC is quoted per thousand clicks.
pub(crate) const CPC_PER_MILLE: f64 = 1_000.0;
/// Anno (ad annoyance) ranges over 0..=100.
pub(crate) const ANNO_MAX: f64 = 100.0;
/// Money amounts are kept in cents by the server.
pub const MONEY_CENTS: f64 = 100.0;

// Site growth --------------------------------------------------------------
pub(crate) const SCORE_SHARE_PERCENT: f64 = 100.0;
pub(crate) const SCORE_SHARE_PIVOT: f64 = 33.0;
pub(crate) const SCORE_SHARE_EXPONENT: f64 = 0.3;
pub(crate) const SCORE_RATIO_MIN: f64 = 0.5;
pub(crate) const SCORE_RATIO_MAX: f64 = 1.5;

// Wire protocol ------------------------------------------------------------
/// Reserved target/action pair marking a batch envelope.
pub const BATCH_MARKER: &str = "batch";
pub const TARGET_LOGIN: &str = "login";
pub const ACTION_ADD: &str = "add";
/// Task status reported by the server once a task has finished.
pub const TASK_STATUS_FINISHED: i64 = 3;
/// Ad status reported by the server when an ad has been enabled on a site.
pub const AD_STATUS_ENABLED: i64 = 1;
/// Ad status for an offer that has not been placed yet.
pub const AD_STATUS_DISABLED: i64 = 0;
/// Chat channels the server pushes that carry no state.
pub const CHAT_TARGETS: [&str; 4] = ["globalchat", "itTalksChat", "linksExchangeChat", "globalpool"];
