//! Error taxonomy for the projection engine and the synchronizer.

use thiserror::Error;

/// Precondition violations raised by projection functions.
///
/// These indicate a logic bug in the caller (a corrupted snapshot or a query
/// in the past) and are never coerced into a number.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("{field} is not a finite number in {op}")]
    NonFinite {
        op: &'static str,
        field: &'static str,
    },
    #[error("{field} must not be negative in {op} (got {value})")]
    Negative {
        op: &'static str,
        field: &'static str,
        value: f64,
    },
    #[error("{field} must not be positive in {op} (got {value})")]
    Positive {
        op: &'static str,
        field: &'static str,
        value: f64,
    },
    #[error("{field} must be between {min} and {max} in {op} (got {value})")]
    OutOfRange {
        op: &'static str,
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("target time {to_ts} precedes reference time {from_ts} in {op}")]
    TimeReversed {
        op: &'static str,
        from_ts: i64,
        to_ts: i64,
    },
    #[error("rate is zero in {op}")]
    ZeroRate { op: &'static str },
    #[error("rate {rate} moves {value} away from {target} in {op}")]
    WrongDirection {
        op: &'static str,
        value: f64,
        target: f64,
        rate: f64,
    },
    #[error("speed history is empty in {op}")]
    EmptyHistory { op: &'static str },
}

impl ProjectionError {
    /// Name of the operation that rejected its input.
    #[must_use]
    pub const fn op(&self) -> &'static str {
        match self {
            Self::NonFinite { op, .. }
            | Self::Negative { op, .. }
            | Self::Positive { op, .. }
            | Self::OutOfRange { op, .. }
            | Self::TimeReversed { op, .. }
            | Self::ZeroRate { op }
            | Self::WrongDirection { op, .. }
            | Self::EmptyHistory { op } => op,
        }
    }
}

/// Errors raised while decoding an inbound wire message.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not an event envelope: {0}")]
    Shape(String),
}

/// Failures reported by a transport implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("transport closed")]
    Closed,
}

pub(crate) fn ensure_finite(
    op: &'static str,
    field: &'static str,
    value: f64,
) -> Result<f64, ProjectionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProjectionError::NonFinite { op, field })
    }
}

pub(crate) fn ensure_non_negative(
    op: &'static str,
    field: &'static str,
    value: f64,
) -> Result<f64, ProjectionError> {
    ensure_finite(op, field, value)?;
    if value < 0.0 {
        return Err(ProjectionError::Negative { op, field, value });
    }
    Ok(value)
}

pub(crate) fn ensure_not_before(
    op: &'static str,
    from_ts: i64,
    to_ts: i64,
) -> Result<(), ProjectionError> {
    if to_ts < from_ts {
        return Err(ProjectionError::TimeReversed { op, from_ts, to_ts });
    }
    Ok(())
}
