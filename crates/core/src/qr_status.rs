//! QR code status machine and payload modes.
//!
//! Status ids must match the seed rows in
//! `20260301000005_create_qr_code_statuses_table.sql`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrStatus {
    /// Pre-allocated without a batch. Never produced by the create flow.
    Unbound = 0,
    Active = 1,
    Expired = 2,
    Disabled = 3,
}

impl QrStatus {
    /// Parse from the `qr_codes.status_id` column.
    pub fn from_id(id: i16) -> Result<Self, CoreError> {
        match id {
            0 => Ok(Self::Unbound),
            1 => Ok(Self::Active),
            2 => Ok(Self::Expired),
            3 => Ok(Self::Disabled),
            other => Err(CoreError::Internal(format!(
                "Unknown QR code status id {other}"
            ))),
        }
    }

    /// Value stored in the `qr_codes.status_id` column.
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Disabled => "disabled",
        }
    }
}

/// Status implied by an expiry timestamp for a code that is otherwise live.
fn status_for_expiry(expire_time: Option<Timestamp>, now: Timestamp) -> QrStatus {
    match expire_time {
        Some(t) if t <= now => QrStatus::Expired,
        _ => QrStatus::Active,
    }
}

/// The status a reader should see, folding a passed expiry into `Expired`.
///
/// The stored status is only rewritten on explicit transitions; an active
/// code whose `expire_time` has passed is reported as expired without a
/// write.
pub fn effective_status(
    stored: QrStatus,
    expire_time: Option<Timestamp>,
    now: Timestamp,
) -> QrStatus {
    match stored {
        QrStatus::Active => status_for_expiry(expire_time, now),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Scan validity
// ---------------------------------------------------------------------------

/// Why a known code cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Unbound,
    Expired,
    Disabled,
}

impl InvalidReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Unbound => "QR code is not bound to a batch",
            Self::Expired => "QR code has expired",
            Self::Disabled => "QR code has been disabled",
        }
    }
}

/// Decide whether a scan may proceed to lineage resolution.
pub fn check_scannable(
    stored: QrStatus,
    expire_time: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), InvalidReason> {
    match effective_status(stored, expire_time, now) {
        QrStatus::Active => Ok(()),
        QrStatus::Unbound => Err(InvalidReason::Unbound),
        QrStatus::Expired => Err(InvalidReason::Expired),
        QrStatus::Disabled => Err(InvalidReason::Disabled),
    }
}

// ---------------------------------------------------------------------------
// Administrative transitions
// ---------------------------------------------------------------------------

/// Disabling is allowed from every state and is idempotent.
pub fn transition_disable(_current: QrStatus) -> QrStatus {
    QrStatus::Disabled
}

/// Re-enable a code. The result honours the code's expiry.
///
/// Unbound codes have no batch to resolve and cannot be enabled.
pub fn transition_enable(
    current: QrStatus,
    expire_time: Option<Timestamp>,
    now: Timestamp,
) -> Result<QrStatus, CoreError> {
    match current {
        QrStatus::Unbound => Err(CoreError::Conflict(
            "An unbound QR code cannot be enabled".into(),
        )),
        _ => Ok(status_for_expiry(expire_time, now)),
    }
}

/// Status after replacing the expiry with `new_expiry` (`None` clears it).
///
/// Disabled and unbound codes keep their status; live codes become active
/// or expired according to the new deadline.
pub fn transition_set_expiry(
    current: QrStatus,
    new_expiry: Option<Timestamp>,
    now: Timestamp,
) -> QrStatus {
    match current {
        QrStatus::Disabled | QrStatus::Unbound => current,
        QrStatus::Active | QrStatus::Expired => status_for_expiry(new_expiry, now),
    }
}

// ---------------------------------------------------------------------------
// Payload mode
// ---------------------------------------------------------------------------

pub const MODE_LINK: &str = "link";
pub const MODE_EMBEDDED_SNAPSHOT: &str = "embedded_snapshot";

/// Which string gets encoded into the QR image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMode {
    /// A resolution URL containing the token.
    Link,
    /// A serialized point-in-time traceability snapshot.
    EmbeddedSnapshot,
}

impl PayloadMode {
    /// Convert from the `qr_codes.payload_mode` column.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            MODE_LINK => Ok(Self::Link),
            MODE_EMBEDDED_SNAPSHOT => Ok(Self::EmbeddedSnapshot),
            other => Err(CoreError::Validation(format!(
                "Invalid payload mode '{other}'. Must be one of: {MODE_LINK}, {MODE_EMBEDDED_SNAPSHOT}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => MODE_LINK,
            Self::EmbeddedSnapshot => MODE_EMBEDDED_SNAPSHOT,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn status_ids_round_trip() {
        for status in [
            QrStatus::Unbound,
            QrStatus::Active,
            QrStatus::Expired,
            QrStatus::Disabled,
        ] {
            assert_eq!(QrStatus::from_id(status.id()).unwrap(), status);
        }
        assert!(QrStatus::from_id(9).is_err());
    }

    #[test]
    fn active_code_past_expiry_reads_as_expired() {
        let now = Utc::now();
        let past = Some(now - Duration::minutes(1));
        let future = Some(now + Duration::minutes(1));
        assert_eq!(effective_status(QrStatus::Active, past, now), QrStatus::Expired);
        assert_eq!(effective_status(QrStatus::Active, future, now), QrStatus::Active);
        assert_eq!(effective_status(QrStatus::Active, None, now), QrStatus::Active);
        assert_eq!(
            effective_status(QrStatus::Disabled, future, now),
            QrStatus::Disabled
        );
    }

    #[test]
    fn expiry_exactly_now_is_expired() {
        let now = Utc::now();
        assert_eq!(
            check_scannable(QrStatus::Active, Some(now), now),
            Err(InvalidReason::Expired)
        );
    }

    #[test]
    fn only_live_codes_are_scannable() {
        let now = Utc::now();
        assert_eq!(check_scannable(QrStatus::Active, None, now), Ok(()));
        assert_eq!(
            check_scannable(QrStatus::Disabled, None, now),
            Err(InvalidReason::Disabled)
        );
        assert_eq!(
            check_scannable(QrStatus::Expired, None, now),
            Err(InvalidReason::Expired)
        );
        assert_eq!(
            check_scannable(QrStatus::Unbound, None, now),
            Err(InvalidReason::Unbound)
        );
    }

    #[test]
    fn enable_honours_expiry() {
        let now = Utc::now();
        assert_eq!(
            transition_enable(QrStatus::Disabled, None, now).unwrap(),
            QrStatus::Active
        );
        assert_eq!(
            transition_enable(QrStatus::Disabled, Some(now - Duration::hours(1)), now).unwrap(),
            QrStatus::Expired
        );
        assert!(transition_enable(QrStatus::Unbound, None, now).is_err());
    }

    #[test]
    fn set_expiry_revives_or_expires_live_codes_only() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        let future = Some(now + Duration::days(1));
        assert_eq!(
            transition_set_expiry(QrStatus::Active, past, now),
            QrStatus::Expired
        );
        assert_eq!(
            transition_set_expiry(QrStatus::Expired, future, now),
            QrStatus::Active
        );
        assert_eq!(
            transition_set_expiry(QrStatus::Expired, None, now),
            QrStatus::Active
        );
        assert_eq!(
            transition_set_expiry(QrStatus::Disabled, future, now),
            QrStatus::Disabled
        );
    }

    #[test]
    fn disable_is_idempotent() {
        assert_eq!(transition_disable(QrStatus::Active), QrStatus::Disabled);
        assert_eq!(transition_disable(QrStatus::Disabled), QrStatus::Disabled);
    }

    #[test]
    fn payload_mode_parses_column_values() {
        assert_eq!(PayloadMode::from_str_value("link").unwrap(), PayloadMode::Link);
        assert_eq!(
            PayloadMode::from_str_value("embedded_snapshot").unwrap(),
            PayloadMode::EmbeddedSnapshot
        );
        assert!(PayloadMode::from_str_value("svg").is_err());
        assert_eq!(
            serde_json::to_value(PayloadMode::EmbeddedSnapshot).unwrap(),
            "embedded_snapshot"
        );
    }
}
