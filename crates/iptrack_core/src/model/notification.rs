//! Derived notification projection.
//!
//! A notification is a view of one unresolved deadline at one point in time.
//! It has no identity beyond `(deadline_id, today)` and is recomputed on
//! every query.

use crate::model::asset::{AssetId, AssetKind, Priority};
use crate::model::deadline::{DeadlineId, DeadlineKind};
use crate::model::error::ValidationError;
use chrono::NaiveDate;
use serde::Serialize;
use std::str::FromStr;

/// Time-pressure classification, ordered `Success < Info < Warning < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    /// Far enough out that no notification is emitted.
    Success,
    Info,
    Warning,
    /// Inside the urgent window or already overdue.
    Urgent,
}

impl UrgencyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Urgent => "urgent",
        }
    }

    /// Priority floor implied by this tier.
    pub fn derived_priority(self) -> Option<Priority> {
        match self {
            Self::Success => None,
            Self::Info => Some(Priority::Low),
            Self::Warning => Some(Priority::Medium),
            Self::Urgent => Some(Priority::High),
        }
    }

    /// Contribution of one notification to the portfolio risk score.
    pub fn risk_weight(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::Info => 1,
            Self::Warning => 2,
            Self::Urgent => 3,
        }
    }
}

impl FromStr for UrgencyTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "urgent" => Ok(Self::Urgent),
            other => Err(ValidationError::UnknownValue {
                field: "urgency tier",
                value: other.to_string(),
            }),
        }
    }
}

/// One actionable alert for an outstanding deadline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub deadline_id: DeadlineId,
    pub asset_id: AssetId,
    pub asset_kind: AssetKind,
    pub asset_title: String,
    pub deadline_kind: DeadlineKind,
    pub label: String,
    pub due_date: NaiveDate,
    /// `due_date - today`; negative when overdue.
    pub days_left: i64,
    pub tier: UrgencyTier,
    /// Position of today inside the tracking window, in `[0, 1]`.
    pub progress: f64,
    /// `max(asset priority, tier-derived priority)`.
    pub priority: Priority,
    pub asset_priority: Priority,
}

impl Notification {
    pub fn is_overdue(&self) -> bool {
        self.days_left < 0
    }

    /// Number of days past due, if overdue.
    pub fn overdue_days(&self) -> Option<u64> {
        self.is_overdue().then(|| self.days_left.unsigned_abs())
    }

    /// Progress rounded to a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        (self.progress * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Short human label: `5 days overdue`, `due today`, `7 days remaining`.
    pub fn due_label(&self) -> String {
        match self.days_left {
            0 => "due today".to_string(),
            -1 => "1 day overdue".to_string(),
            1 => "1 day remaining".to_string(),
            days if days < 0 => format!("{} days overdue", days.unsigned_abs()),
            days => format!("{days} days remaining"),
        }
    }
}
