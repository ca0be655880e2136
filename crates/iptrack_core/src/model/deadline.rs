//! Deadline domain model.
//!
//! # Responsibility
//! - Represent one dated obligation attached to an asset.
//! - Provide the monotonic resolution operation.
//!
//! # Invariants
//! - `window_start <= due_date`, enforced at construction and on decode.
//! - `resolved` only ever flips from `false` to `true`.

use crate::model::asset::AssetId;
use crate::model::error::ValidationError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for one deadline.
pub type DeadlineId = Uuid;

/// Tracking window length used when no explicit `window_start` is given.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Category of obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    Renewal,
    MaintenanceFee,
    OfficeActionResponse,
    OppositionWindow,
    FilingConfirmation,
}

impl DeadlineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Renewal => "renewal",
            Self::MaintenanceFee => "maintenance_fee",
            Self::OfficeActionResponse => "office_action_response",
            Self::OppositionWindow => "opposition_window",
            Self::FilingConfirmation => "filing_confirmation",
        }
    }
}

impl FromStr for DeadlineKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "renewal" => Ok(Self::Renewal),
            "maintenance_fee" => Ok(Self::MaintenanceFee),
            "office_action_response" | "response" => Ok(Self::OfficeActionResponse),
            "opposition_window" | "opposition" => Ok(Self::OppositionWindow),
            "filing_confirmation" => Ok(Self::FilingConfirmation),
            other => Err(ValidationError::UnknownValue {
                field: "deadline kind",
                value: other.to_string(),
            }),
        }
    }
}

/// One obligation owned by an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeadlineRecord")]
pub struct Deadline {
    pub id: DeadlineId,
    /// Back-reference to the owning asset.
    pub asset_id: AssetId,
    pub kind: DeadlineKind,
    pub label: String,
    pub due_date: NaiveDate,
    /// Date from which progress is tracked.
    pub window_start: NaiveDate,
    resolved: bool,
}

impl Deadline {
    /// Creates an unresolved deadline tracked over the default lookback.
    pub fn new(
        asset_id: AssetId,
        kind: DeadlineKind,
        label: impl Into<String>,
        due_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let window_start = lookback_start(due_date, DEFAULT_LOOKBACK_DAYS);
        Self::with_window(asset_id, kind, label, due_date, window_start)
    }

    /// Creates an unresolved deadline with an explicit tracking window.
    ///
    /// # Errors
    /// - `InvalidDeadlineWindow` when `window_start > due_date`.
    /// - `EmptyDeadlineLabel` when `label` is blank.
    pub fn with_window(
        asset_id: AssetId,
        kind: DeadlineKind,
        label: impl Into<String>,
        due_date: NaiveDate,
        window_start: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let deadline = Self {
            id: Uuid::new_v4(),
            asset_id,
            kind,
            label: label.into(),
            due_date,
            window_start,
            resolved: false,
        };
        deadline.validate()?;
        Ok(deadline)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyDeadlineLabel);
        }
        if self.window_start > self.due_date {
            return Err(ValidationError::InvalidDeadlineWindow {
                window_start: self.window_start,
                due_date: self.due_date,
            });
        }
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Marks the obligation satisfied. Returns whether the flag changed.
    pub fn resolve(&mut self) -> bool {
        let changed = !self.resolved;
        self.resolved = true;
        changed
    }
}

/// Wire and storage shape for [`Deadline`]; validated on conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct DeadlineRecord {
    /// Fixtures may omit ids; a fresh one is generated on decode.
    #[serde(default = "Uuid::new_v4")]
    pub id: DeadlineId,
    pub asset_id: AssetId,
    pub kind: DeadlineKind,
    pub label: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub window_start: Option<NaiveDate>,
    #[serde(default)]
    pub resolved: bool,
}

impl TryFrom<DeadlineRecord> for Deadline {
    type Error = ValidationError;

    fn try_from(value: DeadlineRecord) -> Result<Self, Self::Error> {
        let deadline = Self {
            id: value.id,
            asset_id: value.asset_id,
            kind: value.kind,
            label: value.label,
            due_date: value.due_date,
            window_start: value
                .window_start
                .unwrap_or_else(|| lookback_start(value.due_date, DEFAULT_LOOKBACK_DAYS)),
            resolved: value.resolved,
        };
        deadline.validate()?;
        Ok(deadline)
    }
}

/// Deadline content before it is bound to an asset id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineDraft {
    pub kind: DeadlineKind,
    pub label: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub window_start: Option<NaiveDate>,
}

impl DeadlineDraft {
    pub fn new(kind: DeadlineKind, label: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            kind,
            label: label.into(),
            due_date,
            window_start: None,
        }
    }

    /// Binds the draft to its owning asset.
    ///
    /// A missing `window_start` becomes `due_date - lookback_days`.
    pub fn into_deadline(
        self,
        asset_id: &AssetId,
        lookback_days: u32,
    ) -> Result<Deadline, ValidationError> {
        let window_start = self
            .window_start
            .unwrap_or_else(|| lookback_start(self.due_date, lookback_days));
        Deadline::with_window(
            asset_id.clone(),
            self.kind,
            self.label,
            self.due_date,
            window_start,
        )
    }
}

fn lookback_start(due_date: NaiveDate, lookback_days: u32) -> NaiveDate {
    due_date
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN)
}
