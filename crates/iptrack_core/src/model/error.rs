//! Validation and reference errors raised by the domain model.
//!
//! # Invariants
//! - `ValidationError` is always recoverable by the caller: nothing has been
//!   mutated when it is returned.
//! - `NotFoundError` reports one dangling reference and never aborts a whole
//!   portfolio computation.

use crate::model::asset::{AssetId, AssetStatus};
use crate::model::deadline::DeadlineId;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed or incomplete asset/deadline construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier does not match `IP-YYYY-NNN`.
    InvalidAssetId(String),
    /// Asset kind has not been chosen.
    MissingKind,
    /// Title is blank after trim.
    EmptyTitle,
    /// `filing_date` is later than `expiry_date`.
    InvalidDateRange {
        filing_date: NaiveDate,
        expiry_date: NaiveDate,
    },
    /// Asset left `Draft` without any jurisdiction.
    MissingJurisdiction { status: AssetStatus },
    /// Jurisdiction code is not 2-4 ASCII letters.
    InvalidJurisdiction(String),
    /// Calendar date text is not `YYYY-MM-DD`.
    InvalidDate(String),
    /// Enumeration text does not name a known variant.
    UnknownValue { field: &'static str, value: String },
    /// Deadline label is blank after trim.
    EmptyDeadlineLabel,
    /// Deadline tracking window opens after the due date.
    InvalidDeadlineWindow {
        window_start: NaiveDate,
        due_date: NaiveDate,
    },
    /// Deadline back-reference names another asset.
    DeadlineAssetMismatch {
        deadline_id: DeadlineId,
        expected: AssetId,
        found: AssetId,
    },
    /// The same deadline id appears twice on one asset.
    DuplicateDeadline(DeadlineId),
    /// An update tried to flip a resolved deadline back to unresolved.
    DeadlineUnresolved(DeadlineId),
    /// An update dropped a deadline that the stored asset owns.
    DeadlineRemoved(DeadlineId),
    /// Archived assets are read-only.
    ArchivedAsset(AssetId),
    /// An update tried to rename the asset.
    AssetIdChanged { expected: AssetId, found: AssetId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAssetId(value) => {
                write!(f, "invalid asset id `{value}`; expected IP-YYYY-NNN")
            }
            Self::MissingKind => write!(f, "asset kind is required"),
            Self::EmptyTitle => write!(f, "asset title must not be blank"),
            Self::InvalidDateRange {
                filing_date,
                expiry_date,
            } => write!(
                f,
                "expiry_date ({expiry_date}) must be >= filing_date ({filing_date})"
            ),
            Self::MissingJurisdiction { status } => write!(
                f,
                "asset with status `{}` requires at least one jurisdiction",
                status.as_str()
            ),
            Self::InvalidJurisdiction(value) => {
                write!(f, "invalid jurisdiction code `{value}`")
            }
            Self::InvalidDate(value) => {
                write!(f, "invalid calendar date `{value}`; expected YYYY-MM-DD")
            }
            Self::UnknownValue { field, value } => {
                write!(f, "unknown {field} value `{value}`")
            }
            Self::EmptyDeadlineLabel => write!(f, "deadline label must not be blank"),
            Self::InvalidDeadlineWindow {
                window_start,
                due_date,
            } => write!(
                f,
                "deadline window_start ({window_start}) must be <= due_date ({due_date})"
            ),
            Self::DeadlineAssetMismatch {
                deadline_id,
                expected,
                found,
            } => write!(
                f,
                "deadline {deadline_id} references asset {found} but is owned by {expected}"
            ),
            Self::DuplicateDeadline(id) => write!(f, "duplicate deadline id: {id}"),
            Self::DeadlineUnresolved(id) => {
                write!(f, "deadline {id} is resolved and cannot be reopened")
            }
            Self::DeadlineRemoved(id) => {
                write!(f, "deadline {id} cannot be removed from its asset")
            }
            Self::ArchivedAsset(id) => write!(f, "asset {id} is archived and read-only"),
            Self::AssetIdChanged { expected, found } => {
                write!(f, "asset id is immutable: {expected} cannot become {found}")
            }
        }
    }
}

impl Error for ValidationError {}

/// A reference that does not resolve against the current asset snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    Asset(AssetId),
    Deadline {
        asset_id: AssetId,
        deadline_id: DeadlineId,
    },
    /// Deadline carried by one asset while pointing at another.
    DanglingDeadline {
        deadline_id: DeadlineId,
        owner: AssetId,
        referenced: AssetId,
    },
}

impl Display for NotFoundError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset(id) => write!(f, "asset not found: {id}"),
            Self::Deadline {
                asset_id,
                deadline_id,
            } => write!(f, "deadline {deadline_id} not found on asset {asset_id}"),
            Self::DanglingDeadline {
                deadline_id,
                owner,
                referenced,
            } => write!(
                f,
                "deadline {deadline_id} held by {owner} references unknown owner {referenced}"
            ),
        }
    }
}

impl Error for NotFoundError {}
