//! Asset domain model.
//!
//! # Responsibility
//! - Define the canonical IP asset record and its closed enumerations.
//! - Own the deadlines attached to an asset and guard their invariants.
//!
//! # Invariants
//! - `id` matches `IP-YYYY-NNN` and is never reused for another asset.
//! - `filing_date <= expiry_date` when both are set.
//! - Any status other than `Draft` requires at least one jurisdiction.
//! - Every owned deadline points back at this asset and ids are unique.

use crate::model::deadline::{Deadline, DeadlineDraft, DeadlineId};
use crate::model::error::{NotFoundError, ValidationError};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static ASSET_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^IP-(\d{4})-(\d{3,9})$").expect("valid asset id regex"));
static JURISDICTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,4}$").expect("valid jurisdiction regex"));

/// Stable asset identifier in `IP-YYYY-NNN` form.
///
/// Ordering follows `(year, sequence)`, so `IP-2024-1000` sorts after
/// `IP-2024-999` even though plain string order disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId {
    text: String,
    year: i32,
    sequence: u32,
}

impl AssetId {
    /// Parses and validates an identifier.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let invalid = || ValidationError::InvalidAssetId(trimmed.to_string());
        let caps = ASSET_ID_RE.captures(trimmed).ok_or_else(invalid)?;
        let year = caps[1].parse::<i32>().map_err(|_| invalid())?;
        let sequence = caps[2].parse::<u32>().map_err(|_| invalid())?;
        Ok(Self {
            text: trimmed.to_string(),
            year,
            sequence,
        })
    }

    /// Builds the canonical id for one allocated sequence number.
    ///
    /// Sequence numbers are zero-padded to three digits.
    pub fn from_parts(year: i32, sequence: u32) -> Result<Self, ValidationError> {
        Self::parse(&format!("IP-{year:04}-{sequence:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Ord for AssetId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.sequence, self.text.as_str()).cmp(&(
            other.year,
            other.sequence,
            other.text.as_str(),
        ))
    }
}

impl PartialOrd for AssetId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for AssetId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.text
    }
}

impl FromStr for AssetId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Category of IP right; determines which deadline rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Patent,
    Trademark,
    /// Industrial design registration.
    Design,
    Copyright,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Patent,
        AssetKind::Trademark,
        AssetKind::Design,
        AssetKind::Copyright,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patent => "patent",
            Self::Trademark => "trademark",
            Self::Design => "design",
            Self::Copyright => "copyright",
        }
    }
}

impl FromStr for AssetKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patent" => Ok(Self::Patent),
            "trademark" => Ok(Self::Trademark),
            "design" | "industrial design" | "industrial_design" => Ok(Self::Design),
            "copyright" => Ok(Self::Copyright),
            other => Err(ValidationError::UnknownValue {
                field: "kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Asset lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// Collected by intake, not yet filed with any office.
    Draft,
    Filed,
    #[serde(alias = "pending")]
    UnderReview,
    /// Granted or registered right in force.
    #[serde(alias = "registered")]
    Active,
    Expired,
    /// Replaces deletion; read-only from then on.
    Archived,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 6] = [
        AssetStatus::Draft,
        AssetStatus::Filed,
        AssetStatus::UnderReview,
        AssetStatus::Active,
        AssetStatus::Expired,
        AssetStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Filed => "filed",
            Self::UnderReview => "under_review",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Archived => "archived",
        }
    }

    /// Whether the asset is lodged with an office. `Archived` is excluded so
    /// an abandoned draft can still be archived.
    pub fn is_filed(self) -> bool {
        matches!(
            self,
            Self::Filed | Self::UnderReview | Self::Active | Self::Expired
        )
    }

    /// Filed but not yet decided by the office.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Filed | Self::UnderReview)
    }
}

impl FromStr for AssetStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "filed" => Ok(Self::Filed),
            "under_review" | "under review" | "pending" => Ok(Self::UnderReview),
            "active" | "registered" | "granted" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "archived" => Ok(Self::Archived),
            other => Err(ValidationError::UnknownValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// User-assigned business importance, ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ValidationError::UnknownValue {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Office or region code such as `US`, `EU`, `JP`.
///
/// Input is trimmed and upper-cased before validation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let normalized = value.trim().to_ascii_uppercase();
        if !JURISDICTION_RE.is_match(&normalized) {
            return Err(ValidationError::InvalidJurisdiction(value.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Jurisdiction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Jurisdiction {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Jurisdiction> for String {
    fn from(value: Jurisdiction) -> Self {
        value.0
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Ownership details. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owners {
    pub inventors: Vec<String>,
    pub assignee: Option<String>,
}

/// Canonical IP asset record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: AssetStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub jurisdictions: BTreeSet<Jurisdiction>,
    #[serde(default)]
    pub filing_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub owners: Owners,
    #[serde(default)]
    pub application_number: Option<String>,
    /// Names of supporting documents; contents live elsewhere.
    #[serde(default)]
    pub documents: Vec<String>,
    /// Insertion order, not due-date order.
    #[serde(default)]
    pub deadlines: Vec<Deadline>,
}

impl Asset {
    /// Creates a draft asset with no dates, jurisdictions or deadlines.
    pub fn new(id: AssetId, kind: AssetKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            description: String::new(),
            status: AssetStatus::Draft,
            priority: Priority::default(),
            jurisdictions: BTreeSet::new(),
            filing_date: None,
            expiry_date: None,
            owners: Owners::default(),
            application_number: None,
            documents: Vec::new(),
            deadlines: Vec::new(),
        }
    }

    /// Builds a committed asset from intake content and an allocated id.
    ///
    /// Deadline drafts are materialized against `id` in their given order.
    pub fn from_new(id: AssetId, new_asset: NewAsset) -> Result<Self, ValidationError> {
        let NewAsset {
            kind,
            title,
            description,
            status,
            priority,
            jurisdictions,
            filing_date,
            expiry_date,
            owners,
            application_number,
            documents,
            deadlines,
            lookback_days,
        } = new_asset;

        let mut asset = Self {
            id,
            kind,
            title,
            description,
            status,
            priority,
            jurisdictions,
            filing_date,
            expiry_date,
            owners,
            application_number,
            documents,
            deadlines: Vec::with_capacity(deadlines.len()),
        };
        for draft in deadlines {
            let deadline = draft.into_deadline(&asset.id, lookback_days)?;
            asset.push_deadline(deadline)?;
        }
        asset.validate()?;
        Ok(asset)
    }

    /// Checks every asset and owned-deadline invariant.
    ///
    /// A deadline whose back-reference names another asset is not rejected
    /// here: imported data may carry one, and the notification engine
    /// reports it as a dangling reference. New deadlines enter through
    /// `push_deadline`, which refuses the mismatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let (Some(filing_date), Some(expiry_date)) = (self.filing_date, self.expiry_date) {
            if filing_date > expiry_date {
                return Err(ValidationError::InvalidDateRange {
                    filing_date,
                    expiry_date,
                });
            }
        }
        if self.status.is_filed() && self.jurisdictions.is_empty() {
            return Err(ValidationError::MissingJurisdiction {
                status: self.status,
            });
        }

        let mut seen = HashSet::with_capacity(self.deadlines.len());
        for deadline in &self.deadlines {
            deadline.validate()?;
            if !seen.insert(deadline.id) {
                return Err(ValidationError::DuplicateDeadline(deadline.id));
            }
        }
        Ok(())
    }

    /// Checks that `self` is a legal edit of `previous`.
    ///
    /// The id is fixed, archived assets are frozen, owned deadlines cannot be
    /// dropped, a resolved deadline cannot be reopened, and added deadlines
    /// must point back at this asset.
    pub fn validate_update_of(&self, previous: &Asset) -> Result<(), ValidationError> {
        if self.id != previous.id {
            return Err(ValidationError::AssetIdChanged {
                expected: previous.id.clone(),
                found: self.id.clone(),
            });
        }
        self.validate()?;
        if previous.is_archived() {
            return Err(ValidationError::ArchivedAsset(previous.id.clone()));
        }
        for old in &previous.deadlines {
            match self.deadline(old.id) {
                None => return Err(ValidationError::DeadlineRemoved(old.id)),
                Some(new) if old.is_resolved() && !new.is_resolved() => {
                    return Err(ValidationError::DeadlineUnresolved(old.id));
                }
                Some(_) => {}
            }
        }
        for added in self
            .deadlines
            .iter()
            .filter(|deadline| previous.deadline(deadline.id).is_none())
        {
            if added.asset_id != self.id {
                return Err(ValidationError::DeadlineAssetMismatch {
                    deadline_id: added.id,
                    expected: self.id.clone(),
                    found: added.asset_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Appends one deadline, keeping insertion order.
    pub fn push_deadline(&mut self, deadline: Deadline) -> Result<(), ValidationError> {
        deadline.validate()?;
        if deadline.asset_id != self.id {
            return Err(ValidationError::DeadlineAssetMismatch {
                deadline_id: deadline.id,
                expected: self.id.clone(),
                found: deadline.asset_id,
            });
        }
        if self.deadline(deadline.id).is_some() {
            return Err(ValidationError::DuplicateDeadline(deadline.id));
        }
        self.deadlines.push(deadline);
        Ok(())
    }

    /// Marks one owned deadline resolved.
    ///
    /// Returns `true` when the flag flipped, `false` when it was already set.
    pub fn resolve_deadline(&mut self, deadline_id: DeadlineId) -> Result<bool, NotFoundError> {
        let asset_id = self.id.clone();
        let deadline = self
            .deadlines
            .iter_mut()
            .find(|deadline| deadline.id == deadline_id)
            .ok_or(NotFoundError::Deadline {
                asset_id,
                deadline_id,
            })?;
        Ok(deadline.resolve())
    }

    pub fn deadline(&self, deadline_id: DeadlineId) -> Option<&Deadline> {
        self.deadlines
            .iter()
            .find(|deadline| deadline.id == deadline_id)
    }

    /// Deadlines that still require action, in insertion order.
    pub fn outstanding_deadlines(&self) -> impl Iterator<Item = &Deadline> {
        self.deadlines
            .iter()
            .filter(|deadline| !deadline.is_resolved())
    }

    pub fn is_archived(&self) -> bool {
        self.status == AssetStatus::Archived
    }
}

/// Validated asset content waiting for an id from the portfolio store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub kind: AssetKind,
    pub title: String,
    pub description: String,
    pub status: AssetStatus,
    pub priority: Priority,
    pub jurisdictions: BTreeSet<Jurisdiction>,
    pub filing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub owners: Owners,
    pub application_number: Option<String>,
    pub documents: Vec<String>,
    pub deadlines: Vec<DeadlineDraft>,
    /// Lookback applied to deadline drafts without an explicit window.
    pub lookback_days: u32,
}
