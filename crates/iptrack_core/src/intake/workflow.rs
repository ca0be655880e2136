//! Intake state machine and draft model.

use crate::model::asset::{
    Asset, AssetId, AssetKind, AssetStatus, Jurisdiction, NewAsset, Owners, Priority,
};
use crate::model::deadline::{DeadlineDraft, DEFAULT_LOOKBACK_DAYS};
use crate::model::error::ValidationError;
use crate::repo::asset_repo::{AssetRepository, RepoError};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ordered intake steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    BasicInfo,
    OwnershipLegal,
    Documents,
    Review,
    Committed,
}

impl IntakeStep {
    /// Steps a user fills in, excluding the terminal state.
    pub const FORM_STEPS: [IntakeStep; 4] = [
        IntakeStep::BasicInfo,
        IntakeStep::OwnershipLegal,
        IntakeStep::Documents,
        IntakeStep::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::OwnershipLegal => "ownership_legal",
            Self::Documents => "documents",
            Self::Review => "review",
            Self::Committed => "committed",
        }
    }

    /// One-based position among the form steps; `Committed` counts as the last.
    pub fn number(self) -> usize {
        match self {
            Self::BasicInfo => 1,
            Self::OwnershipLegal => 2,
            Self::Documents => 3,
            Self::Review | Self::Committed => 4,
        }
    }

    /// Completion indicator shown alongside the form, `25..=100`.
    pub fn progress_percent(self) -> u8 {
        match self {
            Self::BasicInfo => 25,
            Self::OwnershipLegal => 50,
            Self::Documents => 75,
            Self::Review | Self::Committed => 100,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::BasicInfo => Some(Self::OwnershipLegal),
            Self::OwnershipLegal => Some(Self::Documents),
            Self::Documents => Some(Self::Review),
            Self::Review | Self::Committed => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            Self::BasicInfo | Self::Committed => None,
            Self::OwnershipLegal => Some(Self::BasicInfo),
            Self::Documents => Some(Self::OwnershipLegal),
            Self::Review => Some(Self::Documents),
        }
    }
}

impl Display for IntakeStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw form content. Every field may be incomplete until commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetDraft {
    pub kind: Option<AssetKind>,
    pub title: String,
    pub description: String,
    /// `None` commits as `Medium`.
    pub priority: Option<Priority>,
    pub inventors: Vec<String>,
    pub assignee: Option<String>,
    /// Unparsed codes as typed by the user.
    pub jurisdictions: Vec<String>,
    pub filing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub application_number: Option<String>,
    pub documents: Vec<String>,
    pub deadlines: Vec<DeadlineDraft>,
}

impl AssetDraft {
    /// Validates the draft and normalizes it into store input.
    ///
    /// Status is `Filed` when a filing date is present, else `Draft`.
    pub fn validate(&self, lookback_days: u32) -> Result<NewAsset, ValidationError> {
        let kind = self.kind.ok_or(ValidationError::MissingKind)?;
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let jurisdictions = self
            .jurisdictions
            .iter()
            .filter(|code| !code.trim().is_empty())
            .map(|code| Jurisdiction::parse(code))
            .collect::<Result<BTreeSet<_>, _>>()?;

        if let (Some(filing_date), Some(expiry_date)) = (self.filing_date, self.expiry_date) {
            if filing_date > expiry_date {
                return Err(ValidationError::InvalidDateRange {
                    filing_date,
                    expiry_date,
                });
            }
        }

        let status = if self.filing_date.is_some() {
            AssetStatus::Filed
        } else {
            AssetStatus::Draft
        };
        if status.is_filed() && jurisdictions.is_empty() {
            return Err(ValidationError::MissingJurisdiction { status });
        }

        Ok(NewAsset {
            kind,
            title: title.to_string(),
            description: self.description.trim().to_string(),
            status,
            priority: self.priority.unwrap_or_default(),
            jurisdictions,
            filing_date: self.filing_date,
            expiry_date: self.expiry_date,
            owners: Owners {
                inventors: non_blank(&self.inventors),
                assignee: optional_text(self.assignee.as_deref()),
            },
            application_number: optional_text(self.application_number.as_deref()),
            documents: non_blank(&self.documents),
            deadlines: self.deadlines.clone(),
            lookback_days,
        })
    }
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Intake failure.
#[derive(Debug)]
pub enum IntakeError {
    /// Draft content rejected at commit.
    Validation(ValidationError),
    /// Portfolio store refused the write.
    Store(RepoError),
    /// Navigation or commit requested from a step that does not allow it.
    InvalidTransition {
        from: IntakeStep,
        action: &'static str,
    },
}

impl Display for IntakeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidTransition { from, action } => {
                write!(f, "cannot {action} from intake step `{from}`")
            }
        }
    }
}

impl Error for IntakeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidTransition { .. } => None,
        }
    }
}

impl From<ValidationError> for IntakeError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for IntakeError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

/// Linear intake state machine over one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeWorkflow {
    step: IntakeStep,
    draft: AssetDraft,
    lookback_days: u32,
    committed: Option<AssetId>,
}

impl Default for IntakeWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeWorkflow {
    pub fn new() -> Self {
        Self {
            step: IntakeStep::BasicInfo,
            draft: AssetDraft::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            committed: None,
        }
    }

    /// Lookback used for drafted deadlines without an explicit window.
    pub fn with_lookback(mut self, lookback_days: u32) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    pub fn step(&self) -> IntakeStep {
        self.step
    }

    pub fn draft(&self) -> &AssetDraft {
        &self.draft
    }

    /// Mutable draft access. Edits after commit are refused.
    pub fn draft_mut(&mut self) -> Result<&mut AssetDraft, IntakeError> {
        if self.step == IntakeStep::Committed {
            return Err(IntakeError::InvalidTransition {
                from: self.step,
                action: "edit",
            });
        }
        Ok(&mut self.draft)
    }

    /// Id assigned by the last successful commit.
    pub fn committed_id(&self) -> Option<&AssetId> {
        self.committed.as_ref()
    }

    /// Moves one step forward. `Review` only leaves through `commit`.
    pub fn advance(&mut self) -> Result<IntakeStep, IntakeError> {
        let next = self.step.next().ok_or(IntakeError::InvalidTransition {
            from: self.step,
            action: "advance",
        })?;
        self.step = next;
        Ok(next)
    }

    /// Moves one step back, keeping draft content.
    ///
    /// `BasicInfo` has no predecessor and `Committed` is terminal; both
    /// refuse the move.
    pub fn back(&mut self) -> Result<IntakeStep, IntakeError> {
        let previous = self.step.previous().ok_or(IntakeError::InvalidTransition {
            from: self.step,
            action: "go back",
        })?;
        self.step = previous;
        Ok(previous)
    }

    /// Validates the draft and stores it under a freshly allocated id.
    ///
    /// The id year comes from `today`. On failure the workflow stays at
    /// `Review` with the draft intact.
    pub fn commit<S>(&mut self, store: &S, today: NaiveDate) -> Result<Asset, IntakeError>
    where
        S: AssetRepository + ?Sized,
    {
        if self.step != IntakeStep::Review {
            return Err(IntakeError::InvalidTransition {
                from: self.step,
                action: "commit",
            });
        }

        let result = self
            .draft
            .validate(self.lookback_days)
            .map_err(IntakeError::from)
            .and_then(|new_asset| {
                store
                    .create_asset(new_asset, today.year())
                    .map_err(IntakeError::from)
            });

        match result {
            Ok(asset) => {
                info!(
                    "event=asset_commit module=intake status=ok asset_id={} kind={} deadlines={}",
                    asset.id,
                    asset.kind.as_str(),
                    asset.deadlines.len()
                );
                self.step = IntakeStep::Committed;
                self.committed = Some(asset.id.clone());
                Ok(asset)
            }
            Err(err) => {
                warn!("event=asset_commit module=intake status=error error={err}");
                Err(err)
            }
        }
    }

    /// Begins a fresh draft at `BasicInfo`.
    pub fn restart(&mut self) {
        self.step = IntakeStep::BasicInfo;
        self.draft = AssetDraft::default();
        self.committed = None;
    }
}
