//! Portfolio use-case service.
//!
//! # Responsibility
//! - Compose store, clock, classifier and deadline rules into the
//!   operations a presentation layer calls.
//! - Serialize every mutation through the repository's atomic update.
//!
//! # Invariants
//! - Reads operate on a copied snapshot; the engine never sees live state.
//! - `Archived` is terminal; archived assets accept no further writes.
//! - Log lines carry ids, kinds and counts only, never titles.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::engine::classifier::UrgencyClassifier;
use crate::engine::feed::{generate, NotificationFeed};
use crate::engine::rules::{DeadlineRules, GenericDeadlineRules};
use crate::engine::summary::{summarize, AssetValuation, Summary};
use crate::intake::workflow::{IntakeError, IntakeWorkflow};
use crate::model::asset::{Asset, AssetId, AssetStatus};
use crate::model::deadline::{Deadline, DeadlineDraft, DeadlineId};
use crate::model::error::{NotFoundError, ValidationError};
use crate::repo::asset_repo::{AssetListQuery, AssetRepository, RepoError};
use crate::search::filter::{filter_assets, AssetFilter};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for portfolio use-cases.
#[derive(Debug)]
pub enum PortfolioServiceError {
    /// Input or transition rejected by domain invariants.
    Validation(ValidationError),
    /// Target asset or deadline does not exist.
    NotFound(NotFoundError),
    /// Intake navigation or commit failure.
    Intake(IntakeError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for PortfolioServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(err) => write!(f, "{err}"),
            Self::Intake(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PortfolioServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(err) => Some(err),
            Self::Intake(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for PortfolioServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(err) => Self::NotFound(err),
            other => Self::Repo(other),
        }
    }
}

impl From<IntakeError> for PortfolioServiceError {
    fn from(value: IntakeError) -> Self {
        match value {
            IntakeError::Validation(err) => Self::Validation(err),
            other => Self::Intake(other),
        }
    }
}

impl From<ValidationError> for PortfolioServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type PortfolioResult<T> = Result<T, PortfolioServiceError>;

/// Use-case facade over one asset repository.
pub struct PortfolioService<R: AssetRepository, C: Clock> {
    repo: R,
    clock: C,
    classifier: UrgencyClassifier,
    lookback_days: u32,
    rules: Box<dyn DeadlineRules>,
}

impl<R: AssetRepository, C: Clock> PortfolioService<R, C> {
    /// Creates a service with `GenericDeadlineRules`.
    pub fn new(repo: R, clock: C, config: &EngineConfig) -> Self {
        Self {
            repo,
            clock,
            classifier: UrgencyClassifier::new(config.thresholds),
            lookback_days: config.default_lookback_days,
            rules: Box::new(GenericDeadlineRules::default()),
        }
    }

    /// Replaces the deadline rules applied on status change.
    pub fn with_rules(mut self, rules: impl DeadlineRules + 'static) -> Self {
        self.rules = Box::new(rules);
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn classifier(&self) -> &UrgencyClassifier {
        &self.classifier
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fresh intake workflow configured with this service's lookback.
    pub fn start_intake(&self) -> IntakeWorkflow {
        IntakeWorkflow::new().with_lookback(self.lookback_days)
    }

    /// Commits the workflow's draft into this service's store.
    pub fn commit_intake(&self, workflow: &mut IntakeWorkflow) -> PortfolioResult<Asset> {
        Ok(workflow.commit(&self.repo, self.today())?)
    }

    /// Ordered notification feed for every non-archived asset.
    pub fn notifications(&self) -> PortfolioResult<NotificationFeed> {
        let assets = self.repo.list_assets(&AssetListQuery::default())?;
        let feed = generate(&assets, self.today(), &self.classifier);
        if !feed.unresolved_references().is_empty() {
            warn!(
                "event=feed_generate module=service status=partial unresolved={}",
                feed.unresolved_references().len()
            );
        }
        Ok(feed)
    }

    /// Aggregate metrics over the whole portfolio, archived assets included.
    pub fn summary(&self, valuation: &dyn AssetValuation) -> PortfolioResult<Summary> {
        let assets = self.repo.snapshot()?;
        Ok(summarize(&assets, self.today(), &self.classifier, valuation))
    }

    /// Non-archived assets matching `filter`, in insertion order.
    pub fn search(&self, filter: &AssetFilter) -> PortfolioResult<Vec<Asset>> {
        let assets = self.repo.list_assets(&AssetListQuery::default())?;
        Ok(filter_assets(&assets, filter).into_iter().cloned().collect())
    }

    pub fn get_asset(&self, id: &AssetId) -> PortfolioResult<Asset> {
        Ok(self.repo.require_asset(id)?)
    }

    /// Marks a deadline resolved. Returns whether the flag changed.
    pub fn resolve_deadline(
        &self,
        asset_id: &AssetId,
        deadline_id: DeadlineId,
    ) -> PortfolioResult<bool> {
        let changed = self.repo.resolve_deadline(asset_id, deadline_id)?;
        info!(
            "event=deadline_resolve module=service status=ok asset_id={asset_id} deadline_id={deadline_id} changed={changed}"
        );
        Ok(changed)
    }

    /// Appends a deadline using the configured lookback when no window is set.
    pub fn add_deadline(
        &self,
        asset_id: &AssetId,
        draft: DeadlineDraft,
    ) -> PortfolioResult<Deadline> {
        Ok(self
            .repo
            .append_deadline(asset_id, draft, self.lookback_days)?)
    }

    /// Moves an asset to `status` and appends the deadlines the rules emit.
    ///
    /// Status change and appended deadlines are written atomically.
    pub fn change_status(&self, asset_id: &AssetId, status: AssetStatus) -> PortfolioResult<Asset> {
        let today = self.today();
        let lookback_days = self.lookback_days;
        let rules = self.rules.as_ref();
        let mut from = None;

        let updated = self.repo.update_with(asset_id, &mut |asset| {
            from = Some(asset.status);
            if asset.status == status {
                return Ok(());
            }
            let drafts = rules.on_status_change(asset, asset.status, status, today);
            asset.status = status;
            for draft in drafts {
                let deadline = draft.into_deadline(&asset.id, lookback_days)?;
                asset.push_deadline(deadline)?;
            }
            Ok(())
        })?;

        info!(
            "event=status_change module=service status=ok asset_id={} from={} to={} deadlines={}",
            updated.id,
            from.map_or("unknown", AssetStatus::as_str),
            updated.status.as_str(),
            updated.deadlines.len()
        );
        Ok(updated)
    }

    /// Archives an asset. Archiving an archived asset returns it unchanged.
    pub fn archive(&self, asset_id: &AssetId) -> PortfolioResult<Asset> {
        let current = self.repo.require_asset(asset_id)?;
        if current.is_archived() {
            return Ok(current);
        }
        self.change_status(asset_id, AssetStatus::Archived)
    }
}
