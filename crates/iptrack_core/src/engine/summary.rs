//! Portfolio aggregation.
//!
//! # Responsibility
//! - Fold a snapshot of assets into dashboard counters and risk metrics.
//! - Sum caller-supplied valuations per asset kind.
//!
//! # Invariants
//! - Single pass over assets and their deadlines; each deadline is
//!   classified at most once.
//! - `by_kind` values always sum to `total_assets`.
//! - Dangling deadlines are excluded from every counter and reported in
//!   `unresolved`.

use crate::engine::classifier::UrgencyClassifier;
use crate::engine::feed::notification_for;
use crate::model::asset::{Asset, AssetId, AssetKind, AssetStatus};
use crate::model::error::NotFoundError;
use crate::model::notification::UrgencyTier;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Supplies an estimated monetary value per asset.
///
/// The engine never invents valuations; assets without one contribute zero.
pub trait AssetValuation {
    fn value_of(&self, asset: &Asset) -> Option<f64>;
}

impl<F> AssetValuation for F
where
    F: Fn(&Asset) -> Option<f64>,
{
    fn value_of(&self, asset: &Asset) -> Option<f64> {
        self(asset)
    }
}

impl AssetValuation for HashMap<AssetId, f64> {
    fn value_of(&self, asset: &Asset) -> Option<f64> {
        self.get(&asset.id).copied()
    }
}

impl AssetValuation for BTreeMap<AssetId, f64> {
    fn value_of(&self, asset: &Asset) -> Option<f64> {
        self.get(&asset.id).copied()
    }
}

/// Valuation source that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValuation;

impl AssetValuation for NoValuation {
    fn value_of(&self, _asset: &Asset) -> Option<f64> {
        None
    }
}

/// Emitted notifications per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub urgent: usize,
    pub warning: usize,
    pub info: usize,
}

/// Aggregate portfolio metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_assets: usize,
    /// Every kind is present, zero when absent from the snapshot.
    pub by_kind: BTreeMap<AssetKind, usize>,
    /// Every status is present, zero when absent from the snapshot.
    pub by_status: BTreeMap<AssetStatus, usize>,
    /// Assets with at least one urgent notification.
    pub assets_with_urgent: usize,
    pub tier_counts: TierCounts,
    /// Unresolved, reportable, not yet overdue.
    pub upcoming_deadlines: usize,
    pub overdue_deadlines: usize,
    /// Filed or under review.
    pub pending_applications: usize,
    /// Sum of tier weights over emitted notifications.
    pub risk_score: u32,
    pub value_by_kind: BTreeMap<AssetKind, f64>,
    pub total_value: f64,
    #[serde(skip)]
    pub unresolved: Vec<NotFoundError>,
}

impl Summary {
    fn empty() -> Self {
        Self {
            total_assets: 0,
            by_kind: AssetKind::ALL.iter().map(|kind| (*kind, 0)).collect(),
            by_status: AssetStatus::ALL.iter().map(|status| (*status, 0)).collect(),
            assets_with_urgent: 0,
            tier_counts: TierCounts::default(),
            upcoming_deadlines: 0,
            overdue_deadlines: 0,
            pending_applications: 0,
            risk_score: 0,
            value_by_kind: AssetKind::ALL.iter().map(|kind| (*kind, 0.0)).collect(),
            total_value: 0.0,
            unresolved: Vec::new(),
        }
    }
}

/// Summarizes `assets` as of `today`.
///
/// Archived assets are counted but contribute no notifications.
pub fn summarize(
    assets: &[Asset],
    today: NaiveDate,
    classifier: &UrgencyClassifier,
    valuation: &dyn AssetValuation,
) -> Summary {
    assets
        .iter()
        .fold(Summary::empty(), |mut summary, asset| {
            summary.total_assets += 1;
            *summary.by_kind.entry(asset.kind).or_insert(0) += 1;
            *summary.by_status.entry(asset.status).or_insert(0) += 1;
            if asset.status.is_pending() {
                summary.pending_applications += 1;
            }

            if let Some(value) = valuation.value_of(asset).filter(|value| value.is_finite()) {
                *summary.value_by_kind.entry(asset.kind).or_insert(0.0) += value;
                summary.total_value += value;
            }

            if !asset.is_archived() {
                fold_deadlines(&mut summary, asset, today, classifier);
            }
            summary
        })
}

fn fold_deadlines(
    summary: &mut Summary,
    asset: &Asset,
    today: NaiveDate,
    classifier: &UrgencyClassifier,
) {
    let mut has_urgent = false;
    for deadline in asset.outstanding_deadlines() {
        let notification = match notification_for(asset, deadline, today, classifier) {
            Ok(Some(notification)) => notification,
            Ok(None) => continue,
            Err(err) => {
                summary.unresolved.push(err);
                continue;
            }
        };

        summary.risk_score += notification.tier.risk_weight();
        if notification.is_overdue() {
            summary.overdue_deadlines += 1;
        } else {
            summary.upcoming_deadlines += 1;
        }
        match notification.tier {
            UrgencyTier::Urgent => {
                summary.tier_counts.urgent += 1;
                has_urgent = true;
            }
            UrgencyTier::Warning => summary.tier_counts.warning += 1,
            UrgencyTier::Info => summary.tier_counts.info += 1,
            UrgencyTier::Success => {}
        }
    }
    if has_urgent {
        summary.assets_with_urgent += 1;
    }
}
