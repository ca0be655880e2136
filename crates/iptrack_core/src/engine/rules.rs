//! Pluggable deadline rules.
//!
//! Rules decide which obligations appear when an asset changes status.
//! `GenericDeadlineRules` is an illustrative default, not a statement of any
//! office's fee schedule; real deployments supply their own implementation.

use crate::model::asset::{Asset, AssetKind, AssetStatus};
use crate::model::deadline::{DeadlineDraft, DeadlineKind};
use chrono::{Days, Months, NaiveDate};

/// Produces deadlines triggered by a status transition.
pub trait DeadlineRules: Send + Sync {
    fn on_status_change(
        &self,
        asset: &Asset,
        from: AssetStatus,
        to: AssetStatus,
        today: NaiveDate,
    ) -> Vec<DeadlineDraft>;
}

/// Rules that never add deadlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeadlineRules;

impl DeadlineRules for NoDeadlineRules {
    fn on_status_change(
        &self,
        _asset: &Asset,
        _from: AssetStatus,
        _to: AssetStatus,
        _today: NaiveDate,
    ) -> Vec<DeadlineDraft> {
        Vec::new()
    }
}

/// Jurisdiction-agnostic defaults.
///
/// - Filing adds a `FilingConfirmation` due `filing_confirmation_days` later.
/// - Granting a patent adds a `MaintenanceFee` due
///   `maintenance_interval_months` after the grant.
/// - Granting any other kind adds a `Renewal` due at `expiry_date`, if set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericDeadlineRules {
    pub maintenance_interval_months: u32,
    pub filing_confirmation_days: u32,
}

impl Default for GenericDeadlineRules {
    fn default() -> Self {
        Self {
            maintenance_interval_months: 42,
            filing_confirmation_days: 30,
        }
    }
}

impl DeadlineRules for GenericDeadlineRules {
    fn on_status_change(
        &self,
        asset: &Asset,
        from: AssetStatus,
        to: AssetStatus,
        today: NaiveDate,
    ) -> Vec<DeadlineDraft> {
        if from == to {
            return Vec::new();
        }

        let mut drafts = Vec::new();
        match to {
            AssetStatus::Filed => {
                if let Some(due) =
                    today.checked_add_days(Days::new(u64::from(self.filing_confirmation_days)))
                {
                    drafts.push(DeadlineDraft::new(
                        DeadlineKind::FilingConfirmation,
                        "Filing Confirmation",
                        due,
                    ));
                }
            }
            AssetStatus::Active => match asset.kind {
                AssetKind::Patent => {
                    if let Some(due) =
                        today.checked_add_months(Months::new(self.maintenance_interval_months))
                    {
                        drafts.push(DeadlineDraft::new(
                            DeadlineKind::MaintenanceFee,
                            "Maintenance Fee",
                            due,
                        ));
                    }
                }
                AssetKind::Trademark | AssetKind::Design | AssetKind::Copyright => {
                    if let Some(expiry) = asset.expiry_date.filter(|expiry| *expiry > today) {
                        drafts.push(DeadlineDraft::new(DeadlineKind::Renewal, "Renewal", expiry));
                    }
                }
            },
            _ => {}
        }
        drafts
    }
}
