//! Urgency classification for a single deadline.

use crate::config::UrgencyThresholds;
use crate::model::deadline::Deadline;
use crate::model::notification::UrgencyTier;
use chrono::NaiveDate;

/// Result of classifying one deadline at one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub tier: UrgencyTier,
    /// Clamped to `[0, 1]`; `1.0` once overdue.
    pub progress: f64,
    /// `due_date - today` in whole days.
    pub days_left: i64,
}

/// Maps deadlines to tiers using validated thresholds.
///
/// Holding only `UrgencyThresholds` means a classifier can never exist for
/// an invalid configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrgencyClassifier {
    thresholds: UrgencyThresholds,
}

impl UrgencyClassifier {
    pub fn new(thresholds: UrgencyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &UrgencyThresholds {
        &self.thresholds
    }

    /// Classifies one deadline. Callers filter out resolved deadlines first.
    pub fn classify(&self, deadline: &Deadline, today: NaiveDate) -> Classification {
        self.classify_dates(deadline.due_date, deadline.window_start, today)
    }

    /// Classification as a pure function of the three dates.
    pub fn classify_dates(
        &self,
        due_date: NaiveDate,
        window_start: NaiveDate,
        today: NaiveDate,
    ) -> Classification {
        let days_left = days_between(today, due_date);
        Classification {
            tier: self.tier_for(days_left),
            progress: progress_fraction(due_date, window_start, today),
            days_left,
        }
    }

    /// Tier for a signed day count; boundaries are inclusive.
    pub fn tier_for(&self, days_left: i64) -> UrgencyTier {
        if days_left <= i64::from(self.thresholds.urgent_days()) {
            UrgencyTier::Urgent
        } else if days_left <= i64::from(self.thresholds.warning_days()) {
            UrgencyTier::Warning
        } else if days_left <= i64::from(self.thresholds.info_days()) {
            UrgencyTier::Info
        } else {
            UrgencyTier::Success
        }
    }

    /// Whether a deadline this far out belongs in the notification feed.
    pub fn is_reportable(&self, days_left: i64) -> bool {
        days_left <= i64::from(self.thresholds.info_days())
    }
}

/// Signed whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Position of `today` inside `[window_start, due_date]`.
pub fn progress_fraction(due_date: NaiveDate, window_start: NaiveDate, today: NaiveDate) -> f64 {
    if today > due_date {
        return 1.0;
    }
    let span = days_between(window_start, due_date);
    if span <= 0 {
        return if today >= due_date { 1.0 } else { 0.0 };
    }
    let elapsed = days_between(window_start, today);
    (elapsed as f64 / span as f64).clamp(0.0, 1.0)
}
