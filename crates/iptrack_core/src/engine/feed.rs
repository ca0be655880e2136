//! Notification feed generation.
//!
//! # Invariants
//! - One notification per unresolved deadline with `days_left <= info_days`.
//! - Feed order: `days_left` ASC, effective priority DESC, `asset_id` ASC;
//!   remaining ties keep asset and deadline insertion order.
//! - Regenerating with identical inputs yields an identical feed.

use crate::engine::classifier::UrgencyClassifier;
use crate::model::asset::{Asset, Priority};
use crate::model::deadline::Deadline;
use crate::model::error::NotFoundError;
use crate::model::notification::{Notification, UrgencyTier};
use chrono::NaiveDate;
use log::debug;
use std::cmp::Ordering;

/// Ordered notifications plus the references that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFeed {
    notifications: Vec<Notification>,
    unresolved: Vec<NotFoundError>,
}

impl NotificationFeed {
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.notifications.iter()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Deadlines skipped because their asset reference did not resolve.
    pub fn unresolved_references(&self) -> &[NotFoundError] {
        &self.unresolved
    }

    pub fn count_tier(&self, tier: UrgencyTier) -> usize {
        self.notifications
            .iter()
            .filter(|notification| notification.tier == tier)
            .count()
    }

    pub fn into_notifications(self) -> Vec<Notification> {
        self.notifications
    }
}

impl<'a> IntoIterator for &'a NotificationFeed {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.notifications.iter()
    }
}

/// Builds the ordered feed for `assets` as of `today`.
///
/// Archived assets are skipped.
pub fn generate(
    assets: &[Asset],
    today: NaiveDate,
    classifier: &UrgencyClassifier,
) -> NotificationFeed {
    let mut feed = NotificationFeed::default();

    for asset in assets.iter().filter(|asset| !asset.is_archived()) {
        for deadline in asset.outstanding_deadlines() {
            match notification_for(asset, deadline, today, classifier) {
                Ok(Some(notification)) => feed.notifications.push(notification),
                Ok(None) => {}
                Err(err) => feed.unresolved.push(err),
            }
        }
    }

    // Stable sort: equal keys keep insertion order.
    feed.notifications.sort_by(compare_notifications);

    debug!(
        "event=feed_generate module=engine status=ok assets={} notifications={} unresolved={}",
        assets.len(),
        feed.notifications.len(),
        feed.unresolved.len()
    );
    feed
}

/// `max(asset priority, tier-derived priority)`.
pub fn effective_priority(asset_priority: Priority, tier: UrgencyTier) -> Priority {
    tier.derived_priority()
        .map_or(asset_priority, |derived| derived.max(asset_priority))
}

/// Feed ordering over the three sort keys.
pub fn compare_notifications(a: &Notification, b: &Notification) -> Ordering {
    a.days_left
        .cmp(&b.days_left)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.asset_id.cmp(&b.asset_id))
}

/// Classifies one unresolved deadline of `asset`.
///
/// Returns `Ok(None)` when the deadline is beyond the info threshold and
/// `Err` when its back-reference does not point at `asset`.
pub(crate) fn notification_for(
    asset: &Asset,
    deadline: &Deadline,
    today: NaiveDate,
    classifier: &UrgencyClassifier,
) -> Result<Option<Notification>, NotFoundError> {
    if deadline.asset_id != asset.id {
        return Err(NotFoundError::DanglingDeadline {
            deadline_id: deadline.id,
            owner: asset.id.clone(),
            referenced: deadline.asset_id.clone(),
        });
    }

    let classification = classifier.classify(deadline, today);
    if !classifier.is_reportable(classification.days_left) {
        return Ok(None);
    }

    Ok(Some(Notification {
        deadline_id: deadline.id,
        asset_id: asset.id.clone(),
        asset_kind: asset.kind,
        asset_title: asset.title.clone(),
        deadline_kind: deadline.kind,
        label: deadline.label.clone(),
        due_date: deadline.due_date,
        days_left: classification.days_left,
        tier: classification.tier,
        progress: classification.progress,
        priority: effective_priority(asset.priority, classification.tier),
        asset_priority: asset.priority,
    }))
}

#[cfg(test)]
mod tests {
    use super::effective_priority;
    use crate::model::asset::Priority;
    use crate::model::notification::UrgencyTier;

    #[test]
    fn effective_priority_takes_the_maximum() {
        assert_eq!(effective_priority(Priority::Low, UrgencyTier::Urgent), Priority::High);
        assert_eq!(effective_priority(Priority::High, UrgencyTier::Info), Priority::High);
        assert_eq!(effective_priority(Priority::Low, UrgencyTier::Warning), Priority::Medium);
        assert_eq!(effective_priority(Priority::Medium, UrgencyTier::Success), Priority::Medium);
    }
}
