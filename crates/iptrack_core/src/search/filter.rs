//! In-memory asset and notification filters.
//!
//! # Responsibility
//! - Select assets by free text, kind, status and priority.
//! - Select notifications by tier and priority.
//! - Sort asset listings by a chosen column.
//!
//! # Invariants
//! - Filters are stable: matching items keep their input relative order.
//! - Every predicate combines with logical AND; `Selector::All` is no
//!   constraint.

use crate::model::asset::{Asset, AssetKind, AssetStatus, Priority};
use crate::model::error::ValidationError;
use crate::model::notification::{Notification, UrgencyTier};
use std::cmp::Ordering;
use std::str::FromStr;

/// Sentinel text meaning "no constraint".
pub const SELECT_ALL: &str = "all";

/// Exact-match constraint over a closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

impl<T> FromStr for Selector<T>
where
    T: FromStr<Err = ValidationError>,
{
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(SELECT_ALL) {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// Asset list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFilter {
    /// Case-insensitive substring of `title` or `id`; blank means any.
    pub text: Option<String>,
    pub kind: Selector<AssetKind>,
    pub status: Selector<AssetStatus>,
    pub priority: Selector<Priority>,
}

impl AssetFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        self.kind.matches(&asset.kind)
            && self.status.matches(&asset.status)
            && self.priority.matches(&asset.priority)
            && self.matches_text(asset)
    }

    fn matches_text(&self, asset: &Asset) -> bool {
        let Some(needle) = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        asset.title.to_lowercase().contains(&needle)
            || asset.id.as_str().to_lowercase().contains(&needle)
    }
}

/// Returns matching assets in input order.
pub fn filter_assets<'a>(assets: &'a [Asset], filter: &AssetFilter) -> Vec<&'a Asset> {
    assets.iter().filter(|asset| filter.matches(asset)).collect()
}

/// Notification feed query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub tier: Selector<UrgencyTier>,
    pub priority: Selector<Priority>,
    pub asset_kind: Selector<AssetKind>,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        self.tier.matches(&notification.tier)
            && self.priority.matches(&notification.priority)
            && self.asset_kind.matches(&notification.asset_kind)
    }
}

/// Returns matching notifications in feed order.
pub fn filter_notifications<'a, I>(notifications: I, filter: &NotificationFilter) -> Vec<&'a Notification>
where
    I: IntoIterator<Item = &'a Notification>,
{
    notifications
        .into_iter()
        .filter(|notification| filter.matches(notification))
        .collect()
}

/// Column used to order asset listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSortKey {
    Id,
    Title,
    FilingDate,
    ExpiryDate,
    Priority,
}

impl FromStr for AssetSortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "filing_date" | "filing" => Ok(Self::FilingDate),
            "expiry_date" | "expiry" => Ok(Self::ExpiryDate),
            "priority" => Ok(Self::Priority),
            other => Err(ValidationError::UnknownValue {
                field: "sort key",
                value: other.to_string(),
            }),
        }
    }
}

/// Sorts assets by `key`, ties broken by id. Missing dates sort last.
pub fn sort_assets(assets: &mut [&Asset], key: AssetSortKey, descending: bool) {
    assets.sort_by(|a, b| {
        let primary = match key {
            AssetSortKey::Id => Ordering::Equal,
            AssetSortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            AssetSortKey::FilingDate => compare_optional(a.filing_date, b.filing_date),
            AssetSortKey::ExpiryDate => compare_optional(a.expiry_date, b.expiry_date),
            AssetSortKey::Priority => a.priority.cmp(&b.priority),
        };
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compare_optional<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
