//! Deadline urgency engine.
//!
//! # Responsibility
//! - Classify deadlines into urgency tiers and tracking progress.
//! - Derive the ordered notification feed and portfolio summaries.
//! - Provide pluggable rules that append deadlines on status changes.
//!
//! # Invariants
//! - Every function here is pure over `(assets, today, thresholds)`.
//! - Resolved deadlines and archived assets never produce notifications.
//! - A dangling deadline is reported, never fatal.

pub mod classifier;
pub mod feed;
pub mod rules;
pub mod summary;
