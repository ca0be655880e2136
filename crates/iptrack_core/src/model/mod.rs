//! Domain model for tracked IP assets and their obligations.
//!
//! # Responsibility
//! - Define the canonical value types used by the engine and the stores.
//! - Keep lifecycle enumerations closed so illegal states are unrepresentable.
//!
//! # Invariants
//! - Every asset is identified by a stable `AssetId` (`IP-YYYY-NNN`).
//! - Assets are never hard-deleted; `AssetStatus::Archived` replaces deletion.
//! - A deadline belongs to exactly one asset and `resolved` is monotonic.
//! - Notifications are derived values and are never persisted.

pub mod asset;
pub mod deadline;
pub mod error;
pub mod notification;
