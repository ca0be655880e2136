//! Core domain logic for iptrack, an IP portfolio deadline tracker.
//! This crate is the single source of truth for asset and deadline invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod intake;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigLoadError, ConfigurationError, EngineConfig, UrgencyThresholds};
pub use engine::classifier::{Classification, UrgencyClassifier};
pub use engine::feed::{generate, NotificationFeed};
pub use engine::rules::{DeadlineRules, GenericDeadlineRules, NoDeadlineRules};
pub use engine::summary::{summarize, AssetValuation, NoValuation, Summary, TierCounts};
pub use intake::workflow::{AssetDraft, IntakeError, IntakeStep, IntakeWorkflow};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::asset::{Asset, AssetId, AssetKind, AssetStatus, Jurisdiction, NewAsset, Priority};
pub use model::deadline::{Deadline, DeadlineDraft, DeadlineId, DeadlineKind};
pub use model::error::{NotFoundError, ValidationError};
pub use model::notification::{Notification, UrgencyTier};
pub use repo::asset_repo::{
    AssetListQuery, AssetRepository, RepoError, RepoResult, SqliteAssetRepository,
};
pub use repo::memory_repo::InMemoryAssetRepository;
pub use search::filter::{filter_assets, filter_notifications, AssetFilter, NotificationFilter};
pub use service::portfolio_service::{PortfolioService, PortfolioServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
