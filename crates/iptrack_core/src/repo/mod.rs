//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the portfolio store contract the service and intake depend on.
//! - Isolate SQLite query details from engine and service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Asset::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`)
//!   in addition to DB transport errors.

pub mod asset_repo;
pub mod memory_repo;
