//! Multi-step asset intake.
//!
//! # Responsibility
//! - Collect draft asset content across ordered steps.
//! - Validate the draft and hand it to the portfolio store on commit.
//!
//! # Invariants
//! - Navigation never discards draft data.
//! - Only `Review` can commit; `Committed` is terminal until `restart`.

pub mod workflow;
