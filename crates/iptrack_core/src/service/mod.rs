//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, clock and engine calls into use-case APIs.
//! - Keep the CLI and other front ends decoupled from storage details.

pub mod portfolio_service;
