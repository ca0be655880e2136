//! Query and filter entry points.
//!
//! # Responsibility
//! - Select and order assets and notifications from an in-memory snapshot.
//! - Keep result shaping inside core so every caller filters the same way.

pub mod filter;
