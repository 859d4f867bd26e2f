//! Service layer: multi-record workflows over the repositories.
//!
//! # Responsibility
//! - Compose repository helpers into single-transaction workflows that
//!   keep derived records (personal bests, leaderboards, unread counters)
//!   consistent with the rows they are derived from.
//!
//! # Invariants
//! - Every workflow commits atomically and notifies live queries exactly
//!   once, after the commit.

pub mod message_service;
pub mod ranking;
pub mod result_service;
