//! Candidate Discovery Job — scans a market-signal batch and proposes catalog
//! changes (new skills, new roles, obsolescence reviews). Writes proposals to
//! the moderation queue only; it never mutates the live catalog.

pub mod analyze;
pub mod handlers;
pub mod job;
pub mod signal;
