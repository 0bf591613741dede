//! Ontology Store — the accepted catalog of Skills and Roles.
//!
//! Single source of truth read by scoring. Mutated only by `store::apply_update`
//! (driven by approved moderation decisions) and the one-time seed.

pub mod handlers;
pub mod models;
pub mod seed;
pub mod store;
