//! Match Scoring Engine — ranked, explainable role recommendations for an
//! input skill set. Read-only over the catalog snapshot.

pub mod extract;
pub mod handlers;
pub mod scoring;
