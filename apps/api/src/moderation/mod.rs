//! Moderation Queue — pending catalog proposals and the single state-machine
//! transition of the subsystem: pending → {approved, rejected}, both terminal.

pub mod handlers;
pub mod models;
pub mod queue;
