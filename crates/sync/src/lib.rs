//! Replays client transaction logs against the persisted tree.

pub mod replay;

pub use replay::{ReplayError, ReplayOutcome, TransactionReplayer};
