//! Core traits for ledger persistence
//!
//! The ledger talks to its storage only through [`SnapshotStore`], so the
//! file-backed store used in production and the in-memory store used with
//! `--ephemeral` (and in tests) are interchangeable.

use crate::types::{AccountBalance, LedgerError};

/// Trait for loading and saving full ledger snapshots
///
/// A snapshot is the complete account → balance mapping, sorted by account
/// id. It is rewritten wholesale on every save.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot
    ///
    /// Returns `Ok(None)` when nothing has been saved yet (first run).
    fn load(&self) -> Result<Option<Vec<AccountBalance>>, LedgerError>;

    /// Replace the stored snapshot
    ///
    /// Called by the ledger from inside its critical section, so calls never
    /// overlap.
    fn save(&self, snapshot: &[AccountBalance]) -> Result<(), LedgerError>;
}
