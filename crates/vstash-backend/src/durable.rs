//! Remotes whose state outlives the process

use crate::error::SnapshotError;
use std::fmt::Debug;
use vstash_staging::FileLock;

/// Remote state shared with other processes
///
/// Writers call [`Durable::lock`] first, change the backends, then
/// [`Durable::persist`] while still holding the returned lock.
pub trait Durable: Send + Sync + Debug {
    /// Take the cross-process lock and pick up state saved by others
    ///
    /// # Errors
    /// Lock or load failure
    fn lock(&self) -> Result<FileLock, SnapshotError>;

    /// Write the in-memory state out
    ///
    /// # Errors
    /// IO or encoding failure
    fn persist(&self) -> Result<(), SnapshotError>;
}
