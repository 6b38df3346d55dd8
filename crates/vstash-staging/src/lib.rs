//! vstash Staging Store
//!
//! Local, file-backed index of pending changes ("staged" intents) for
//! versioned resources, grouped by namespace.
//!
//! # Core Concepts
//!
//! - [`StagingEntry`]: one create/update/delete intent
//! - [`Store`]: load → mutate → save under a cross-process lock
//! - [`resolve_tag_ops`]: ordered tag flags → net [`TagChange`]
//!
//! # Example
//!
//! ```rust,ignore
//! use vstash_staging::{Namespace, StagingEntry, Store};
//!
//! let store = Store::open_default()?;
//! store.stage(Namespace::Param, "/app/db/url", StagingEntry::update("postgres://..."))?;
//! assert!(store.has_changes(None)?);
//! ```

#![warn(unreachable_pub)]

pub mod entry;
pub mod error;
pub mod lock;
pub mod state;
pub mod store;
pub mod tags;

pub use entry::{DeleteOptions, Namespace, Operation, StagingEntry};
pub use error::{StoreError, StoreResult};
pub use lock::FileLock;
pub use state::{NamespaceEntries, StagingState, SCHEMA_VERSION};
pub use store::{StagedEntries, Store};
pub use tags::{resolve_tag_ops, TagChange, TagConflict, TagOp};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
