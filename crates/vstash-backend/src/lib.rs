//! vstash Backends
//!
//! Capability traits the pipeline pushes through, plus in-memory parameter
//! and secret backends that can be persisted as a local JSON remote.
//!
//! # Core Concepts
//!
//! - [`Strategy`]: fetch current value, upsert, delete; one per namespace
//! - [`Tagger`]: tag access, used by upserts to apply tag changes
//! - [`Backends`]: namespace → strategy registry
//! - [`LocalRemote`]: both backends loaded from and saved to one file
//! - [`Durable`]: lock/persist hooks for remotes shared between processes

#![warn(unreachable_pub)]

mod clock;
pub mod durable;
pub mod error;
pub mod parameter;
pub mod registry;
pub mod remote;
pub mod secret;
pub mod strategy;

pub use durable::Durable;
pub use error::SnapshotError;
pub use parameter::{Parameter, ParameterRevision, ParameterStore, ParameterType};
pub use registry::Backends;
pub use remote::{LocalRemote, RemoteSnapshot};
pub use secret::{
    Secret, SecretRevision, SecretStore, DEFAULT_RECOVERY_WINDOW_DAYS, LABEL_CURRENT, LABEL_PREVIOUS,
    MAX_RECOVERY_WINDOW_DAYS, MIN_RECOVERY_WINDOW_DAYS,
};
pub use strategy::{apply_tag_change, PushMetadata, Strategy, Tagger, UpsertMode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
