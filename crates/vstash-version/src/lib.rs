//! vstash Version Language
//!
//! Compact, git-inspired addressing of versioned resources.
//!
//! # Core Concepts
//!
//! - [`VersionSpec`]: name + optional absolute pin + cumulative shift
//! - [`AbsoluteIdentifier`]: ordinal number, opaque id, or movable label
//! - [`BackendGrammar`]: which marker characters a backend understands
//! - [`parse`]: text → `VersionSpec`
//! - [`resolve`]: `VersionSpec` + [`VersionedResourceReader`] → [`ResolvedVersion`]
//!
//! # Example
//!
//! ```rust,ignore
//! use vstash_version::{parse, resolve, BackendGrammar};
//!
//! let spec = parse("/app/db/url#3~1", &BackendGrammar::parameter())?;
//! let resolved = resolve(&spec, &reader).await?;
//! println!("{} {}", resolved.version, resolved.value);
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod grammar;
pub mod parser;
pub mod reader;
pub mod resolver;
pub mod spec;

pub use error::{BackendError, ParseError, ResolveError};
pub use grammar::{BackendGrammar, IdKind};
pub use parser::parse;
pub use reader::{PointLookup, RecordVersion, VersionRecord, VersionedResourceReader};
pub use resolver::{resolve, sort_newest_first, sorted_history, ResolvedVersion};
pub use spec::{AbsoluteIdentifier, VersionSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
