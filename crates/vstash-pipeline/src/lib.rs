//! vstash Diff/Push Pipeline
//!
//! Compares staged entries with live remote values and commits them.
//!
//! # Core Concepts
//!
//! - [`Pipeline`]: `diff_one`, `diff_all`, `diff_versions`, `push`, `push_all`
//! - [`RunContext`]: one deadline and cancellation signal per run
//! - [`Comparison`]: optional JSON canonicalisation and unified diff output
//! - [`Warning`]: recoverable conditions, logged and returned as data
//!
//! # Example
//!
//! ```rust,ignore
//! use vstash_pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(store, backends).with_json(true);
//! let report = pipeline.diff_all(None).await?;
//! for item in &report.diffs {
//!     if let Some(diff) = item.outcome.rendered() {
//!         print!("{}", diff.text);
//!     }
//! }
//! ```

#![warn(unreachable_pub)]

pub mod context;
pub mod diff;
pub mod error;
pub mod fanout;
pub mod key;
pub mod pipeline;
pub mod report;
pub mod warning;

pub use context::{CancelHandle, RunContext};
pub use diff::{canonicalize_json, unified_diff, Comparison, RenderedDiff};
pub use error::{PipelineError, PipelineResult};
pub use fanout::{fetch_current_all, DEFAULT_MAX_CONCURRENCY};
pub use key::StagedKey;
pub use pipeline::Pipeline;
pub use report::{DiffOutcome, DiffReport, FetchFailure, ItemDiff, PushFailure, PushSummary, VersionDiff};
pub use warning::{Side, Warning};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
