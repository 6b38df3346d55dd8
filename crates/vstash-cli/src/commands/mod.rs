//! Command implementations

pub mod resource;
pub mod stage;

use crate::console::Console;
use anyhow::Result;
use clap::ArgMatches;
use std::io::Write;
use vstash_pipeline::PipelineError;
use vstash_staging::{Namespace, StoreError};

/// Turn recoverable failures into warnings
///
/// # Errors
/// `result`'s error if it is not recoverable, or a write failure
pub fn recover<O: Write, E: Write>(result: Result<()>, console: &mut Console<O, E>) -> Result<()> {
    match result {
        Err(e) if is_recoverable(&e) => {
            console.warn(&e)?;
            Ok(())
        }
        other => other,
    }
}

fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PipelineError>()
        .is_some_and(PipelineError::is_recoverable)
        || err
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::is_not_staged)
}

/// Namespace selected by `--param` / `--secret`
pub(crate) fn scope(args: &ArgMatches) -> Option<Namespace> {
    if args.get_flag("param") {
        Some(Namespace::Param)
    } else if args.get_flag("secret") {
        Some(Namespace::Secret)
    } else {
        None
    }
}
