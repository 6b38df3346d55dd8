//! `vstash stage ...`

use super::scope;
use crate::app::App;
use crate::console::Console;
use anyhow::{bail, Result};
use clap::ArgMatches;
use std::io::Write;
use vstash_pipeline::DiffReport;
use vstash_staging::{Namespace, StoreError};

/// Run a stage subcommand
///
/// # Errors
/// Store, pipeline, or write failures
pub async fn run<O: Write, E: Write>(app: &App, args: &ArgMatches, console: &mut Console<O, E>) -> Result<()> {
    match args.subcommand() {
        Some(("status", args)) => status(app, args, console),
        Some(("diff", args)) => diff(app, args, console).await,
        Some(("push", args)) => push(app, args, console).await,
        Some(("reset", args)) => reset(app, args, console),
        Some((other, _)) => bail!("unknown command {other}"),
        None => Ok(()),
    }
}

/// Namespace holding the named entry
///
/// With no scope flag, the entry must be staged in exactly one namespace.
fn locate(app: &App, name: &str, scope: Option<Namespace>) -> Result<Namespace> {
    if let Some(namespace) = scope {
        return Ok(namespace);
    }
    let mut found = Vec::new();
    for namespace in Namespace::ALL {
        match app.store().get(namespace, name) {
            Ok(_) => found.push(namespace),
            Err(e) if e.is_not_staged() => {}
            Err(e) => return Err(e.into()),
        }
    }
    match found.as_slice() {
        [] => Err(StoreError::not_staged(Namespace::Param, name).into()),
        [namespace] => Ok(*namespace),
        _ => bail!("{name} is staged as both param and secret; pass --param or --secret"),
    }
}

fn status<O: Write, E: Write>(app: &App, args: &ArgMatches, console: &mut Console<O, E>) -> Result<()> {
    let scope = scope(args);
    if let Some(name) = args.get_one::<String>("name") {
        let namespace = locate(app, name, scope)?;
        let entry = app.store().get(namespace, name)?;
        console.line(format!("{:<7} {namespace} {name}", entry.operation))?;
        if let Some(description) = &entry.description {
            console.line(format!("        description: {description}"))?;
        }
        for (key, value) in &entry.tags {
            console.line(format!("        tag: {key}={value}"))?;
        }
        for key in &entry.untag_keys {
            console.line(format!("        untag: {key}"))?;
        }
        return Ok(());
    }

    let staged = app.store().list(scope)?;
    if staged.is_empty() {
        return console.line("No changes staged.").map_err(Into::into);
    }
    for (namespace, entries) in staged {
        for (name, entry) in entries {
            console.line(format!("{:<7} {namespace} {name}", entry.operation))?;
        }
    }
    Ok(())
}

fn print_report<O: Write, E: Write>(report: &DiffReport, console: &mut Console<O, E>) -> Result<()> {
    for warning in &report.warnings {
        console.warn(warning)?;
    }
    for item in &report.diffs {
        if let Some(rendered) = item.outcome.rendered() {
            console.raw(&rendered.text)?;
        } else {
            console.line(format!("{}: identical to the remote", item.key))?;
        }
    }
    Ok(())
}

async fn diff<O: Write, E: Write>(app: &App, args: &ArgMatches, console: &mut Console<O, E>) -> Result<()> {
    let pipeline = app
        .pipeline()
        .clone()
        .with_json(args.get_flag("json") || app.config().json_diff);
    let scope = scope(args);

    let mut report = match args.get_one::<String>("name") {
        Some(name) => {
            let namespace = locate(app, name, scope)?;
            pipeline.diff_one(namespace, name).await?
        }
        None => pipeline.diff_all(scope).await?,
    };
    print_report(&report, console)?;
    match report.take_error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn push<O: Write, E: Write>(app: &App, args: &ArgMatches, console: &mut Console<O, E>) -> Result<()> {
    let scope = scope(args);

    if let Some(name) = args.get_one::<String>("name") {
        let namespace = locate(app, name, scope)?;
        let operation = app.pipeline().push(namespace, name).await?;
        return console
            .line(format!("Pushed {operation}: {namespace} {name}"))
            .map_err(Into::into);
    }

    let summary = app.pipeline().push_all(scope).await?;
    if summary.total() == 0 {
        return console.line("No changes staged.").map_err(Into::into);
    }
    for (key, operation) in &summary.pushed {
        console.line(format!("Pushed {operation}: {key}"))?;
    }
    for failure in &summary.failed {
        console.line(format!("Failed: {}: {}", failure.key, failure.error))?;
    }
    match summary.error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn reset<O: Write, E: Write>(app: &App, args: &ArgMatches, console: &mut Console<O, E>) -> Result<()> {
    let scope = scope(args);
    match args.get_one::<String>("name") {
        Some(name) => {
            let namespace = locate(app, name, scope)?;
            app.store().unstage(namespace, name)?;
            console.line(format!("Unstaged {namespace} {name}"))?;
        }
        None => {
            let removed = app.store().unstage_all(scope)?;
            console.line(format!("Unstaged {removed} change(s)"))?;
        }
    }
    Ok(())
}
