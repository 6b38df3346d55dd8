//! `vstash param|secret ...`

use crate::app::App;
use crate::console::Console;
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use std::io::Write;
use vstash_pipeline::{canonicalize_json, DiffOutcome};
use vstash_staging::{resolve_tag_ops, DeleteOptions, Namespace, StagingEntry, TagOp};
use vstash_version::{parse, resolve, sorted_history, VersionRecord};

/// Run a resource subcommand
///
/// # Errors
/// Parse, resolve, store, or write failures
pub async fn run<O: Write, E: Write>(
    app: &App,
    namespace: Namespace,
    args: &ArgMatches,
    console: &mut Console<O, E>,
) -> Result<()> {
    match args.subcommand() {
        Some(("show", args)) => show(app, namespace, args, console).await,
        Some(("log", args)) => log(app, namespace, args, console).await,
        Some(("diff", args)) => diff(app, namespace, args, console).await,
        Some(("add", args)) => stage_upsert(app, namespace, args, console, StagingEntry::create),
        Some(("update", args)) => stage_upsert(app, namespace, args, console, StagingEntry::update),
        Some(("delete", args)) => stage_delete(app, namespace, args, console),
        Some((other, _)) => bail!("unknown command {other}"),
        None => Ok(()),
    }
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument <{id}>"))
}

async fn show<O: Write, E: Write>(
    app: &App,
    namespace: Namespace,
    args: &ArgMatches,
    console: &mut Console<O, E>,
) -> Result<()> {
    let strategy = app.pipeline().strategy(namespace)?;
    let spec = parse(required(args, "spec")?, &strategy.grammar())?;
    let resolved = app
        .pipeline()
        .context()
        .run(async { Ok(resolve(&spec, strategy.reader()).await) })
        .await
        .with_context(|| format!("show {spec}"))??;

    console.line(format!("Version: {}", resolved.version))?;
    if !resolved.labels.is_empty() {
        console.line(format!("Labels:  {}", resolved.labels.join(", ")))?;
    }
    if let Some(created_at) = resolved.created_at {
        console.line(format!("Date:    {}", created_at.to_rfc3339()))?;
    }
    console.line("")?;

    let json = args.get_flag("json");
    match json.then(|| canonicalize_json(&resolved.value)).flatten() {
        Some(pretty) => console.line(pretty)?,
        None => {
            if json {
                console.warn(format!("{} is not valid JSON, showing raw value", resolved.name))?;
            }
            console.line(&resolved.value)?;
        }
    }
    Ok(())
}

async fn log<O: Write, E: Write>(
    app: &App,
    namespace: Namespace,
    args: &ArgMatches,
    console: &mut Console<O, E>,
) -> Result<()> {
    let strategy = app.pipeline().strategy(namespace)?;
    let name = required(args, "name")?;
    let history = app
        .pipeline()
        .context()
        .run(async { Ok(sorted_history(name, strategy.reader()).await) })
        .await
        .with_context(|| format!("log {name}"))??;

    let limit = args.get_one::<usize>("number").copied().unwrap_or(usize::MAX);
    for record in history.iter().take(limit) {
        console.line(log_header(record))?;
        for line in record.value.lines() {
            console.line(format!("    {line}"))?;
        }
    }
    Ok(())
}

fn log_header(record: &VersionRecord) -> String {
    let mut header = record.version.to_string();
    if let Some(created_at) = record.created_at {
        header.push_str("  ");
        header.push_str(&created_at.to_rfc3339());
    }
    if !record.labels.is_empty() {
        header.push_str(&format!("  [{}]", record.labels.join(", ")));
    }
    header
}

async fn diff<O: Write, E: Write>(
    app: &App,
    namespace: Namespace,
    args: &ArgMatches,
    console: &mut Console<O, E>,
) -> Result<()> {
    let pipeline = app
        .pipeline()
        .clone()
        .with_json(args.get_flag("json") || app.config().json_diff);
    let right = args.get_one::<String>("right").map(String::as_str);
    let diff = pipeline
        .diff_versions(namespace, required(args, "left")?, right)
        .await?;

    for warning in &diff.warnings {
        console.warn(warning)?;
    }
    if let DiffOutcome::Changed(rendered) = &diff.outcome {
        console.raw(&rendered.text)?;
    }
    Ok(())
}

/// Tag flags in command-line order
fn tag_ops(args: &ArgMatches) -> Result<Vec<TagOp>> {
    let mut ops = Vec::new();
    if let (Some(values), Some(indices)) = (args.get_many::<String>("tag"), args.indices_of("tag")) {
        for (index, raw) in indices.zip(values) {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("invalid tag '{raw}': expected KEY=VALUE"))?;
            if key.is_empty() {
                bail!("invalid tag '{raw}': empty key");
            }
            ops.push((index, TagOp::add(key, value)));
        }
    }
    if let (Some(values), Some(indices)) = (args.get_many::<String>("untag"), args.indices_of("untag")) {
        for (index, key) in indices.zip(values) {
            if key.is_empty() {
                bail!("invalid untag: empty key");
            }
            ops.push((index, TagOp::remove(key.as_str())));
        }
    }
    ops.sort_by_key(|(index, _)| *index);
    Ok(ops.into_iter().map(|(_, op)| op).collect())
}

fn stage_upsert<O: Write, E: Write>(
    app: &App,
    namespace: Namespace,
    args: &ArgMatches,
    console: &mut Console<O, E>,
    make: fn(String) -> StagingEntry,
) -> Result<()> {
    let name = required(args, "name")?;
    let value = required(args, "value")?;

    let (tags, conflicts) = resolve_tag_ops(&tag_ops(args)?);
    for conflict in &conflicts {
        console.warn(conflict)?;
    }

    let mut entry = make(value.to_string()).with_tags(tags);
    if let Some(description) = args.get_one::<String>("description") {
        entry = entry.with_description(description.as_str());
    }
    let operation = entry.operation;
    app.store().stage(namespace, name, entry)?;
    console.line(format!("Staged {operation}: {namespace} {name}"))
        .map_err(Into::into)
}

fn stage_delete<O: Write, E: Write>(
    app: &App,
    namespace: Namespace,
    args: &ArgMatches,
    console: &mut Console<O, E>,
) -> Result<()> {
    let name = required(args, "name")?;
    let force = args.get_flag("force");
    let window = args.get_one::<u32>("recovery-window").copied();

    let options = match namespace {
        Namespace::Secret if force => Some(DeleteOptions::force()),
        Namespace::Secret => window.map(DeleteOptions::recoverable),
        Namespace::Param => {
            if force || window.is_some() {
                console.warn("--force and --recovery-window only apply to secrets")?;
            }
            None
        }
    };

    app.store().stage(namespace, name, StagingEntry::delete(options))?;
    console.line(format!("Staged delete: {namespace} {name}"))
        .map_err(Into::into)
}
