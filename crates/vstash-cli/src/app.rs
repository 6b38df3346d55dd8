//! Wiring: configuration → store, local remote, pipeline

use crate::commands;
use crate::config::Config;
use crate::console::Console;
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::io::Write;
use std::sync::Arc;
use vstash_backend::{Durable, LocalRemote};
use vstash_pipeline::{Pipeline, RunContext};
use vstash_staging::Store;

/// Everything one invocation works with
#[derive(Debug)]
pub struct App {
    config: Config,
    store: Arc<Store>,
    remote: Arc<LocalRemote>,
    pipeline: Pipeline,
}

impl App {
    /// Open the staging store and local remote named by `config`
    ///
    /// # Errors
    /// Unreadable remote snapshot
    pub fn open(config: Config, ctx: RunContext) -> Result<Self> {
        let store = Arc::new(Store::new(&config.stage_file));
        let remote = LocalRemote::open(&config.remote_file)
            .map(Arc::new)
            .with_context(|| format!("cannot open remote {}", config.remote_file.display()))?;
        let pipeline = Pipeline::new(Arc::clone(&store), remote.backends())
            .with_durable(Arc::clone(&remote) as Arc<dyn Durable>)
            .with_context(ctx)
            .with_max_concurrency(config.max_concurrency)
            .with_json(config.json_diff);
        tracing::debug!(
            stage = %config.stage_file.display(),
            remote = %config.remote_file.display(),
            "app opened"
        );
        Ok(Self {
            config,
            store,
            remote,
            pipeline,
        })
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Staging store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Local remote
    #[inline]
    #[must_use]
    pub fn remote(&self) -> &LocalRemote {
        &self.remote
    }

    /// Pipeline
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the command in `matches`
    ///
    /// Recoverable conditions are printed as warnings and are not errors.
    ///
    /// # Errors
    /// Any other failure of the command
    pub async fn dispatch<O: Write, E: Write>(
        &self,
        matches: &ArgMatches,
        console: &mut Console<O, E>,
    ) -> Result<()> {
        let result = match matches.subcommand() {
            Some(("stage", args)) => commands::stage::run(self, args, console).await,
            Some((resource, args)) => {
                let namespace = resource
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
                commands::resource::run(self, namespace, args, console).await
            }
            None => Ok(()),
        };
        commands::recover(result, console)
    }
}
