//! CLI configuration
//!
//! Read from `~/.vstash/config.toml` (or `$VSTASH_CONFIG`); a missing file
//! means defaults. `VSTASH_STAGE_FILE` and `VSTASH_REMOTE_FILE` override the
//! file locations given in the file. Without a home directory every path
//! must come from the environment or the file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vstash_pipeline::DEFAULT_MAX_CONCURRENCY;

/// Directory under the home directory holding all vstash files
pub const APP_DIR: &str = ".vstash";

/// Config file path override
pub const ENV_CONFIG: &str = "VSTASH_CONFIG";
/// Staging file path override
pub const ENV_STAGE_FILE: &str = "VSTASH_STAGE_FILE";
/// Remote snapshot path override
pub const ENV_REMOTE_FILE: &str = "VSTASH_REMOTE_FILE";

/// Default backend deadline in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Staging file
    pub stage_file: PathBuf,
    /// Local remote snapshot
    pub remote_file: PathBuf,
    /// Ceiling on simultaneous backend calls in bulk diffs
    pub max_concurrency: usize,
    /// Deadline for one command's backend calls; 0 disables it
    pub timeout_secs: u64,
    /// Compare values as JSON by default
    pub json_diff: bool,
}

/// Contents of the config file; absent keys take defaults
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    stage_file: Option<PathBuf>,
    remote_file: Option<PathBuf>,
    max_concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    json_diff: Option<bool>,
}

impl FileConfig {
    /// Read `path`; a missing file is empty
    fn read(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read config file {}", path.display())),
        }
    }
}

fn no_home(var: &str) -> anyhow::Error {
    anyhow!("cannot find the home directory for ~/{APP_DIR}; set {var}")
}

impl Config {
    /// Defaults with every file under `dir`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            stage_file: dir.join("stage.json"),
            remote_file: dir.join("remote.json"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            json_diff: false,
        }
    }

    /// Load from the default location, then apply environment overrides
    ///
    /// # Errors
    /// Unreadable or malformed config file, or no home directory to put a
    /// file the environment does not name
    pub fn load() -> Result<Self> {
        Self::load_with(dirs::home_dir().as_deref(), |key| {
            std::env::var_os(key).map(PathBuf::from)
        })
    }

    /// Load with `home` as the home directory and `lookup` as the environment
    ///
    /// Paths come from the environment first, then the config file, then
    /// `~/.vstash`.
    ///
    /// # Errors
    /// Unreadable or malformed config file, or a path that needs `home` when
    /// there is none
    pub fn load_with(home: Option<&Path>, lookup: impl Fn(&str) -> Option<PathBuf>) -> Result<Self> {
        let app_dir = home.map(|home| home.join(APP_DIR));
        let in_app_dir = |var: &str, file_name: &str| {
            app_dir
                .as_ref()
                .map(|dir| dir.join(file_name))
                .ok_or_else(|| no_home(var))
        };

        let path = match lookup(ENV_CONFIG) {
            Some(path) => path,
            None => in_app_dir(ENV_CONFIG, "config.toml")?,
        };
        let file = FileConfig::read(&path)?;

        let stage_file = match lookup(ENV_STAGE_FILE).or(file.stage_file) {
            Some(path) => path,
            None => in_app_dir(ENV_STAGE_FILE, "stage.json")?,
        };
        let remote_file = match lookup(ENV_REMOTE_FILE).or(file.remote_file) {
            Some(path) => path,
            None => in_app_dir(ENV_REMOTE_FILE, "remote.json")?,
        };
        tracing::debug!(config = %path.display(), "config loaded");

        Ok(Self {
            stage_file,
            remote_file,
            max_concurrency: file.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            json_diff: file.json_diff.unwrap_or_default(),
        })
    }

    /// With staging file
    #[inline]
    #[must_use]
    pub fn with_stage_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stage_file = path.into();
        self
    }

    /// With remote snapshot file
    #[inline]
    #[must_use]
    pub fn with_remote_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.remote_file = path.into();
        self
    }

    /// With fan-out ceiling
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// With deadline in seconds
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// With JSON comparison default
    #[inline]
    #[must_use]
    pub fn with_json_diff(mut self, json: bool) -> Self {
        self.json_diff = json;
        self
    }

    /// Deadline, `None` when disabled
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
