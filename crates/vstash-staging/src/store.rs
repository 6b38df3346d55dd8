//! Staging store
//!
//! Durable local index of pending changes, safe under concurrent processes.
//!
//! Every mutating call takes, in order, the cross-process file lock and the
//! in-process mutex, then runs load → mutate → save. Both are released on
//! every exit path by their guards. Reads only take the mutex and may observe
//! a state that another process is about to replace.
//!
//! The backing file is deleted once the last entry is removed, so "file
//! absent" and "nothing staged" are the same thing.

use crate::entry::{Namespace, StagingEntry};
use crate::error::{StoreError, StoreResult};
use crate::lock::FileLock;
use crate::state::{NamespaceEntries, StagingState, SCHEMA_VERSION};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default directory name under the user's home
pub const DEFAULT_DIR_NAME: &str = ".vstash";

/// Default staging file name
pub const DEFAULT_FILE_NAME: &str = "stage.json";

/// Staged entries grouped by namespace
pub type StagedEntries = BTreeMap<Namespace, NamespaceEntries>;

/// Handle on one staging file
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl Store {
    /// Store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            guard: Mutex::new(()),
        }
    }

    /// Store at the default per-user location
    ///
    /// # Errors
    /// `StoreError::NoHomeDir` if the home directory is unknown
    pub fn open_default() -> StoreResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    /// `~/.vstash/stage.json`
    ///
    /// # Errors
    /// `StoreError::NoHomeDir` if the home directory is unknown
    pub fn default_path() -> StoreResult<PathBuf> {
        let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
        Ok(home.join(DEFAULT_DIR_NAME).join(DEFAULT_FILE_NAME))
    }

    /// Staging file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stage `entry`, replacing anything already staged for the key
    ///
    /// # Errors
    /// Lock, IO, or corrupt-file errors
    pub fn stage(&self, namespace: Namespace, name: &str, entry: StagingEntry) -> StoreResult<()> {
        self.mutate(|state| {
            let previous = state.namespace_mut(namespace).insert(name.to_string(), entry);
            tracing::debug!(%namespace, name, replaced = previous.is_some(), "staged");
            Ok(())
        })
    }

    /// Remove and return the entry for a key
    ///
    /// # Errors
    /// `StoreError::NotStaged` if nothing is staged for the key
    pub fn unstage(&self, namespace: Namespace, name: &str) -> StoreResult<StagingEntry> {
        self.mutate(|state| {
            let removed = state
                .namespace_mut(namespace)
                .remove(name)
                .ok_or_else(|| StoreError::not_staged(namespace, name))?;
            tracing::debug!(%namespace, name, "unstaged");
            Ok(removed)
        })
    }

    /// Remove every entry in `scope` (all namespaces when `None`)
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    /// Lock, IO, or corrupt-file errors
    pub fn unstage_all(&self, scope: Option<Namespace>) -> StoreResult<usize> {
        self.mutate(|state| {
            let mut removed = 0;
            for (ns, entries) in &mut state.by_service {
                if scope.map_or(true, |s| s == *ns) {
                    removed += entries.len();
                    entries.clear();
                }
            }
            tracing::debug!(?scope, removed, "unstaged all");
            Ok(removed)
        })
    }

    /// Entry staged for a key
    ///
    /// # Errors
    /// `StoreError::NotStaged` if nothing is staged for the key
    pub fn get(&self, namespace: Namespace, name: &str) -> StoreResult<StagingEntry> {
        self.read(|state| {
            state
                .namespace(namespace)
                .and_then(|entries| entries.get(name))
                .cloned()
                .ok_or_else(|| StoreError::not_staged(namespace, name))
        })?
    }

    /// Non-empty namespaces in `scope` with their entries
    ///
    /// # Errors
    /// IO or corrupt-file errors
    pub fn list(&self, scope: Option<Namespace>) -> StoreResult<StagedEntries> {
        self.read(|state| {
            state
                .by_service
                .iter()
                .filter(|(ns, entries)| scope.map_or(true, |s| s == **ns) && !entries.is_empty())
                .map(|(ns, entries)| (*ns, entries.clone()))
                .collect()
        })
    }

    /// Number of staged entries in `scope`
    ///
    /// # Errors
    /// IO or corrupt-file errors
    pub fn count(&self, scope: Option<Namespace>) -> StoreResult<usize> {
        self.read(|state| state.count(scope))
    }

    /// Whether anything is staged in `scope`
    ///
    /// # Errors
    /// IO or corrupt-file errors
    pub fn has_changes(&self, scope: Option<Namespace>) -> StoreResult<bool> {
        Ok(self.count(scope)? > 0)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut StagingState) -> StoreResult<T>) -> StoreResult<T> {
        let _file_lock = FileLock::acquire(&self.lock_path)?;
        let _guard = self.guard.lock();

        let mut state = self.load()?;
        let out = f(&mut state)?;
        self.save(&state)?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&StagingState) -> T) -> StoreResult<T> {
        let _guard = self.guard.lock();
        let state = self.load()?;
        Ok(f(&state))
    }

    fn load(&self) -> StoreResult<StagingState> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StagingState::new()),
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };

        let mut state: StagingState =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        if state.schema_version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                path: self.path.clone(),
                found: state.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        state.normalize();
        Ok(state)
    }

    fn save(&self, state: &StagingState) -> StoreResult<()> {
        if state.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::io_error(&self.path, e)),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io_error(parent, e))?;
        }

        let mut document = serde_json::to_vec_pretty(state).map_err(StoreError::Encode)?;
        document.push(b'\n');

        let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        write_private(&tmp_path, &document).map_err(|e| StoreError::io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io_error(&self.path, e))
    }
}

/// Write `bytes` to `path` readable by the owner only
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
