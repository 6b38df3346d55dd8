//! Local remote
//!
//! Both in-memory backends persisted together as one JSON snapshot, so the
//! tool works end-to-end without a hosted service.
//!
//! Several processes may share one snapshot file. Writers take the
//! `<file>.lock` lock, reload the file, change the backends, and save
//! before releasing it; saves replace the file by rename.

use crate::durable::Durable;
use crate::error::SnapshotError;
use crate::parameter::{Parameter, ParameterStore};
use crate::registry::Backends;
use crate::secret::{Secret, SecretStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vstash_staging::FileLock;

/// Serialized form of both backends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// Parameters by name
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    /// Secrets by name
    #[serde(default)]
    pub secrets: BTreeMap<String, Secret>,
}

/// Parameter and secret backends backed by a snapshot file
#[derive(Debug)]
pub struct LocalRemote {
    path: PathBuf,
    lock_path: PathBuf,
    parameters: Arc<ParameterStore>,
    secrets: Arc<SecretStore>,
}

impl LocalRemote {
    /// Load the snapshot at `path`; a missing file is an empty remote
    ///
    /// # Errors
    /// IO errors or a corrupt snapshot
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let snapshot = read_snapshot(&path)?;
        Ok(Self::from_snapshot(path, snapshot))
    }

    /// Remote holding `snapshot`, saved to `path`
    #[must_use]
    pub fn from_snapshot(path: impl Into<PathBuf>, snapshot: RemoteSnapshot) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            parameters: Arc::new(ParameterStore::from_parameters(snapshot.parameters)),
            secrets: Arc::new(SecretStore::from_secrets(snapshot.secrets)),
        }
    }

    /// Snapshot path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parameter backend
    #[must_use]
    pub fn parameters(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.parameters)
    }

    /// Secret backend
    #[must_use]
    pub fn secrets(&self) -> Arc<SecretStore> {
        Arc::clone(&self.secrets)
    }

    /// Registry with both backends
    #[must_use]
    pub fn backends(&self) -> Backends {
        Backends::new().with(self.parameters()).with(self.secrets())
    }

    /// Current contents of both backends
    #[must_use]
    pub fn snapshot(&self) -> RemoteSnapshot {
        RemoteSnapshot {
            parameters: self.parameters.snapshot(),
            secrets: self.secrets.snapshot(),
        }
    }

    /// Replace the in-memory contents with what is on disk now
    ///
    /// # Errors
    /// IO errors or a corrupt snapshot
    pub fn reload(&self) -> Result<(), SnapshotError> {
        let snapshot = read_snapshot(&self.path)?;
        self.parameters.replace(snapshot.parameters);
        self.secrets.replace(snapshot.secrets);
        Ok(())
    }

    /// Write the current contents back to the snapshot file
    ///
    /// The file is replaced by rename, so readers never see a partial
    /// document. Hold [`LocalRemote::lock`] when other processes may write.
    ///
    /// # Errors
    /// IO or encoding errors
    pub fn save(&self) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::io_error(parent, e))?;
        }
        let document = serde_json::to_vec_pretty(&self.snapshot()).map_err(SnapshotError::Encode)?;

        let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        write_private(&tmp_path, &document).map_err(|e| SnapshotError::io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| SnapshotError::io_error(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "remote saved");
        Ok(())
    }

    /// Take the cross-process lock and reload, so changes made under the
    /// returned guard start from the latest saved state
    ///
    /// # Errors
    /// Lock failure, IO errors, or a corrupt snapshot
    pub fn lock(&self) -> Result<FileLock, SnapshotError> {
        let lock = FileLock::acquire(&self.lock_path)?;
        self.reload()?;
        Ok(lock)
    }
}

impl Durable for LocalRemote {
    fn lock(&self) -> Result<FileLock, SnapshotError> {
        LocalRemote::lock(self)
    }

    fn persist(&self) -> Result<(), SnapshotError> {
        self.save()
    }
}

fn read_snapshot(path: &Path) -> Result<RemoteSnapshot, SnapshotError> {
    let snapshot: RemoteSnapshot = match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => RemoteSnapshot::default(),
        Err(e) => return Err(SnapshotError::io_error(path, e)),
    };
    tracing::debug!(
        path = %path.display(),
        parameters = snapshot.parameters.len(),
        secrets = snapshot.secrets.len(),
        "remote loaded"
    );
    Ok(snapshot)
}

/// Snapshots hold secret values; keep them owner-only
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
    file.sync_all()
}
