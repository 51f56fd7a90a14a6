//! Record of every file forkify created or overwrote under a root, with backups of the
//! overwritten originals, so a migration can be undone with [`revert`].
//!
//! State lives in `<root>/.forkify/`: `manifest.json` plus one backup file per overwritten
//! path in `backup/`. The first entry recorded for a path wins, so reverting always goes
//! back to the state before the earliest recorded run.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::{FileStatus, Report};
use crate::rewriter::write_atomic;
use crate::{ForkifyError, Result};

pub const STATE_DIR: &str = ".forkify";
const MANIFEST_FILE: &str = "manifest.json";
const BACKUP_DIR: &str = "backup";
const MANIFEST_VERSION: u32 = 1;
const SAVE_INTERVAL: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ManifestEntry {
    CreatedDir { path: PathBuf },
    Created { path: PathBuf },
    Overwritten { path: PathBuf, backup: PathBuf },
}

impl ManifestEntry {
    /// Root-relative path, or absolute when the file lies outside the root.
    pub fn path(&self) -> &Path {
        match self {
            ManifestEntry::CreatedDir { path }
            | ManifestEntry::Created { path }
            | ManifestEntry::Overwritten { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub entries: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: Vec::new(),
        }
    }
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(MANIFEST_FILE)
}

fn backup_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(BACKUP_DIR)
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path).map_err(|source| ForkifyError::io(path, source))?;
    serde_json::from_str(&content).map_err(|source| ForkifyError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

/// Appends to the manifest of one root.
///
/// Backups are written as soon as an entry is recorded. The manifest itself is saved every
/// few hundred entries, on [`Journal::flush`] and, as a last resort, when the journal is
/// dropped.
pub struct Journal {
    root: PathBuf,
    manifest: Manifest,
    tracked: HashSet<PathBuf>,
    unsaved: usize,
}

impl Journal {
    pub fn open(root: &Path) -> Result<Self> {
        let path = manifest_path(root);
        let manifest = if path.exists() {
            load_manifest(&path)?
        } else {
            Manifest::default()
        };
        let tracked = manifest.entries.iter().map(|entry| entry.path().to_path_buf()).collect();

        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            tracked,
            unsaved: 0,
        })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.manifest.entries
    }

    /// Records a directory about to be created. The journal root itself is never recorded,
    /// since it holds the state directory.
    pub fn record_dir(&mut self, dir: &Path) -> Result<()> {
        let stored = self.stored_path(dir);
        if stored.as_os_str().is_empty() || self.tracked.contains(&stored) {
            return Ok(());
        }
        self.push(ManifestEntry::CreatedDir { path: stored })
    }

    /// Records a file about to be written, backing up its current contents if it exists.
    pub fn record_write(&mut self, path: &Path) -> Result<()> {
        let stored = self.stored_path(path);
        if self.tracked.contains(&stored) {
            debug!("Already tracked: {:?}", stored);
            return Ok(());
        }

        let entry = if path.is_file() {
            let backup = PathBuf::from(format!("{:06}", self.manifest.entries.len()));
            let backup_dir = backup_dir(&self.root);
            fs::create_dir_all(&backup_dir).map_err(|source| ForkifyError::io(&backup_dir, source))?;
            fs::copy(path, backup_dir.join(&backup)).map_err(|source| ForkifyError::io(path, source))?;
            ManifestEntry::Overwritten { path: stored, backup }
        } else {
            ManifestEntry::Created { path: stored }
        };

        self.push(entry)
    }

    /// Saves any entries recorded since the last save.
    pub fn flush(&mut self) -> Result<()> {
        if self.unsaved == 0 {
            return Ok(());
        }
        self.save()?;
        self.unsaved = 0;
        Ok(())
    }

    fn push(&mut self, entry: ManifestEntry) -> Result<()> {
        self.tracked.insert(entry.path().to_path_buf());
        self.manifest.entries.push(entry);
        self.unsaved += 1;
        if self.unsaved >= SAVE_INTERVAL {
            self.flush()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let state_dir = self.root.join(STATE_DIR);
        fs::create_dir_all(&state_dir).map_err(|source| ForkifyError::io(&state_dir, source))?;

        let path = manifest_path(&self.root);
        let content = serde_json::to_vec_pretty(&self.manifest).map_err(|source| ForkifyError::Manifest {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &content).map_err(|source| ForkifyError::io(&path, source))
    }

    fn stored_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!("Failed to save manifest under {:?}: {}", self.root, err);
        }
    }
}

/// Undoes every recorded change under `root`, newest first, then removes the state
/// directory if nothing failed.
pub fn revert(root: &Path, dry_run: bool) -> Result<Report> {
    let path = manifest_path(root);
    if !path.is_file() {
        return Err(ForkifyError::NoManifest { path });
    }

    let journal = Journal::open(root)?;
    let backups = backup_dir(root);
    let mut report = Report::default();

    info!("Reverting {} recorded changes under {:?}", journal.entries().len(), root);

    for entry in journal.entries().iter().rev() {
        let target = root.join(entry.path());

        let status = if dry_run {
            info!("Would revert: {:?}", target);
            match entry {
                ManifestEntry::Overwritten { .. } => FileStatus::Restored,
                ManifestEntry::Created { .. } | ManifestEntry::CreatedDir { .. } => FileStatus::Removed,
            }
        } else {
            match revert_entry(entry, &target, &backups) {
                Ok(status) => status,
                Err(err) => {
                    warn!("Failed to revert {:?}: {}", target, err);
                    FileStatus::Failed(err.to_string())
                }
            }
        };

        report.record(target, status);
    }

    if !dry_run && !report.has_failures() {
        let state_dir = root.join(STATE_DIR);
        fs::remove_dir_all(&state_dir).map_err(|source| ForkifyError::io(&state_dir, source))?;
        info!("Removed {:?}", state_dir);
    }

    Ok(report)
}

fn revert_entry(entry: &ManifestEntry, target: &Path, backups: &Path) -> Result<FileStatus> {
    let removed = match entry {
        ManifestEntry::Created { .. } => fs::remove_file(target),
        ManifestEntry::CreatedDir { .. } => fs::remove_dir(target),
        ManifestEntry::Overwritten { backup, .. } => {
            let backup = backups.join(backup);
            let original = fs::read(&backup).map_err(|source| ForkifyError::io(&backup, source))?;
            write_atomic(target, &original).map_err(|source| ForkifyError::io(target, source))?;
            info!("Restored {:?}", target);
            return Ok(FileStatus::Restored);
        }
    };

    match removed {
        Ok(()) => {
            info!("Removed {:?}", target);
            Ok(FileStatus::Removed)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(FileStatus::Unchanged),
        Err(source) => Err(ForkifyError::io(target, source)),
    }
}
