//! Recursive directory traversal with ignore-pattern pruning.
//!
//! A [`Walker`] yields every file and directory below its root exactly once, depth-first
//! and pre-order. Entries matching the [`IgnoreSet`] are pruned together with their whole
//! subtree; the pruned entries are kept on the [`Walk`] so callers can report them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob_match::glob_match;
use tracing::debug;
use walkdir::WalkDir;

use crate::{ForkifyError, Result};

/// Path-fragment patterns excluded from traversal at any depth.
///
/// A pattern without `/` is matched against each component of the root-relative path
/// (`__pycache__`, `*.pyc`). A pattern containing `/` is matched as a glob against the
/// whole root-relative path (`build/generated`, `docs/**/tmp`). Exact relative paths can
/// be excluded with [`IgnoreSet::add_path`].
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    paths: Vec<PathBuf>,
}

impl IgnoreSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for pattern in patterns {
            set.add(pattern);
        }
        set
    }

    pub fn add(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        let pattern = pattern.trim_end_matches('/');
        if !pattern.is_empty() && !self.patterns.iter().any(|existing| existing == pattern) {
            self.patterns.push(pattern.to_string());
        }
    }

    /// Excludes one root-relative path and its subtree.
    pub fn add_path(&mut self, relative: impl Into<PathBuf>) {
        self.paths.push(relative.into());
    }

    pub fn extend(&mut self, other: &IgnoreSet) {
        for pattern in &other.patterns {
            self.add(pattern.as_str());
        }
        self.paths.extend(other.paths.iter().cloned());
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.paths.is_empty()
    }

    pub fn matches(&self, relative: &Path) -> bool {
        if self.paths.iter().any(|path| path == relative) {
            return true;
        }

        let components: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();

        self.patterns.iter().any(|pattern| {
            if pattern.contains('/') {
                glob_match(pattern, &components.join("/"))
            } else {
                components.iter().any(|component| glob_match(pattern, component))
            }
        })
    }
}

/// A file or directory discovered by a [`Walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    path: PathBuf,
    relative: PathBuf,
    is_dir: bool,
    is_symlink: bool,
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the walk root.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// The entry itself is a link; its target is never visited.
    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

pub struct Walker {
    root: PathBuf,
    ignore: IgnoreSet,
    sorted: bool,
}

impl Walker {
    pub fn new(root: &Path, ignore: IgnoreSet) -> Self {
        Self {
            root: root.to_path_buf(),
            ignore,
            sorted: false,
        }
    }

    /// Visit siblings in file-name order instead of the order the file system returns.
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Starts a lazy traversal.
    ///
    /// Fails with [`ForkifyError::Traversal`] when the root is missing, is not a directory
    /// or cannot be listed. Failures below the root are yielded as items instead.
    pub fn walk(&self) -> Result<Walk> {
        let metadata = fs::metadata(&self.root).map_err(|source| ForkifyError::Traversal {
            path: self.root.clone(),
            source,
        })?;

        if !metadata.is_dir() {
            return Err(ForkifyError::Traversal {
                path: self.root.clone(),
                source: io::Error::other("not a directory"),
            });
        }

        fs::read_dir(&self.root).map_err(|source| ForkifyError::Traversal {
            path: self.root.clone(),
            source,
        })?;

        let mut builder = WalkDir::new(&self.root).min_depth(1).follow_links(false);
        if self.sorted {
            builder = builder.sort_by_file_name();
        }

        debug!("Walking {:?} (ignoring {:?})", self.root, self.ignore.patterns());

        Ok(Walk {
            root: self.root.clone(),
            ignore: self.ignore.clone(),
            inner: builder.into_iter(),
            pruned: Vec::new(),
        })
    }
}

pub struct Walk {
    root: PathBuf,
    ignore: IgnoreSet,
    inner: walkdir::IntoIter,
    pruned: Vec<WalkEntry>,
}

impl Walk {
    /// Entries skipped so far because they matched the ignore set.
    pub fn pruned(&self) -> &[WalkEntry] {
        &self.pruned
    }

    pub fn into_pruned(self) -> Vec<WalkEntry> {
        self.pruned
    }
}

impl Iterator for Walk {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    return Some(Err(ForkifyError::Io {
                        path,
                        source: io::Error::from(err),
                    }));
                }
            };

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let is_dir = entry.file_type().is_dir();
            let is_symlink = entry.path_is_symlink();
            let walk_entry = WalkEntry {
                path: entry.into_path(),
                relative,
                is_dir,
                is_symlink,
            };

            if self.ignore.matches(&walk_entry.relative) {
                if is_dir {
                    self.inner.skip_current_dir();
                }
                debug!("Ignoring {:?}", walk_entry.path);
                self.pruned.push(walk_entry);
                continue;
            }

            return Some(Ok(walk_entry));
        }
    }
}
