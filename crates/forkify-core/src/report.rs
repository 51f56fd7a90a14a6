use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched the ignore set; for directories the whole subtree was skipped.
    Ignored,
    ExtensionMismatch,
    /// Contents are not valid UTF-8.
    NotText,
    /// Renaming left the path unchanged, so there was nothing to copy.
    SameDestination,
    /// Rejected during interactive review.
    Declined,
    /// Symbolic links are neither followed nor replaced.
    Symlink,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Ignored => "ignored",
            SkipReason::ExtensionMismatch => "extension not selected",
            SkipReason::NotText => "not a text file",
            SkipReason::SameDestination => "destination equals source",
            SkipReason::Declined => "declined",
            SkipReason::Symlink => "symbolic link",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Copied { destination: PathBuf },
    Rewritten,
    Unchanged,
    Removed,
    Restored,
    Skipped(SkipReason),
    Failed(String),
}

impl FileStatus {
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            FileStatus::Copied { .. } | FileStatus::Rewritten | FileStatus::Removed | FileStatus::Restored
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Copied { destination } => write!(f, "copied to {}", destination.display()),
            FileStatus::Rewritten => f.write_str("rewritten"),
            FileStatus::Unchanged => f.write_str("unchanged"),
            FileStatus::Removed => f.write_str("removed"),
            FileStatus::Restored => f.write_str("restored"),
            FileStatus::Skipped(reason) => write!(f, "skipped ({reason})"),
            FileStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Per-path outcomes of one operation, in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct Report {
    outcomes: Vec<FileOutcome>,
}

impl Report {
    pub fn record(&mut self, path: impl Into<PathBuf>, status: FileStatus) {
        self.outcomes.push(FileOutcome {
            path: path.into(),
            status,
        });
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// Most recent status recorded for `path`.
    pub fn status_of(&self, path: &Path) -> Option<&FileStatus> {
        self.outcomes
            .iter()
            .rev()
            .find(|outcome| outcome.path == path)
            .map(|outcome| &outcome.status)
    }

    pub fn files_processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn changed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.status.is_change()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, FileStatus::Skipped(_)))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, FileStatus::Failed(_)))
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}
