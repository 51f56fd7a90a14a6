use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub mod config;
pub mod manifest;
pub mod report;
pub mod review;
pub mod rewriter;
pub mod rules;
pub mod walker;

pub use config::RuleTable;
pub use manifest::{revert, Journal, ManifestEntry, STATE_DIR};
pub use report::{FileOutcome, FileStatus, Report, SkipReason};
pub use review::{AcceptAll, Reviewer};
pub use rewriter::{write_atomic, ContentRewriter, ExtensionFilter, LineEnding};
pub use rules::{MatchMode, RenameRule, RuleScope, RuleSet};
pub use walker::{IgnoreSet, WalkEntry, Walker};

#[derive(thiserror::Error, Debug)]
pub enum ForkifyError {
    #[error("Cannot traverse {path:?}: {source}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid rule '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },
    #[error("Rule application failed: {message}")]
    RuleApplication { message: String },
    #[error("Invalid rule table {path:?}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("Failed to parse rule table {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Corrupt manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Nothing to revert: no manifest at {path:?}")]
    NoManifest { path: PathBuf },
    #[error("Aborted: {reason}")]
    Aborted { reason: String },
}

impl ForkifyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForkifyError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForkifyError>;

#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Root of an independent output tree; `None` copies beside the originals.
    pub output: Option<PathBuf>,
    pub ignore: IgnoreSet,
    pub dry_run: bool,
    pub backup: bool,
    pub sorted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub extensions: ExtensionFilter,
    pub line_ending: Option<LineEnding>,
    pub ignore: IgnoreSet,
    pub dry_run: bool,
    pub backup: bool,
    pub sorted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub ignore: IgnoreSet,
    pub dry_run: bool,
    pub sorted: bool,
}

/// Copies every file under `root` to the path the rules rename it to.
///
/// Without an output directory the copies land beside the originals and files whose path
/// no rule changes are skipped. With one, every file is copied into it, producing a full
/// independent tree, and the manifest is kept there so the source tree is left untouched.
/// Contents are copied byte for byte; use [`rewrite_content`] afterwards.
pub fn copy_rename(
    root: &Path,
    rules: &RuleSet,
    options: &CopyOptions,
    reviewer: &dyn Reviewer,
) -> Result<Report> {
    info!("Starting copy-rename: {:?}", root);

    let mut ignore = options.ignore.clone();
    ignore.add(STATE_DIR);

    let output = options.output.as_deref().filter(|output| *output != root);
    if let Some(output) = output {
        if let Ok(relative) = output.strip_prefix(root) {
            debug!("Excluding output directory from the walk: {:?}", relative);
            ignore.add_path(relative);
        }
    }
    let destination_root = output.unwrap_or(root);

    let mut walk = Walker::new(root, ignore).sorted(options.sorted).walk()?;
    let mut report = Report::default();

    // Plan every copy before writing, so new files never feed back into the walk
    let mut plan: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    for entry in &mut walk {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                record_walk_error(&mut report, err);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        if entry.is_symlink() {
            debug!("Not copying symbolic link: {:?}", entry.path());
            report.record(entry.into_path(), FileStatus::Skipped(SkipReason::Symlink));
            continue;
        }

        let renamed = rules.rename_path(entry.relative());
        if output.is_none() && renamed == entry.relative() {
            debug!("No rename for: {:?}", entry.path());
            report.record(entry.into_path(), FileStatus::Skipped(SkipReason::SameDestination));
            continue;
        }

        let destination = destination_root.join(&renamed);
        if let Some(previous) = claimed.insert(destination.clone(), entry.path().to_path_buf()) {
            warn!(
                "{:?} and {:?} both map to {:?}; the latter wins",
                previous,
                entry.path(),
                destination
            );
        }
        plan.push((entry.into_path(), destination));
    }

    for pruned in walk.pruned() {
        report.record(pruned.path(), FileStatus::Skipped(SkipReason::Ignored));
    }

    let mut journal = open_journal(destination_root, options.dry_run, options.backup)?;

    for (source, destination) in plan {
        if !reviewer.review_copy(&source, &destination)? {
            report.record(source, FileStatus::Skipped(SkipReason::Declined));
            continue;
        }

        if options.dry_run {
            info!("Would copy: {:?} -> {:?}", source, destination);
        } else if let Err(err) = copy_file(&source, &destination, &mut journal) {
            warn!("Failed to copy {:?}: {}", source, err);
            report.record(source, FileStatus::Failed(err.to_string()));
            continue;
        } else {
            info!("Copied: {:?} -> {:?}", source, destination);
        }
        report.record(source, FileStatus::Copied { destination });
    }

    flush_journal(&mut journal)?;

    info!(
        "Copy-rename complete: {} files processed, {} copied, {} failed",
        report.files_processed(),
        report.changed(),
        report.failed()
    );

    Ok(report)
}

/// Applies the content rules, in place, to every file under `root` whose extension is
/// selected. Each file is replaced atomically; unselected files are never opened.
pub fn rewrite_content(
    root: &Path,
    rules: &RuleSet,
    options: &RewriteOptions,
    reviewer: &dyn Reviewer,
) -> Result<Report> {
    info!("Starting content rewrite: {:?}", root);

    let mut ignore = options.ignore.clone();
    ignore.add(STATE_DIR);

    let rewriter = ContentRewriter::new(rules, options.line_ending);
    let mut walk = Walker::new(root, ignore).sorted(options.sorted).walk()?;
    let mut journal = open_journal(root, options.dry_run, options.backup)?;
    let mut report = Report::default();

    for entry in &mut walk {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                record_walk_error(&mut report, err);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        if entry.is_symlink() {
            debug!("Not rewriting symbolic link: {:?}", entry.path());
            report.record(entry.into_path(), FileStatus::Skipped(SkipReason::Symlink));
            continue;
        }

        if !options.extensions.allows(entry.path()) {
            debug!("Extension not selected: {:?}", entry.path());
            report.record(entry.into_path(), FileStatus::Skipped(SkipReason::ExtensionMismatch));
            continue;
        }

        let status = match rewrite_file(entry.path(), &rewriter, options.dry_run, reviewer, &mut journal) {
            Ok(status) => status,
            Err(err @ ForkifyError::Aborted { .. }) => return Err(err),
            Err(err) => {
                warn!("Failed to rewrite {:?}: {}", entry.path(), err);
                FileStatus::Failed(err.to_string())
            }
        };
        report.record(entry.into_path(), status);
    }

    flush_journal(&mut journal)?;

    for pruned in walk.pruned() {
        report.record(pruned.path(), FileStatus::Skipped(SkipReason::Ignored));
    }

    info!(
        "Content rewrite complete: {} files processed, {} rewritten, {} failed",
        report.files_processed(),
        report.changed(),
        report.failed()
    );

    Ok(report)
}

/// Converts every line terminator of the selected files to `style`.
pub fn normalize_line_endings(
    root: &Path,
    style: LineEnding,
    options: &RewriteOptions,
    reviewer: &dyn Reviewer,
) -> Result<Report> {
    let options = RewriteOptions {
        line_ending: Some(style),
        ..options.clone()
    };
    rewrite_content(root, &RuleSet::default(), &options, reviewer)
}

/// Deletes every file or directory under `root` matching `cache`. Entries pruned only by
/// `options.ignore` are left alone.
pub fn clear_cache_dirs(root: &Path, cache: &IgnoreSet, options: &CleanOptions) -> Result<Report> {
    info!("Clearing cache directories under {:?}", root);

    let mut ignore = options.ignore.clone();
    ignore.extend(cache);
    ignore.add(STATE_DIR);

    let mut walk = Walker::new(root, ignore).sorted(options.sorted).walk()?;
    let mut report = Report::default();

    for entry in &mut walk {
        if let Err(err) = entry {
            record_walk_error(&mut report, err);
        }
    }

    for pruned in walk.into_pruned() {
        if !cache.matches(pruned.relative()) {
            continue;
        }

        if options.dry_run {
            info!("Would remove: {:?}", pruned.path());
            report.record(pruned.into_path(), FileStatus::Removed);
            continue;
        }

        let removed = if pruned.is_dir() {
            fs::remove_dir_all(pruned.path())
        } else {
            fs::remove_file(pruned.path())
        };

        match removed {
            Ok(()) => {
                info!("Removed: {:?}", pruned.path());
                report.record(pruned.into_path(), FileStatus::Removed);
            }
            Err(err) => {
                warn!("Failed to remove {:?}: {}", pruned.path(), err);
                report.record(pruned.into_path(), FileStatus::Failed(err.to_string()));
            }
        }
    }

    info!("Cache cleanup complete: {} removed", report.changed());

    Ok(report)
}

fn open_journal(root: &Path, dry_run: bool, backup: bool) -> Result<Option<Journal>> {
    if dry_run || !backup {
        return Ok(None);
    }
    Journal::open(root).map(Some)
}

fn flush_journal(journal: &mut Option<Journal>) -> Result<()> {
    match journal.as_mut() {
        Some(journal) => journal.flush(),
        None => Ok(()),
    }
}

fn record_walk_error(report: &mut Report, err: ForkifyError) {
    warn!("{}", err);
    match err {
        ForkifyError::Io { path, source } => report.record(path, FileStatus::Failed(source.to_string())),
        other => report.record(PathBuf::new(), FileStatus::Failed(other.to_string())),
    }
}

fn copy_file(source: &Path, destination: &Path, journal: &mut Option<Journal>) -> Result<()> {
    if let Some(parent) = destination.parent() {
        create_dirs(parent, journal)?;
    }

    if destination.exists() {
        warn!("Overwriting existing file: {:?}", destination);
    }
    if let Some(journal) = journal.as_mut() {
        journal.record_write(destination)?;
    }

    fs::copy(source, destination).map_err(|err| ForkifyError::io(destination, err))?;
    Ok(())
}

fn create_dirs(dir: &Path, journal: &mut Option<Journal>) -> Result<()> {
    let mut missing = Vec::new();
    let mut current = Some(dir);
    while let Some(candidate) = current {
        if candidate.as_os_str().is_empty() || candidate.exists() {
            break;
        }
        missing.push(candidate);
        current = candidate.parent();
    }

    if missing.is_empty() {
        return Ok(());
    }

    if let Some(journal) = journal.as_mut() {
        for created in missing.iter().rev() {
            journal.record_dir(created)?;
        }
    }

    // Already existing directories are fine here
    fs::create_dir_all(dir).map_err(|err| ForkifyError::io(dir, err))
}

fn rewrite_file(
    path: &Path,
    rewriter: &ContentRewriter<'_>,
    dry_run: bool,
    reviewer: &dyn Reviewer,
    journal: &mut Option<Journal>,
) -> Result<FileStatus> {
    let bytes = fs::read(path).map_err(|err| ForkifyError::io(path, err))?;
    let Ok(content) = String::from_utf8(bytes) else {
        debug!("Skipping non UTF-8 file: {:?}", path);
        return Ok(FileStatus::Skipped(SkipReason::NotText));
    };

    let Some(new_content) = rewriter.rewrite(&content) else {
        return Ok(FileStatus::Unchanged);
    };

    if !reviewer.review_content(path, &content, &new_content)? {
        return Ok(FileStatus::Skipped(SkipReason::Declined));
    }

    if dry_run {
        info!("Would update contents of: {:?}", path);
        return Ok(FileStatus::Rewritten);
    }

    if let Some(journal) = journal.as_mut() {
        journal.record_write(path)?;
    }
    write_atomic(path, new_content.as_bytes()).map_err(|err| ForkifyError::io(path, err))?;
    info!("Updated contents of: {:?}", path);

    Ok(FileStatus::Rewritten)
}
