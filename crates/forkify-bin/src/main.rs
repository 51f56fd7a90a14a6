mod cli;
mod review;

use anyhow::{Context, Result};
use cli::{Cli, Commands, LineEndingArg};
use forkify_core::{
    AcceptAll, CleanOptions, CopyOptions, ExtensionFilter, LineEnding, Report, Reviewer,
    RewriteOptions, RuleTable,
};
use review::PromptReviewer;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const BUILTIN_RULES: &str = include_str!("../rules/vanphong.toml");

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    setup_logging(&cli)?;

    info!("Starting forkify");

    let table = load_rule_table(cli.rules.as_deref())?;

    match cli.command {
        Commands::CopyRename {
            root,
            output,
            dry_run,
            interactive,
            no_backup,
            sorted,
        } => {
            handle_copy_rename_command(&table, root, output, dry_run, interactive, no_backup, sorted)?;
        }
        Commands::RewriteContent {
            root,
            extensions,
            line_endings,
            dry_run,
            interactive,
            no_backup,
            sorted,
        } => {
            let options = RewriteOptions {
                extensions: select_extensions(&table, &extensions),
                line_ending: line_endings.map(LineEnding::from).or(table.line_ending),
                ignore: table.ignore.clone(),
                dry_run,
                backup: !no_backup,
                sorted,
            };
            handle_rewrite_command(&table, root, options, interactive)?;
        }
        Commands::NormalizeLineEndings {
            root,
            style,
            extensions,
            dry_run,
            interactive,
            no_backup,
        } => {
            let options = RewriteOptions {
                extensions: select_extensions(&table, &extensions),
                ignore: table.ignore.clone(),
                dry_run,
                backup: !no_backup,
                ..RewriteOptions::default()
            };
            handle_normalize_command(root, style, options, interactive)?;
        }
        Commands::ClearCacheDirs { root, dry_run } => {
            handle_clear_cache_command(&table, root, dry_run)?;
        }
        Commands::Revert { root, dry_run } => {
            handle_revert_command(root, dry_run)?;
        }
        Commands::Rules => {
            print_rule_table(&table);
        }
    }

    info!("Forkify completed successfully");
    Ok(())
}

fn load_rule_table(path: Option<&Path>) -> Result<RuleTable> {
    match path {
        Some(path) => {
            info!("Rule table: {:?}", path);
            RuleTable::from_file(path).with_context(|| format!("Failed to load rule table {:?}", path))
        }
        None => {
            info!("Rule table: built-in vanphong");
            RuleTable::from_toml_str(BUILTIN_RULES, Path::new("vanphong.toml"))
                .context("Built-in rule table is invalid")
        }
    }
}

fn select_extensions(table: &RuleTable, overrides: &[String]) -> ExtensionFilter {
    if overrides.is_empty() {
        table.extensions.clone()
    } else {
        ExtensionFilter::new(overrides)
    }
}

fn make_absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let current_dir = std::env::current_dir().context("Cannot determine the current directory")?;
    Ok(current_dir.join(path))
}

fn reviewer(interactive: bool) -> Box<dyn Reviewer> {
    if interactive {
        Box::new(PromptReviewer)
    } else {
        Box::new(AcceptAll)
    }
}

fn handle_copy_rename_command(
    table: &RuleTable,
    root: PathBuf,
    output: Option<PathBuf>,
    dry_run: bool,
    interactive: bool,
    no_backup: bool,
    sorted: bool,
) -> Result<()> {
    let root = make_absolute(root)?;
    let output = output.map(make_absolute).transpose()?;

    info!("Copy-rename with table '{}' ({} rules)", table.name, table.rules.len());
    info!("Root directory: {:?}", root);
    if let Some(output) = &output {
        info!("Output directory: {:?}", output);
    }
    info!("Interactive mode: {}", interactive);

    if dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    let options = CopyOptions {
        output,
        ignore: table.ignore.clone(),
        dry_run,
        backup: !no_backup,
        sorted,
    };

    let report = forkify_core::copy_rename(&root, &table.rules, &options, reviewer(interactive).as_ref())
        .with_context(|| format!("copy-rename failed for {:?}", root))?;

    print_summary("Copy-rename complete!", &report);
    Ok(())
}

fn handle_rewrite_command(
    table: &RuleTable,
    root: PathBuf,
    options: RewriteOptions,
    interactive: bool,
) -> Result<()> {
    let root = make_absolute(root)?;

    info!("Content rewrite with table '{}' ({} rules)", table.name, table.rules.len());
    info!("Root directory: {:?}", root);
    info!(
        "Extensions: {}",
        if options.extensions.is_empty() {
            "all".to_string()
        } else {
            options.extensions.extensions().collect::<Vec<_>>().join(", ")
        }
    );
    info!("Interactive mode: {}", interactive);

    if options.dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    let report = forkify_core::rewrite_content(&root, &table.rules, &options, reviewer(interactive).as_ref())
        .with_context(|| format!("rewrite-content failed for {:?}", root))?;

    print_summary("Content rewrite complete!", &report);
    Ok(())
}

fn handle_normalize_command(
    root: PathBuf,
    style: LineEndingArg,
    options: RewriteOptions,
    interactive: bool,
) -> Result<()> {
    let root = make_absolute(root)?;

    info!("Normalizing line endings to {:?} under {:?}", style, root);

    if options.dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    let report = forkify_core::normalize_line_endings(
        &root,
        style.into(),
        &options,
        reviewer(interactive).as_ref(),
    )
    .with_context(|| format!("normalize-line-endings failed for {:?}", root))?;

    print_summary("Line-ending normalization complete!", &report);
    Ok(())
}

fn handle_clear_cache_command(table: &RuleTable, root: PathBuf, dry_run: bool) -> Result<()> {
    let root = make_absolute(root)?;

    info!("Cache patterns: {:?}", table.cache_dirs.patterns());

    if dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    let options = CleanOptions {
        ignore: table.ignore.clone(),
        dry_run,
        sorted: false,
    };

    let report = forkify_core::clear_cache_dirs(&root, &table.cache_dirs, &options)
        .with_context(|| format!("clear-cache-dirs failed for {:?}", root))?;

    print_summary("Cache cleanup complete!", &report);
    Ok(())
}

fn handle_revert_command(root: PathBuf, dry_run: bool) -> Result<()> {
    let root = make_absolute(root)?;

    if dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    let report = forkify_core::revert(&root, dry_run).with_context(|| format!("revert failed for {:?}", root))?;

    print_summary("Revert complete!", &report);
    Ok(())
}

fn print_summary(title: &str, report: &Report) {
    println!("{}", title);
    println!("  Files processed: {}", report.files_processed());
    println!("  Changed: {}", report.changed());
    println!("  Skipped: {}", report.skipped());
    println!("  Failed: {}", report.failed());

    for failure in report.failures() {
        warn!("{}: {}", failure.path.display(), failure.status);
    }
}

fn print_rule_table(table: &RuleTable) {
    println!("Rule table: {} (version {})", table.name, table.version);
    println!(
        "  Extensions: {}",
        table.extensions.extensions().collect::<Vec<_>>().join(", ")
    );
    println!("  Ignore: {}", table.ignore.patterns().join(", "));
    println!("  Cache dirs: {}", table.cache_dirs.patterns().join(", "));
    if let Some(line_ending) = table.line_ending {
        println!("  Line endings: {:?}", line_ending);
    }
    println!("  Rules:");
    for (index, rule) in table.rules.rules().iter().enumerate() {
        println!(
            "    {:>3}. {} -> {} ({:?}, {:?})",
            index + 1,
            rule.pattern(),
            rule.replacement(),
            rule.mode(),
            rule.scope()
        );
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact()
        )
        .with(filter)
        .init();

    Ok(())
}
