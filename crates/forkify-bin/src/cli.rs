use clap::{Parser, Subcommand, ValueEnum};
use forkify_core::LineEnding;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forkify")]
#[command(version)]
#[command(about = "Fork a codebase by renaming its vocabulary in paths and file contents")]
#[command(long_about = "A CLI tool that forks an existing codebase by applying an ordered rule table of textual replacements to file and directory paths (copy-rename) and to file contents (rewrite-content), with line-ending normalization, cache cleanup and revert support.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        env = "FORKIFY_RULES",
        help = "Rule table file (defaults to the built-in vanphong table)"
    )]
    pub rules: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LineEndingArg {
    Lf,
    Crlf,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Lf => LineEnding::Lf,
            LineEndingArg::Crlf => LineEnding::Crlf,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Copy files to the paths the rule table renames them to")]
    CopyRename {
        #[arg(help = "Root directory to copy from")]
        root: PathBuf,

        #[arg(short, long, help = "Write a full renamed tree here instead of beside the originals")]
        output: Option<PathBuf>,

        #[arg(long, help = "Perform a dry run without making changes")]
        dry_run: bool,

        #[arg(short, long, help = "Interactive mode - prompt for each change")]
        interactive: bool,

        #[arg(long, help = "Do not record changes for revert")]
        no_backup: bool,

        #[arg(long, help = "Visit entries in file-name order")]
        sorted: bool,
    },

    #[command(about = "Apply the rule table to file contents in place")]
    RewriteContent {
        #[arg(help = "Root directory to rewrite")]
        root: PathBuf,

        #[arg(
            long = "ext",
            value_name = "EXT",
            value_delimiter = ',',
            help = "Only rewrite files with these extensions (overrides the rule table)"
        )]
        extensions: Vec<String>,

        #[arg(long, value_enum, help = "Also normalize line endings")]
        line_endings: Option<LineEndingArg>,

        #[arg(long, help = "Perform a dry run without making changes")]
        dry_run: bool,

        #[arg(short, long, help = "Interactive mode - prompt for each change")]
        interactive: bool,

        #[arg(long, help = "Do not record changes for revert")]
        no_backup: bool,

        #[arg(long, help = "Visit entries in file-name order")]
        sorted: bool,
    },

    #[command(about = "Convert line endings of selected files")]
    NormalizeLineEndings {
        #[arg(help = "Root directory to normalize")]
        root: PathBuf,

        #[arg(long, value_enum, help = "Target line-ending style")]
        style: LineEndingArg,

        #[arg(
            long = "ext",
            value_name = "EXT",
            value_delimiter = ',',
            help = "Only touch files with these extensions (overrides the rule table)"
        )]
        extensions: Vec<String>,

        #[arg(long, help = "Perform a dry run without making changes")]
        dry_run: bool,

        #[arg(short, long, help = "Interactive mode - prompt for each change")]
        interactive: bool,

        #[arg(long, help = "Do not record changes for revert")]
        no_backup: bool,
    },

    #[command(about = "Delete cache directories such as __pycache__")]
    ClearCacheDirs {
        #[arg(help = "Root directory to clean")]
        root: PathBuf,

        #[arg(long, help = "Perform a dry run without making changes")]
        dry_run: bool,
    },

    #[command(about = "Undo every change recorded under a root")]
    Revert {
        #[arg(help = "Root a previous run operated on, or its --output directory")]
        root: PathBuf,

        #[arg(long, help = "Perform a dry run without making changes")]
        dry_run: bool,
    },

    #[command(about = "Print the effective rule table")]
    Rules,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
