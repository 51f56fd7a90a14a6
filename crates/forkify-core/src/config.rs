use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::rewriter::{ExtensionFilter, LineEnding};
use crate::rules::{MatchMode, RenameRule, RuleScope, RuleSet};
use crate::walker::IgnoreSet;
use crate::{ForkifyError, Result};

const SUPPORTED_VERSION: u32 = 1;

/// A rule table file as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleTableFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub walk: WalkSection,

    #[serde(default)]
    pub content: ContentSection,

    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WalkSection {
    /// Patterns pruned from every traversal.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Patterns removed by `clear-cache-dirs`.
    #[serde(default = "default_cache_dirs")]
    pub cache_dirs: Vec<String>,
}

impl Default for WalkSection {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            cache_dirs: default_cache_dirs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ContentSection {
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub line_endings: Option<LineEnding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleEntry {
    pub pattern: String,
    pub replacement: String,

    #[serde(default)]
    pub mode: MatchMode,

    #[serde(default)]
    pub scope: RuleScope,

    #[serde(default)]
    pub case_variants: bool,
}

fn default_version() -> u32 {
    SUPPORTED_VERSION
}

fn default_ignore() -> Vec<String> {
    [".git", "__pycache__", ".pytest_cache", ".mypy_cache"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cache_dirs() -> Vec<String> {
    ["__pycache__", ".pytest_cache", ".mypy_cache"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// A validated rule table, ready to drive the operations.
#[derive(Debug, Clone)]
pub struct RuleTable {
    pub name: String,
    pub version: u32,
    pub rules: RuleSet,
    pub extensions: ExtensionFilter,
    pub line_ending: Option<LineEnding>,
    pub ignore: IgnoreSet,
    pub cache_dirs: IgnoreSet,
}

impl RuleTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ForkifyError::io(path, source))?;
        Self::from_toml_str(&content, path)
    }

    /// Parses a table from TOML text; `origin` is only used in error messages.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        let file: RuleTableFile = toml::from_str(content).map_err(|source| ForkifyError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::from_parsed(file, origin)
    }

    fn from_parsed(file: RuleTableFile, origin: &Path) -> Result<Self> {
        if file.version != SUPPORTED_VERSION {
            return Err(config_error(
                origin,
                format!(
                    "unsupported rule table version {} (expected {})",
                    file.version, SUPPORTED_VERSION
                ),
            ));
        }

        let mut rules = RuleSet::default();
        for (index, entry) in file.rules.iter().enumerate() {
            let rule = RenameRule::new(&entry.pattern, &entry.replacement, entry.mode)
                .map_err(|err| config_error(origin, format!("rule {}: {}", index + 1, err)))?
                .with_scope(entry.scope);

            if entry.case_variants {
                let variants = rule
                    .case_variants()
                    .map_err(|err| config_error(origin, format!("rule {}: {}", index + 1, err)))?;
                for variant in variants {
                    rules.push(variant);
                }
            } else {
                rules.push(rule);
            }
        }

        let name = file.name.unwrap_or_else(|| {
            origin
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string())
        });

        debug!("Loaded rule table '{}' with {} rules", name, rules.len());

        Ok(Self {
            name,
            version: file.version,
            rules,
            extensions: ExtensionFilter::new(&file.content.extensions),
            line_ending: file.content.line_endings,
            ignore: IgnoreSet::new(file.walk.ignore),
            cache_dirs: IgnoreSet::new(file.walk.cache_dirs),
        })
    }
}

fn config_error(path: &Path, message: String) -> ForkifyError {
    ForkifyError::Config {
        path: PathBuf::from(path),
        message,
    }
}
