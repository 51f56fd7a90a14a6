use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::rules::RuleSet;

/// Extensions whose files the content rewriter may touch.
///
/// Entries are stored without the leading dot and compared case-sensitively. An empty
/// filter admits every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: BTreeSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|extension| extension.as_ref().trim_start_matches('.').to_string())
            .filter(|extension| !extension.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn allows(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| self.extensions.contains(extension))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }

    /// Rewrites every line terminator to this style in a single pass. A terminator is a `\n`
    /// together with the run of `\r` directly before it; any other `\r` is kept.
    pub fn normalize(self, text: &str) -> Cow<'_, str> {
        let mut normalized = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(index) = rest.find('\n') {
            normalized.push_str(rest[..index].trim_end_matches('\r'));
            normalized.push_str(self.as_str());
            rest = &rest[index + 1..];
        }
        normalized.push_str(rest);

        if normalized == text {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(normalized)
        }
    }
}

/// Applies the content-scoped rules of a [`RuleSet`], then line-ending normalization.
pub struct ContentRewriter<'a> {
    rules: &'a RuleSet,
    line_ending: Option<LineEnding>,
}

impl<'a> ContentRewriter<'a> {
    pub fn new(rules: &'a RuleSet, line_ending: Option<LineEnding>) -> Self {
        Self { rules, line_ending }
    }

    /// Returns the rewritten text, or `None` when it would be identical.
    pub fn rewrite(&self, content: &str) -> Option<String> {
        let substituted = self.rules.apply_to_contents(content);
        let current = substituted.as_deref().unwrap_or(content);

        let normalized = self.line_ending.and_then(|style| match style.normalize(current) {
            Cow::Owned(text) => Some(text),
            Cow::Borrowed(_) => None,
        });

        normalized.or(substituted).filter(|text| text != content)
    }
}

/// Replaces `path` with `contents` through a temporary file in the same directory, so the
/// file is either fully rewritten or left as it was. Existing permissions are kept.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).ok().map(|metadata| metadata.permissions());

    let mut temp = NamedTempFile::new_in(directory)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.persist(path).map_err(|err| err.error)?;

    Ok(())
}
