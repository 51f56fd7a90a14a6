use anyhow::Result;
use forkify_core::{ForkifyError, Reviewer};
use inquire::Confirm;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::path::Path;

/// Shows every change on the terminal and asks before applying it.
pub struct PromptReviewer;

impl Reviewer for PromptReviewer {
    fn review_content(
        &self,
        path: &Path,
        old_content: &str,
        new_content: &str,
    ) -> forkify_core::Result<bool> {
        show_diff_and_confirm(path, old_content, new_content, "Content change").map_err(aborted)
    }

    fn review_copy(&self, source: &Path, destination: &Path) -> forkify_core::Result<bool> {
        show_copy_and_confirm(source, destination).map_err(aborted)
    }
}

fn aborted(err: anyhow::Error) -> ForkifyError {
    ForkifyError::Aborted {
        reason: err.to_string(),
    }
}

/// Coloured, grouped line diff; `None` when the texts have the same lines.
pub fn render_diff(old_content: &str, new_content: &str) -> Result<Option<String>> {
    let diff = TextDiff::from_lines(old_content, new_content);
    let mut output = String::new();
    let mut has_changes = false;

    for (i, group) in diff.grouped_ops(3).iter().enumerate() {
        if i > 0 {
            writeln!(output, "{:-^1$}", "", 40)?;
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, style) = match change.tag() {
                    ChangeTag::Delete => ("- ", "\x1b[31m"),
                    ChangeTag::Insert => ("+ ", "\x1b[32m"),
                    ChangeTag::Equal => ("  ", "\x1b[0m"),
                };
                write!(output, "{}{}{}\x1b[0m", style, sign, change.value())?;
                if change.missing_newline() {
                    writeln!(output)?;
                }
                if change.tag() != ChangeTag::Equal {
                    has_changes = true;
                }
            }
        }
    }

    Ok(has_changes.then_some(output))
}

pub fn show_diff_and_confirm(
    file_path: &Path,
    old_content: &str,
    new_content: &str,
    change_description: &str,
) -> Result<bool> {
    println!("\n📝 {}: {}", change_description, file_path.display());

    let Some(diff) = render_diff(old_content, new_content)? else {
        println!("No changes detected.");
        return Ok(false);
    };

    println!("{}", diff);

    let apply_change = Confirm::new("Apply this change?")
        .with_default(true)
        .prompt()?;

    Ok(apply_change)
}

pub fn show_copy_and_confirm(source: &Path, destination: &Path) -> Result<bool> {
    println!("\n📁 Copy:");
    println!("  \x1b[31m- {}\x1b[0m", source.display());
    println!("  \x1b[32m+ {}\x1b[0m", destination.display());

    let apply_change = Confirm::new("Apply this copy?")
        .with_default(true)
        .prompt()?;

    Ok(apply_change)
}
