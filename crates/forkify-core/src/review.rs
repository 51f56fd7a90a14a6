use std::path::Path;

use crate::Result;

/// Gate consulted before every change an operation is about to make.
///
/// Returning `Ok(false)` skips that change; an error aborts the whole operation.
pub trait Reviewer {
    fn review_content(&self, path: &Path, old_content: &str, new_content: &str) -> Result<bool>;

    fn review_copy(&self, source: &Path, destination: &Path) -> Result<bool>;
}

/// Approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Reviewer for AcceptAll {
    fn review_content(&self, _path: &Path, _old_content: &str, _new_content: &str) -> Result<bool> {
        Ok(true)
    }

    fn review_copy(&self, _source: &Path, _destination: &Path) -> Result<bool> {
        Ok(true)
    }
}
