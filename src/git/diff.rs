use tracing::debug;

use crate::AppResult;
use crate::git::Backend;

/// Status letter of a name-status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Added,
    Modified,
    Removed,
    Renamed,
    /// Copies, type changes and anything else the feed does not report.
    Other,
}

impl ChangeAction {
    /// Value of the `action` attribute in a feed `<file>` element.
    pub fn feed_action(&self) -> Option<&'static str> {
        match self {
            ChangeAction::Added => Some("add"),
            ChangeAction::Modified => Some("modify"),
            ChangeAction::Removed => Some("remove"),
            ChangeAction::Renamed => Some("rename"),
            ChangeAction::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub action: ChangeAction,
    pub path: String,
    /// Previous path, set for renames.
    pub source: Option<String>,
}

impl FileChange {
    pub fn new(action: ChangeAction, path: impl Into<String>) -> Self {
        FileChange {
            action,
            path: path.into(),
            source: None,
        }
    }

    pub fn renamed(source: impl Into<String>, path: impl Into<String>) -> Self {
        FileChange {
            action: ChangeAction::Renamed,
            path: path.into(),
            source: Some(source.into()),
        }
    }
}

/// The diff part of a commit mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub stat: String,
    /// Full patch, `None` when it reached the size cap.
    pub patch: Option<String>,
}

/// Collect the stat block and, size permitting, the patch of a commit.
/// `max_size` of `None` disables the cap.
#[tracing::instrument(level = "debug", skip(backend))]
pub fn summarize<B: Backend>(backend: &B, id: &str, max_size: Option<usize>) -> AppResult<DiffReport> {
    let stat = backend.diff_stat(id)?;
    let body = backend.diff_body(id)?;
    let patch = match max_size {
        Some(cap) if body.len() >= cap => {
            debug!("Diff of {} is {} bytes, over the {} byte cap", id, body.len(), cap);
            None
        }
        _ => Some(body),
    };
    Ok(DiffReport { stat, patch })
}
