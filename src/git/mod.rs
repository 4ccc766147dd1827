use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;

use crate::{AppError, AppResult};

/// Per-commit change summaries and the size-capped patch.
pub(crate) mod diff;
/// Commit and tag header parsing.
pub(crate) mod object;
/// libgit2 binding of [`Backend`].
pub(crate) mod repo;
/// Enumeration of the commits introduced by a ref update.
pub(crate) mod walk;

#[cfg(test)]
pub(crate) mod fake;

pub(crate) use diff::{ChangeAction, FileChange};
pub(crate) use repo::GitRepo;

/// Length of a full hex object id.
pub const ID_LEN: usize = 40;

/// A full 40 digit lowercase hex object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionId(String);

impl RevisionId {
    /// The all-zero id git uses for "no such ref".
    #[cfg(test)]
    pub fn null() -> Self {
        RevisionId("0".repeat(ID_LEN))
    }

    pub fn is_null(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn is_full_hex_id(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl FromStr for RevisionId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_full_hex_id(s) {
            Ok(RevisionId(s.to_string()))
        } else {
            Err(AppError::InvalidRevision(s.to_string()))
        }
    }
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `<old> <new> <ref>` triple as handed to a post-receive hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceUpdate {
    pub old: RevisionId,
    pub new: RevisionId,
    pub refname: String,
}

impl ReferenceUpdate {
    pub fn new(old: &str, new: &str, refname: &str) -> AppResult<Self> {
        Ok(ReferenceUpdate {
            old: old.parse()?,
            new: new.parse()?,
            refname: refname.to_string(),
        })
    }

    /// Parse a hook stdin line. Returns `None` for lines that are not a triple.
    pub fn from_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ' ');
        let (old, new, refname) = (parts.next()?, parts.next()?, parts.next()?);
        if refname.is_empty() {
            return None;
        }
        Self::new(old, new, refname).ok()
    }

    /// Reference name with the branch namespace removed.
    pub fn short_name(&self) -> &str {
        self.refname
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.refname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tag,
    Other(String),
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Commit => f.write_str("commit"),
            ObjectKind::Tag => f.write_str("tag"),
            ObjectKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Commits reachable from `new` that are not reachable from `old` or from
/// any of the `exclude` revisions.
#[derive(Debug, Clone)]
pub struct RevisionRange {
    pub old: RevisionId,
    pub new: RevisionId,
    pub exclude: Vec<String>,
    pub no_merges: bool,
}

/// One line of the batched notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    pub id: String,
    pub subject: String,
    pub author: String,
}

/// The queries the notifier needs from version control. Everything is keyed
/// by revision ids or names and answered as plain text or simple records, so
/// another binding can replace libgit2 without touching the formatters.
pub trait Backend {
    /// Kind of the object named by `id`.
    fn object_kind(&self, id: &str) -> AppResult<ObjectKind>;

    /// Raw object text (headers, blank line, message), as `cat-file` prints it.
    fn object_contents(&self, id: &str) -> AppResult<String>;

    /// `diff-tree --stat` style summary of a commit.
    fn diff_stat(&self, id: &str) -> AppResult<String>;

    /// Unified diff of a commit against its parent.
    fn diff_body(&self, id: &str) -> AppResult<String>;

    /// Ids in `range`, newest first.
    fn rev_list(&self, range: &RevisionRange) -> AppResult<Vec<String>>;

    /// Summary records for `range`, newest first.
    fn log_summaries(&self, range: &RevisionRange) -> AppResult<Vec<LogSummary>>;

    /// Name-status change list of a commit, renames detected.
    fn name_status(&self, id: &str) -> AppResult<Vec<FileChange>>;

    /// A stored configuration value, `None` when unset.
    fn config_value(&self, key: &str) -> AppResult<Option<String>>;

    /// Directory holding the repository data.
    fn storage_dir(&self) -> PathBuf;
}
