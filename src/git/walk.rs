use tracing::{debug, error};

use crate::git::{Backend, RevisionId, RevisionRange};
use crate::{AppError, AppResult};

/// Commits introduced by moving a ref from `old` to `new`, oldest first.
///
/// Each `exclude` entry hides everything reachable from it, so commits that
/// already reached another branch are not announced twice.
#[tracing::instrument(level = "debug", skip(backend))]
pub fn commits_between<B: Backend>(
    backend: &B,
    old: &RevisionId,
    new: &RevisionId,
    exclude: &[String],
    suppress_merges: bool,
) -> AppResult<Vec<RevisionId>> {
    let range = RevisionRange {
        old: old.clone(),
        new: new.clone(),
        exclude: exclude.to_vec(),
        no_merges: suppress_merges,
    };
    let mut commits = backend
        .rev_list(&range)?
        .into_iter()
        .map(|line| {
            line.parse::<RevisionId>().map_err(|_| {
                error!("Backend listed {:?} as a commit id", line);
                AppError::Integrity(format!("invalid commit {line:?}"))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    commits.reverse();
    debug!("{} new commits between {} and {}", commits.len(), old, new);
    Ok(commits)
}
