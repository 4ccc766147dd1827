use std::path::{Path, PathBuf};

use git2::{
    Diff, DiffFindOptions, DiffFormat, DiffOptions, DiffStatsFormat, ErrorCode, ObjectType, Oid,
    Repository, Sort,
};
use tracing::{debug, trace};

use crate::AppResult;
use crate::git::{Backend, ChangeAction, FileChange, LogSummary, ObjectKind, RevisionRange};

/// Width the stat graph is laid out for, matching an 80 column terminal.
const STAT_WIDTH: usize = 80;

/// [`Backend`] over a libgit2 repository handle.
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open the repository the hook runs in (`GIT_DIR`, or discovered from
    /// the working directory).
    #[tracing::instrument(level = "debug")]
    pub fn open_from_env() -> AppResult<Self> {
        let repo = Repository::open_from_env()?;
        debug!("Opened repository at {}", repo.path().display());
        Ok(GitRepo { repo })
    }

    #[cfg(test)]
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(GitRepo {
            repo: Repository::open(path)?,
        })
    }

    fn commit_oid(&self, rev: &str) -> AppResult<Oid> {
        let oid = match Oid::from_str(rev) {
            Ok(oid) if rev.len() == crate::git::ID_LEN => oid,
            _ => self.repo.revparse_single(rev)?.id(),
        };
        Ok(self.repo.find_object(oid, None)?.peel_to_commit()?.id())
    }

    /// Tree diff of a commit against its only parent, or against the empty
    /// tree for a root commit. Merges have no single diff and yield `None`.
    fn commit_diff(&self, id: &str) -> AppResult<Option<Diff<'_>>> {
        let commit = self.repo.find_commit(Oid::from_str(id)?)?;
        if commit.parent_count() > 1 {
            trace!("{} is a merge, no diff", id);
            return Ok(None);
        }
        let old_tree = match commit.parent_count() {
            1 => Some(commit.parent(0)?.tree()?),
            _ => None,
        };
        let new_tree = commit.tree()?;
        let mut diff = self.repo.diff_tree_to_tree(
            old_tree.as_ref(),
            Some(&new_tree),
            Some(&mut DiffOptions::new()),
        )?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;
        Ok(Some(diff))
    }

    fn walk(&self, range: &RevisionRange) -> AppResult<Vec<Oid>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(self.commit_oid(range.new.as_str())?)?;
        if !range.old.is_null() {
            revwalk.hide(self.commit_oid(range.old.as_str())?)?;
        }
        for name in &range.exclude {
            revwalk.hide(self.commit_oid(name)?)?;
        }
        let mut oids = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            if range.no_merges && self.repo.find_commit(oid)?.parent_count() > 1 {
                trace!("Skipping merge {}", oid);
                continue;
            }
            oids.push(oid);
        }
        Ok(oids)
    }
}

fn path_string(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Backend for GitRepo {
    fn object_kind(&self, id: &str) -> AppResult<ObjectKind> {
        let object = self.repo.find_object(Oid::from_str(id)?, None)?;
        Ok(match object.kind() {
            Some(ObjectType::Commit) => ObjectKind::Commit,
            Some(ObjectType::Tag) => ObjectKind::Tag,
            Some(other) => ObjectKind::Other(other.str().to_string()),
            None => ObjectKind::Other("unknown".to_string()),
        })
    }

    fn object_contents(&self, id: &str) -> AppResult<String> {
        let odb = self.repo.odb()?;
        let object = odb.read(Oid::from_str(id)?)?;
        Ok(String::from_utf8_lossy(object.data()).into_owned())
    }

    fn diff_stat(&self, id: &str) -> AppResult<String> {
        let Some(diff) = self.commit_diff(id)? else {
            return Ok(String::new());
        };
        let buf = diff.stats()?.to_buf(DiffStatsFormat::FULL, STAT_WIDTH)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn diff_body(&self, id: &str) -> AppResult<String> {
        let Some(diff) = self.commit_diff(id)? else {
            return Ok(String::new());
        };
        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_, _, line| {
            if let origin @ ('+' | '-' | ' ') = line.origin() {
                patch.push(origin);
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(patch)
    }

    fn rev_list(&self, range: &RevisionRange) -> AppResult<Vec<String>> {
        Ok(self.walk(range)?.iter().map(Oid::to_string).collect())
    }

    fn log_summaries(&self, range: &RevisionRange) -> AppResult<Vec<LogSummary>> {
        self.walk(range)?
            .into_iter()
            .map(|oid| {
                let commit = self.repo.find_commit(oid)?;
                let subject = String::from_utf8_lossy(commit.message_bytes())
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                Ok(LogSummary {
                    id: oid.to_string(),
                    subject,
                    author: commit.author().to_string(),
                })
            })
            .collect()
    }

    fn name_status(&self, id: &str) -> AppResult<Vec<FileChange>> {
        let Some(diff) = self.commit_diff(id)? else {
            return Ok(Vec::new());
        };
        Ok(diff
            .deltas()
            .map(|delta| {
                let old = path_string(delta.old_file().path());
                let new = path_string(delta.new_file().path());
                match delta.status() {
                    git2::Delta::Added => FileChange::new(ChangeAction::Added, new),
                    git2::Delta::Modified => FileChange::new(ChangeAction::Modified, new),
                    git2::Delta::Deleted => FileChange::new(ChangeAction::Removed, old),
                    git2::Delta::Renamed => FileChange::renamed(old, new),
                    _ => FileChange::new(ChangeAction::Other, new),
                }
            })
            .collect())
    }

    fn config_value(&self, key: &str) -> AppResult<Option<String>> {
        match self.repo.config()?.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn storage_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }
}
