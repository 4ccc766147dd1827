//! In-memory [`Backend`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::git::object::parse_object;
use crate::git::{Backend, FileChange, LogSummary, ObjectKind, RevisionRange};
use crate::{AppError, AppResult};

pub const BASE_TIME: i64 = 1_000_000_000;

#[derive(Debug, Default)]
pub struct FakeBackend {
    next: u64,
    tip: Option<String>,
    order: Vec<String>,
    objects: HashMap<String, (ObjectKind, String)>,
    parents: HashMap<String, Vec<String>>,
    diffs: HashMap<String, (String, String)>,
    changes: HashMap<String, Vec<FileChange>>,
    config: HashMap<String, String>,
    refs: HashMap<String, String>,
    injected: Vec<String>,
}

impl FakeBackend {
    fn next_id(&mut self) -> (String, i64) {
        self.next += 1;
        (format!("{:040x}", self.next), BASE_TIME + self.next as i64 * 60)
    }

    /// Commit on top of the previous one.
    pub fn add_commit(&mut self, author: &str, message: &str) -> String {
        let parents = self.tip.iter().cloned().collect();
        self.add_commit_with_parents(author, message, parents)
    }

    pub fn add_commit_with_parents(
        &mut self,
        author: &str,
        message: &str,
        parents: Vec<String>,
    ) -> String {
        let (id, when) = self.next_id();
        let mut contents = String::from("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n");
        for parent in &parents {
            contents.push_str(&format!("parent {parent}\n"));
        }
        contents.push_str(&format!("author {author} {when} +0000\n"));
        contents.push_str(&format!("committer {author} {when} +0000\n\n{message}\n"));
        self.objects.insert(id.clone(), (ObjectKind::Commit, contents));
        self.parents.insert(id.clone(), parents);
        self.order.push(id.clone());
        self.tip = Some(id.clone());
        id
    }

    pub fn add_linear_history(&mut self, count: usize) -> Vec<String> {
        (0..count)
            .map(|n| self.add_commit("Alice <alice@example.org>", &format!("Change number {n}")))
            .collect()
    }

    pub fn add_tag(&mut self, target: &str, name: &str, tagger: &str, message: &str) -> String {
        let (id, when) = self.next_id();
        let contents = format!(
            "object {target}\ntype commit\ntag {name}\ntagger {tagger} {when} +0000\n\n{message}\n"
        );
        self.objects.insert(id.clone(), (ObjectKind::Tag, contents));
        id
    }

    pub fn set_diff(&mut self, id: &str, stat: &str, body: &str) {
        self.diffs.insert(id.to_string(), (stat.to_string(), body.to_string()));
    }

    pub fn set_changes(&mut self, id: &str, changes: Vec<FileChange>) {
        self.changes.insert(id.to_string(), changes);
    }

    pub fn set_config(&mut self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    pub fn set_ref(&mut self, name: &str, id: &str) {
        self.refs.insert(name.to_string(), id.to_string());
    }

    /// Make `rev_list` emit a bogus line ahead of the real ids.
    pub fn inject_rev_list_line(&mut self, line: &str) {
        self.injected.push(line.to_string());
    }

    fn reachable(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(id) = stack.pop() {
            if seen.insert(id.clone())
                && let Some(parents) = self.parents.get(&id)
            {
                stack.extend(parents.iter().cloned());
            }
        }
        seen
    }

    fn lookup(&self, id: &str) -> AppResult<&(ObjectKind, String)> {
        self.objects
            .get(id)
            .ok_or_else(|| AppError::Integrity(format!("no object {id}")))
    }
}

impl Backend for FakeBackend {
    fn object_kind(&self, id: &str) -> AppResult<ObjectKind> {
        Ok(self.lookup(id)?.0.clone())
    }

    fn object_contents(&self, id: &str) -> AppResult<String> {
        Ok(self.lookup(id)?.1.clone())
    }

    fn diff_stat(&self, id: &str) -> AppResult<String> {
        Ok(self.diffs.get(id).map(|d| d.0.clone()).unwrap_or_default())
    }

    fn diff_body(&self, id: &str) -> AppResult<String> {
        Ok(self.diffs.get(id).map(|d| d.1.clone()).unwrap_or_default())
    }

    fn rev_list(&self, range: &RevisionRange) -> AppResult<Vec<String>> {
        let mut hidden = if range.old.is_null() {
            HashSet::new()
        } else {
            self.reachable(range.old.as_str())
        };
        for name in &range.exclude {
            let id = self.refs.get(name).map(String::as_str).unwrap_or(name);
            hidden.extend(self.reachable(id));
        }
        let wanted = self.reachable(range.new.as_str());
        let mut out = self.injected.clone();
        out.extend(
            self.order
                .iter()
                .rev()
                .filter(|id| wanted.contains(*id) && !hidden.contains(*id))
                .filter(|id| !range.no_merges || self.parents[*id].len() < 2)
                .cloned(),
        );
        Ok(out)
    }

    fn log_summaries(&self, range: &RevisionRange) -> AppResult<Vec<LogSummary>> {
        self.rev_list(range)?
            .into_iter()
            .map(|id| {
                let (kind, contents) = self.lookup(&id)?;
                let info = parse_object(&id, kind.clone(), contents);
                Ok(LogSummary {
                    subject: info.subject().to_string(),
                    author: info.author.map(|a| a.raw).unwrap_or_default(),
                    id,
                })
            })
            .collect()
    }

    fn name_status(&self, id: &str) -> AppResult<Vec<FileChange>> {
        Ok(self.changes.get(id).cloned().unwrap_or_default())
    }

    fn config_value(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.config.get(key).cloned())
    }

    fn storage_dir(&self) -> PathBuf {
        PathBuf::from("/srv/git/widgets.git")
    }
}
