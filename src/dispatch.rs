use std::fmt::{self, Display};

use tracing::{debug, info, warn};

use crate::AppResult;
use crate::config::NotifyConfig;
use crate::git::object::inspect;
use crate::git::walk::commits_between;
use crate::git::{Backend, ReferenceUpdate, RevisionRange};
use crate::notice::{Notice, feed, mail, summary};
use crate::transport::Transport;

/// What happened to one reference update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Branch is not in the include list.
    Filtered,
    /// The ref was deleted.
    Deleted,
    /// The ref was created; at most one mail for its tip.
    Created { mailed: usize },
    /// Too many commits, a single summary went out instead.
    Batched { commits: usize, mailed: usize },
    Individual {
        commits: usize,
        mailed: usize,
        fed: usize,
    },
}

impl Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Filtered => write!(f, "not in the include list"),
            DispatchOutcome::Deleted => write!(f, "deleted, nothing to announce"),
            DispatchOutcome::Created { mailed } => write!(f, "created, {mailed} mail sent"),
            DispatchOutcome::Batched { commits, mailed } => {
                write!(f, "{commits} commits, {mailed} summary mail sent")
            }
            DispatchOutcome::Individual {
                commits,
                mailed,
                fed,
            } => write!(f, "{commits} commits, {mailed} mails and {fed} CIA notices sent"),
        }
    }
}

/// Decides which notices a reference update produces and sends them.
pub struct Dispatcher<'a, B, T> {
    config: &'a NotifyConfig,
    backend: &'a B,
    transport: &'a T,
}

impl<'a, B: Backend, T: Transport> Dispatcher<'a, B, T> {
    pub fn new(config: &'a NotifyConfig, backend: &'a B, transport: &'a T) -> Self {
        Dispatcher {
            config,
            backend,
            transport,
        }
    }

    #[tracing::instrument(name = "Dispatching", level = "info", skip(self), fields(refname = %update.refname))]
    pub async fn dispatch(&self, update: &ReferenceUpdate) -> AppResult<DispatchOutcome> {
        let config = self.config;
        let branch = update.short_name();

        if !config.include.is_empty() && !config.include.iter().any(|b| b == branch) {
            debug!("Skipping {}, not in the include list", branch);
            return Ok(DispatchOutcome::Filtered);
        }

        if update.new.is_null() {
            info!("{} was deleted", update.refname);
            return Ok(DispatchOutcome::Deleted);
        }

        if update.old.is_null() {
            let mut mailed = 0;
            if let Some(to) = &config.mail_to {
                let info = inspect(self.backend, update.new.as_str())?;
                if let Some(notice) = mail::object_notice(config, to, branch, &info, self.backend)? {
                    mailed += self.send(notice).await;
                }
            }
            return Ok(DispatchOutcome::Created { mailed });
        }

        let commits = commits_between(
            self.backend,
            &update.old,
            &update.new,
            &config.exclude,
            config.no_merges,
        )?;

        if commits.len() > config.max_notices {
            info!(
                "{} commits exceed the limit of {}, sending a summary",
                commits.len(),
                config.max_notices
            );
            let mut mailed = 0;
            if let Some(to) = &config.mail_to {
                let range = RevisionRange {
                    old: update.old.clone(),
                    new: update.new.clone(),
                    exclude: config.exclude.clone(),
                    no_merges: config.no_merges,
                };
                let notice = summary::batch_notice(config, to, branch, &range, self.backend)?;
                mailed += self.send(notice).await;
            }
            return Ok(DispatchOutcome::Batched {
                commits: commits.len(),
                mailed,
            });
        }

        let (mut mailed, mut fed) = (0, 0);
        if config.mail_to.is_none() && config.cia_project.is_none() {
            debug!("Neither mail nor CIA is configured");
        } else {
            for commit in &commits {
                let info = inspect(self.backend, commit.as_str())?;
                if let Some(to) = &config.mail_to
                    && let Some(notice) = mail::object_notice(config, to, branch, &info, self.backend)?
                {
                    mailed += self.send(notice).await;
                }
                if let Some(project) = &config.cia_project
                    && let Some(notice) = feed::feed_notice(config, project, branch, &info, self.backend)?
                {
                    fed += self.send(notice).await;
                }
            }
        }
        Ok(DispatchOutcome::Individual {
            commits: commits.len(),
            mailed,
            fed,
        })
    }

    /// Returns 1 when the notice went out, 0 when it was dropped.
    async fn send(&self, notice: Notice) -> usize {
        match self.transport.send(&notice).await {
            Ok(()) => 1,
            Err(e) => {
                warn!(
                    "Dropping notice {:?} to {}: {}",
                    notice.subject, notice.recipient, e
                );
                0
            }
        }
    }
}
