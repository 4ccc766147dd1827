use tracing::debug;

use crate::AppResult;
use crate::config::NotifyConfig;
use crate::git::{Backend, RevisionRange};
use crate::notice::{ContentType, Notice};

/// One mail listing every commit in `range`, newest first, for pushes with
/// more commits than the individual notice limit.
#[tracing::instrument(level = "debug", skip(config, backend))]
pub fn batch_notice<B: Backend>(
    config: &NotifyConfig,
    recipient: &str,
    branch: &str,
    range: &RevisionRange,
    backend: &B,
) -> AppResult<Notice> {
    let browser = config.browser();
    let summaries = backend.log_summaries(range)?;
    debug!("Summarizing {} commits on {}", summaries.len(), branch);

    let mut lines = Vec::with_capacity(summaries.len() * 5);
    for entry in &summaries {
        lines.push(match browser {
            Some(browser) => format!("URL:    {}", browser.commit(&entry.id)),
            None => format!("commit {}", entry.id),
        });
        lines.push(format!("Author: {}", entry.author));
        lines.push(String::new());
        lines.push(format!("    {}", entry.subject));
        lines.push(String::new());
    }

    Ok(Notice {
        recipient: recipient.to_string(),
        subject: format!("New commits on branch {branch}"),
        content_type: ContentType::PlainText,
        body: lines.join("\n"),
    })
}
