use tracing::{debug, warn};

use crate::AppResult;
use crate::config::NotifyConfig;
use crate::git::object::{Identity, ObjectInfo};
use crate::git::{Backend, ObjectKind, diff};
use crate::notice::{ContentType, Notice};

/// Mail for a commit or an annotated tag. Other object kinds have nothing to
/// announce and yield `None`.
#[tracing::instrument(level = "debug", skip(config, backend, info), fields(id = %info.id))]
pub fn object_notice<B: Backend>(
    config: &NotifyConfig,
    recipient: &str,
    branch: &str,
    info: &ObjectInfo,
    backend: &B,
) -> AppResult<Option<Notice>> {
    match info.kind {
        ObjectKind::Commit => commit_notice(config, recipient, branch, info, backend).map(Some),
        ObjectKind::Tag => tag_notice(config, recipient, branch, info).map(Some),
        ObjectKind::Other(ref kind) => {
            warn!("Not announcing {} object {}", kind, info.id);
            Ok(None)
        }
    }
}

fn identity_lines(label: &str, who: Option<&Identity>, lines: &mut Vec<String>) -> AppResult<()> {
    lines.push(format!("{label}{}", who.map(|w| w.raw.as_str()).unwrap_or_default()));
    if let Some(who) = who {
        lines.push(format!("Date:   {}", who.local_date()?));
    }
    Ok(())
}

pub fn tag_notice(
    config: &NotifyConfig,
    recipient: &str,
    branch: &str,
    info: &ObjectInfo,
) -> AppResult<Notice> {
    let mut lines = vec![
        format!("Module: {}", config.repo_name),
        format!("Branch: {branch}"),
        format!("Tag:    {}", info.id),
    ];
    if let Some(browser) = config.browser() {
        lines.push(format!("URL:    {}", browser.tag(&info.id)));
    }
    identity_lines("Tagger: ", info.tagger.as_ref(), &mut lines)?;
    lines.push(String::new());
    lines.extend(info.log.iter().cloned());

    let subject = format!(
        "Tag {} : {}: {}",
        info.tag.as_deref().unwrap_or_default(),
        info.tagger.as_ref().map(|t| t.name.as_str()).unwrap_or_default(),
        info.subject()
    );
    Ok(Notice {
        recipient: recipient.to_string(),
        subject,
        content_type: ContentType::PlainText,
        body: lines.join("\n"),
    })
}

pub fn commit_notice<B: Backend>(
    config: &NotifyConfig,
    recipient: &str,
    branch: &str,
    info: &ObjectInfo,
    backend: &B,
) -> AppResult<Notice> {
    let browser = config.browser();
    let mut lines = vec![
        format!("Module: {}", config.repo_name),
        format!("Branch: {branch}"),
        format!("Commit: {}", info.id),
    ];
    if let Some(browser) = browser {
        lines.push(format!("URL:    {}", browser.commit(&info.id)));
    }
    identity_lines("Author: ", info.author.as_ref(), &mut lines)?;
    lines.push(String::new());
    lines.extend(info.log.iter().cloned());
    lines.extend(["", "---", ""].map(String::from));

    let report = diff::summarize(backend, &info.id, config.max_diff_size)?;
    lines.push(report.stat);
    match (report.patch, browser) {
        (Some(patch), _) => lines.push(patch),
        (None, Some(browser)) => lines.push(format!("Diff:   {}", browser.commitdiff(&info.id))),
        (None, None) => debug!("Leaving out oversized diff of {}", info.id),
    }

    let subject = format!(
        "{}: {}",
        info.author.as_ref().map(|a| a.name.as_str()).unwrap_or_default(),
        info.subject()
    );
    Ok(Notice {
        recipient: recipient.to_string(),
        subject,
        content_type: ContentType::PlainText,
        body: lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fake::FakeBackend;
    use crate::git::object::inspect;

    const STAT: &str = " src/lib.rs | 2 +-\n 1 file changed, 1 insertion(+), 1 deletion(-)\n";
    const PATCH: &str = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-old\n+new\n";

    fn config(url: Option<&str>, max_diff: Option<usize>) -> NotifyConfig {
        NotifyConfig {
            repo_name: "widgets".to_string(),
            browser_url: url.map(str::to_string),
            max_diff_size: max_diff,
            ..NotifyConfig::default()
        }
    }

    fn commit_fixture() -> (FakeBackend, ObjectInfo) {
        let mut backend = FakeBackend::default();
        let id = backend.add_commit("Jane Doe <jane@example.org>", "Fix the frobnicator\n\nDetails.");
        backend.set_diff(&id, STAT, PATCH);
        let info = inspect(&backend, &id).unwrap();
        (backend, info)
    }

    #[test]
    fn formats_commit_mail() {
        let (backend, info) = commit_fixture();
        let notice = commit_notice(&config(None, Some(10_000)), "list@example.org", "main", &info, &backend)
            .unwrap();
        assert_eq!(notice.recipient, "list@example.org");
        assert_eq!(notice.subject, "Jane Doe: Fix the frobnicator");
        assert_eq!(notice.content_type, ContentType::PlainText);
        let expected = format!(
            "Module: widgets\n\
             Branch: main\n\
             Commit: {}\n\
             Author: Jane Doe <jane@example.org>\n\
             Date:   2001-09-09 01:47:40 +0000\n\
             \n\
             Fix the frobnicator\n\
             \n\
             Details.\n\
             \n\
             ---\n\
             \n\
             {STAT}\n\
             {PATCH}",
            info.id
        );
        assert_eq!(notice.body, expected);
    }

    #[test]
    fn malformed_author_drops_date_line() {
        let (backend, fixture) = commit_fixture();
        let info = crate::git::object::parse_object(
            &fixture.id,
            ObjectKind::Commit,
            "author Jane Doe <jane@example.org> 42 +1\n\nOdd zone\n",
        );
        let notice = commit_notice(&config(None, None), "list@example.org", "main", &info, &backend)
            .unwrap();
        assert_eq!(notice.subject, ": Odd zone");
        assert!(notice.body.contains("\nAuthor: \n\nOdd zone\n"));
        assert!(!notice.body.contains("Date:"));
    }

    #[test]
    fn oversized_diff_becomes_link() {
        let (backend, info) = commit_fixture();
        let cfg = config(Some("https://git.example.org/widgets.git"), Some(PATCH.len()));
        let notice = commit_notice(&cfg, "list@example.org", "main", &info, &backend).unwrap();
        assert!(notice.body.contains(&format!(
            "URL:    https://git.example.org/widgets.git/?a=commit;h={}\n",
            info.id
        )));
        assert!(notice.body.ends_with(&format!(
            "{STAT}\nDiff:   https://git.example.org/widgets.git/?a=commitdiff;h={}",
            info.id
        )));
        assert!(!notice.body.contains("+new"));
    }

    #[test]
    fn oversized_diff_without_browser_is_left_out() {
        let (backend, info) = commit_fixture();
        let notice = commit_notice(&config(None, Some(1)), "l@e.org", "main", &info, &backend).unwrap();
        assert!(notice.body.ends_with(STAT));
        assert!(!notice.body.contains("Diff:"));
    }

    #[test]
    fn unlimited_diff_is_always_included() {
        let mut backend = FakeBackend::default();
        let id = backend.add_commit("Jane Doe <jane@example.org>", "Big change");
        let huge = "+line\n".repeat(50_000);
        backend.set_diff(&id, STAT, &huge);
        let info = inspect(&backend, &id).unwrap();
        let cfg = config(Some("https://git.example.org"), None);
        let notice = commit_notice(&cfg, "l@e.org", "main", &info, &backend).unwrap();
        assert!(notice.body.ends_with(&huge));
    }

    #[test]
    fn formats_tag_mail() {
        let mut backend = FakeBackend::default();
        let commit = backend.add_commit("Jane Doe <jane@example.org>", "Prepare release");
        let tag = backend.add_tag(&commit, "v1.0", "Release Bot <bot@example.org>", "Widgets 1.0\n\nShiny.");
        let info = inspect(&backend, &tag).unwrap();
        let cfg = config(Some("https://git.example.org"), Some(10_000));
        let notice = object_notice(&cfg, "list@example.org", "refs/tags/v1.0", &info, &backend)
            .unwrap()
            .unwrap();
        assert_eq!(notice.subject, "Tag v1.0 : Release Bot: Widgets 1.0");
        assert_eq!(
            notice.body,
            format!(
                "Module: widgets\n\
                 Branch: refs/tags/v1.0\n\
                 Tag:    {tag}\n\
                 URL:    https://git.example.org/?a=tag;h={tag}\n\
                 Tagger: Release Bot <bot@example.org>\n\
                 Date:   2001-09-09 01:48:40 +0000\n\
                 \n\
                 Widgets 1.0\n\
                 \n\
                 Shiny."
            )
        );
    }
}
