use tracing::debug;

use crate::AppResult;
use crate::config::NotifyConfig;
use crate::git::object::ObjectInfo;
use crate::git::{Backend, ChangeAction, ObjectKind};
use crate::notice::{ContentType, Notice};

const GENERATOR: &str = "push-notice for CIA";
/// Subject the CIA mail gateway expects on XML submissions.
const SUBJECT: &str = "DeliverXML";
const REVISION_LEN: usize = 10;

/// Escape markup characters and turn everything outside ASCII into numeric
/// character references, so the document is plain ASCII.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c if (c as u32) > 127 => out.push_str(&format!("&#{};", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// CIA XML document for a commit. Anything other than a commit yields `None`.
#[tracing::instrument(level = "debug", skip(config, backend, info), fields(id = %info.id))]
pub fn feed_notice<B: Backend>(
    config: &NotifyConfig,
    project: &str,
    branch: &str,
    info: &ObjectInfo,
    backend: &B,
) -> AppResult<Option<Notice>> {
    if info.kind != ObjectKind::Commit {
        debug!("No CIA notice for {} objects", info.kind);
        return Ok(None);
    }

    let author = info.author.as_ref();
    let mut lines = vec![
        "<message>".to_string(),
        "  <generator>".to_string(),
        format!("    <name>{GENERATOR}</name>"),
        format!("    <version>{}</version>", env!("CARGO_PKG_VERSION")),
        "  </generator>".to_string(),
        "  <source>".to_string(),
        format!("    <project>{}</project>", xml_escape(project)),
        format!("    <module>{}</module>", xml_escape(&config.repo_name)),
        format!("    <branch>{}</branch>", xml_escape(branch)),
        "  </source>".to_string(),
        "  <body>".to_string(),
        "    <commit>".to_string(),
        format!("      <revision>{}</revision>", &info.id[..REVISION_LEN.min(info.id.len())]),
        format!(
            "      <author>{}</author>",
            xml_escape(author.map(|a| a.raw.as_str()).unwrap_or_default())
        ),
        format!("      <log>{}</log>", xml_escape(&info.log.join("\n"))),
        "      <files>".to_string(),
    ];

    for change in backend.name_status(&info.id)? {
        let Some(action) = change.action.feed_action() else {
            continue;
        };
        match (change.action, &change.source) {
            (ChangeAction::Renamed, Some(source)) => lines.push(format!(
                "        <file action=\"{action}\" to=\"{}\">{}</file>",
                xml_escape(&change.path),
                xml_escape(source)
            )),
            (ChangeAction::Renamed, None) => continue,
            _ => lines.push(format!(
                "        <file action=\"{action}\">{}</file>",
                xml_escape(&change.path)
            )),
        }
    }

    lines.push("      </files>".to_string());
    if let Some(browser) = config.browser() {
        lines.push(format!("      <url>{}</url>", xml_escape(&browser.commit(&info.id))));
    }
    lines.extend([
        "    </commit>".to_string(),
        "  </body>".to_string(),
        format!(
            "  <timestamp>{}</timestamp>",
            author.map(|a| a.timestamp).unwrap_or_default()
        ),
        "</message>".to_string(),
    ]);

    Ok(Some(Notice {
        recipient: config.cia_address.clone(),
        subject: SUBJECT.to_string(),
        content_type: ContentType::Xml,
        body: lines.join("\n"),
    }))
}
