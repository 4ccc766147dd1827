use tracing::{debug, trace};

use crate::AppResult;
use crate::git::{Backend, ObjectKind};
use crate::time_utils::format_local_date;

/// Start of a detached signature appended to a tag or commit message.
const SIGNATURE_MARKER: &str = "-----BEGIN PGP SIGNATURE-----";

/// An `author`/`committer`/`tagger` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// `Name <email>` exactly as stored.
    pub raw: String,
    pub name: String,
    /// Email including the angle brackets.
    pub email: String,
    pub timestamp: i64,
    pub tz: String,
}

impl Identity {
    /// Parse the part of a header after the role keyword:
    /// `Name <email> 1234567890 +0100`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut tail = value.rsplitn(3, ' ');
        let tz = tail.next()?;
        let timestamp = tail.next()?;
        let raw = tail.next()?;
        if !matches!(tz.as_bytes().first(), Some(b'+' | b'-'))
            || tz.len() != 5
            || !tz[1..].bytes().all(|b| b.is_ascii_digit())
            || timestamp.is_empty()
            || !timestamp.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let split = raw.rfind(" <")?;
        let email = &raw[split + 1..];
        if !email.ends_with('>') {
            return None;
        }
        Some(Identity {
            raw: raw.to_string(),
            name: raw[..split].to_string(),
            email: email.to_string(),
            timestamp: timestamp.parse().ok()?,
            tz: tz.to_string(),
        })
    }

    pub fn local_date(&self) -> AppResult<String> {
        format_local_date(self.timestamp, &self.tz)
    }
}

/// What the notices need to know about a commit or tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub id: String,
    pub kind: ObjectKind,
    pub author: Option<Identity>,
    pub committer: Option<Identity>,
    pub tagger: Option<Identity>,
    /// Name from the `tag` header of an annotated tag.
    pub tag: Option<String>,
    pub log: Vec<String>,
}

impl ObjectInfo {
    /// First log line, empty for an empty message.
    pub fn subject(&self) -> &str {
        self.log.first().map(String::as_str).unwrap_or_default()
    }
}

/// Split raw object text into headers and log message.
pub fn parse_object(id: &str, kind: ObjectKind, contents: &str) -> ObjectInfo {
    let mut info = ObjectInfo {
        id: id.to_string(),
        kind,
        author: None,
        committer: None,
        tagger: None,
        tag: None,
        log: Vec::new(),
    };

    let mut lines = contents.lines();
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        let Some((key, value)) = line.split_once(' ') else {
            continue;
        };
        match key {
            "author" => info.author = Identity::parse(value),
            "committer" => info.committer = Identity::parse(value),
            "tagger" => info.tagger = Identity::parse(value),
            "tag" if !value.is_empty() => info.tag = Some(value.to_string()),
            _ => trace!("Ignoring header {:?}", key),
        }
    }

    for line in lines {
        if line.starts_with(SIGNATURE_MARKER) {
            break;
        }
        info.log.push(line.to_string());
    }
    info
}

/// Look up an object and parse it.
#[tracing::instrument(level = "debug", skip(backend))]
pub fn inspect<B: Backend>(backend: &B, id: &str) -> AppResult<ObjectInfo> {
    let kind = backend.object_kind(id)?;
    let contents = backend.object_contents(id)?;
    let info = parse_object(id, kind, &contents);
    debug!("Inspected {} {} ({} log lines)", info.kind, id, info.log.len());
    Ok(info)
}
