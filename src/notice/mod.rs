use std::fmt::{self, Display};

/// CIA-style XML change report.
pub(crate) mod feed;
/// Per-commit and per-tag mail bodies.
pub(crate) mod mail;
/// Single mail standing in for a run of commits too long to mail one by one.
pub(crate) mod summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Xml,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::PlainText => f.write_str("text/plain; charset=UTF-8"),
            ContentType::Xml => f.write_str("text/xml"),
        }
    }
}

/// A fully rendered message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: String,
    pub subject: String,
    pub content_type: ContentType,
    pub body: String,
}

/// Links into a gitweb-style repository browser.
#[derive(Debug, Clone, Copy)]
pub struct Browser<'a> {
    base: &'a str,
}

impl<'a> Browser<'a> {
    pub fn new(base: &'a str) -> Self {
        Browser { base }
    }

    pub fn commit(&self, id: &str) -> String {
        self.link("commit", id)
    }

    pub fn commitdiff(&self, id: &str) -> String {
        self.link("commitdiff", id)
    }

    pub fn tag(&self, id: &str) -> String {
        self.link("tag", id)
    }

    fn link(&self, action: &str, id: &str) -> String {
        format!("{}/?a={};h={}", self.base, action, id)
    }
}
