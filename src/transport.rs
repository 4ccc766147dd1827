use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::notice::Notice;
use crate::{AppError, AppResult};

const ENCODED_WORD_PREFIX: &str = "=?UTF-8?Q?";
const ENCODED_WORD_SUFFIX: &str = "?=";
/// RFC 2047 limit on the length of one encoded word.
const ENCODED_WORD_MAX: usize = 75;

/// Delivers rendered notices. Delivery is best effort; callers log and drop
/// failures.
pub trait Transport {
    fn send(&self, notice: &Notice) -> impl Future<Output = AppResult<()>>;
}

/// Q-encode a header value if it is not plain ASCII.
pub fn encode_subject(subject: &str) -> String {
    if subject.is_ascii() {
        return subject.to_string();
    }
    let budget = ENCODED_WORD_MAX - ENCODED_WORD_PREFIX.len() - ENCODED_WORD_SUFFIX.len();
    let mut words = Vec::new();
    let mut word = String::new();
    for ch in subject.chars() {
        let mut buf = [0u8; 4];
        let mut encoded = String::new();
        for byte in ch.encode_utf8(&mut buf).bytes() {
            match byte {
                b' ' => encoded.push('_'),
                b'=' | b'?' | b'_' => encoded.push_str(&format!("={byte:02X}")),
                b'!'..=b'~' => encoded.push(byte as char),
                _ => encoded.push_str(&format!("={byte:02X}")),
            }
        }
        // Characters are never split across encoded words.
        if word.len() + encoded.len() > budget {
            words.push(format!("{ENCODED_WORD_PREFIX}{word}{ENCODED_WORD_SUFFIX}"));
            word.clear();
        }
        word.push_str(&encoded);
    }
    if !word.is_empty() {
        words.push(format!("{ENCODED_WORD_PREFIX}{word}{ENCODED_WORD_SUFFIX}"));
    }
    words.join("\n ")
}

/// The message handed to `sendmail -t`.
pub fn render_message(notice: &Notice) -> String {
    format!(
        "To: {}\nSubject: {}\nMIME-Version: 1.0\nContent-Type: {}\nContent-Transfer-Encoding: 8bit\n\n{}\n",
        notice.recipient,
        encode_subject(&notice.subject),
        notice.content_type,
        notice.body
    )
}

/// Pipes each notice into the local mail submission program.
#[derive(Debug, Clone)]
pub struct Sendmail {
    program: PathBuf,
}

impl Sendmail {
    pub fn new(program: &Path) -> Self {
        Sendmail {
            program: program.to_path_buf(),
        }
    }
}

impl Transport for Sendmail {
    #[tracing::instrument(name = "Mailing notice", level = "debug", skip_all, fields(to = %notice.recipient))]
    async fn send(&self, notice: &Notice) -> AppResult<()> {
        let mut child = Command::new(&self.program)
            .args(["-t", "-oi"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Transport("mailer stdin is not piped".to_string()))?;
        let written = async {
            stdin.write_all(render_message(notice).as_bytes()).await?;
            stdin.shutdown().await
        }
        .await;
        drop(stdin);

        // Reap the mailer even when it stopped reading early.
        let status = child.wait().await?;
        if !status.success() {
            return Err(AppError::Transport(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }
        written?;
        debug!("Mailed {:?} to {}", notice.subject, notice.recipient);
        Ok(())
    }
}

/// Debug transport: prints notices to stdout instead of mailing them.
#[derive(Debug, Clone, Copy)]
pub struct Stdout;

pub fn render_debug(notice: &Notice) -> String {
    format!(
        "---------------------\nTo: {}\nSubject: {}\nContent-Type: {}\n\n{}\n",
        notice.recipient,
        encode_subject(&notice.subject),
        notice.content_type,
        notice.body
    )
}

impl Transport for Stdout {
    async fn send(&self, notice: &Notice) -> AppResult<()> {
        trace!("Printing notice for {}", notice.recipient);
        let mut out = tokio::io::stdout();
        out.write_all(render_debug(notice).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
