use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, trace};

use crate::cli::NotifyArgs;
use crate::git::Backend;
use crate::notice::Browser;
use crate::{AppError, AppResult};

pub const DEFAULT_MAX_NOTICES: usize = 100;
pub const DEFAULT_MAX_DIFF: usize = 10_000;
pub const DEFAULT_CIA_ADDRESS: &str = "cia@cia.vc";
pub const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

/// Keys read from the repository configuration.
pub mod keys {
    pub const CIA_PROJECT: &str = "notify.cia";
    pub const CIA_ADDRESS: &str = "notify.ciaaddress";
    pub const MAIL: &str = "notify.mail";
    pub const MAX_NOTICES: &str = "notify.maxnotices";
    pub const REPOSITORY: &str = "notify.repository";
    pub const MAX_DIFF: &str = "notify.maxdiff";
    pub const BASE_URL: &str = "notify.baseurl";
    pub const INCLUDE: &str = "notify.include";
    pub const EXCLUDE: &str = "notify.exclude";
    pub const NO_MERGES: &str = "notify.nomerges";
    pub const SENDMAIL: &str = "notify.sendmail";
}

/// Settings for one run, resolved once from flags, repository config and
/// built-in defaults, in that order of precedence.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyConfig {
    /// CIA project name; feed notices are off when unset.
    pub cia_project: Option<String>,
    pub cia_address: String,
    /// Mail recipient; mail notices are off when unset.
    pub mail_to: Option<String>,
    /// Most commits announced one by one before falling back to a summary.
    pub max_notices: usize,
    pub repo_name: String,
    /// Patches of this many bytes or more are replaced by a link. `None`
    /// means no limit.
    pub max_diff_size: Option<usize>,
    pub browser_url: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub no_merges: bool,
    pub sendmail: PathBuf,
    pub debug: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            cia_project: None,
            cia_address: DEFAULT_CIA_ADDRESS.to_string(),
            mail_to: None,
            max_notices: DEFAULT_MAX_NOTICES,
            repo_name: String::new(),
            max_diff_size: Some(DEFAULT_MAX_DIFF),
            browser_url: None,
            include: Vec::new(),
            exclude: Vec::new(),
            no_merges: false,
            sendmail: PathBuf::from(DEFAULT_SENDMAIL),
            debug: false,
        }
    }
}

impl NotifyConfig {
    #[tracing::instrument(name = "Resolving configuration", level = "debug", skip_all)]
    pub fn resolve<B: Backend>(args: &NotifyArgs, backend: &B) -> AppResult<Self> {
        let lookup = |key: &str| -> AppResult<Option<String>> {
            let value = backend.config_value(key)?;
            trace!("{} = {:?}", key, value);
            Ok(value.filter(|v| !v.trim().is_empty()))
        };

        let max_diff = match args.max_diff {
            Some(bytes) => bytes,
            None => lookup(keys::MAX_DIFF)?
                .map(|v| parse_number::<i64>(keys::MAX_DIFF, &v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_DIFF as i64),
        };
        let max_diff_size = match max_diff {
            -1 => None,
            bytes if bytes >= 0 => Some(bytes as usize),
            bytes => {
                return Err(AppError::Config(format!(
                    "maximum diff size must be -1 or more, got {bytes}"
                )));
            }
        };

        let max_notices = match args.max_notices {
            Some(count) => count,
            None => lookup(keys::MAX_NOTICES)?
                .map(|v| parse_number(keys::MAX_NOTICES, &v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_NOTICES),
        };

        let repo_name = match args.repository.clone().or(lookup(keys::REPOSITORY)?) {
            Some(name) => name,
            None => repository_name(&backend.storage_dir()),
        };

        let no_merges = args.no_merges
            || lookup(keys::NO_MERGES)?
                .map(|v| parse_bool(keys::NO_MERGES, &v))
                .transpose()?
                .unwrap_or(false);

        let config = NotifyConfig {
            cia_project: args.cia_project.clone().or(lookup(keys::CIA_PROJECT)?),
            cia_address: args
                .cia_address
                .clone()
                .or(lookup(keys::CIA_ADDRESS)?)
                .unwrap_or_else(|| DEFAULT_CIA_ADDRESS.to_string()),
            mail_to: args.mail.clone().or(lookup(keys::MAIL)?),
            max_notices,
            repo_name,
            max_diff_size,
            browser_url: args
                .url
                .clone()
                .or(lookup(keys::BASE_URL)?)
                .map(|url| url.trim_end_matches('/').to_string()),
            include: branch_list(&args.include, lookup(keys::INCLUDE)?),
            exclude: branch_list(&args.exclude, lookup(keys::EXCLUDE)?),
            no_merges,
            sendmail: args
                .sendmail
                .clone()
                .or(lookup(keys::SENDMAIL)?.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDMAIL)),
            debug: args.debug,
        };
        debug!(
            "Notifying {} (mail: {}, cia: {})",
            config.repo_name,
            config.mail_to.as_deref().unwrap_or("off"),
            config.cia_project.as_deref().unwrap_or("off")
        );
        Ok(config)
    }

    pub fn browser(&self) -> Option<Browser<'_>> {
        self.browser_url.as_deref().map(Browser::new)
    }
}

fn parse_number<T: FromStr<Err = std::num::ParseIntError>>(key: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} = {value:?}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(AppError::Config(format!("{key} = {value:?} is not a boolean"))),
    }
}

/// Flags win over the whitespace separated config list.
fn branch_list(flags: &[String], config: Option<String>) -> Vec<String> {
    if !flags.is_empty() {
        return flags.to_vec();
    }
    config
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Name shown in the `Module:` line when none is configured: the last path
/// component of the repository directory, without any `.git` suffix.
pub fn repository_name(git_dir: &Path) -> String {
    let dir = git_dir
        .canonicalize()
        .unwrap_or_else(|_| git_dir.to_path_buf());
    let dir = dir.to_string_lossy();
    let trimmed = dir.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
