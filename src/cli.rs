use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::error::ErrorKind;
use clap::{ArgAction, Args, ColorChoice, CommandFactory, Parser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::AppResult;
use crate::config::NotifyConfig;
use crate::dispatch::Dispatcher;
use crate::git::{Backend, GitRepo, ReferenceUpdate};
use crate::transport::{Sendmail, Stdout, Transport};

const STYLES: Styles = Styles::styled()
    .header(Style::new().bold())
    .usage(Style::new().bold())
    .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))))
    .literal(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
    .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
    .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightRed))))
    .context(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta))))
    .context_value(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
    );

/// Long-form CLI description shown in `--help`.
const LONG_ABOUT: &str = "push-notice - announce pushed commits by mail and to CIA

Run it from a post-receive hook. With no positional arguments it reads
`<old> <new> <ref>` lines from stdin, exactly as git feeds the hook;
otherwise it handles the single update given on the command line.

Every option can also be set in the repository config under `notify.*`
(for example `git config notify.mail commits@example.org`). Flags win
over config values.";

/// push-notice - announce pushed commits by mail and to CIA.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = Some(LONG_ABOUT), styles = STYLES)]
pub struct Cli {
    /// Color choice for log output
    #[arg(long, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    #[command(flatten)]
    pub notify: NotifyArgs,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// A single update; updates are read from stdin when omitted
    #[arg(value_names = ["OLD", "NEW", "REF"], num_args = 0..=3)]
    pub update: Vec<String>,
}

/// Options controlling who gets notified and what goes in the notices.
#[derive(Args, Debug, Clone, Default)]
pub struct NotifyArgs {
    /// Send CIA notifications under the given project name
    #[arg(short = 'c', long, value_name = "NAME")]
    pub cia_project: Option<String>,

    /// Address CIA notifications are mailed to
    #[arg(long, value_name = "ADDR")]
    pub cia_address: Option<String>,

    /// Print notices to stdout instead of mailing them
    #[arg(short, long, default_value_t = false, action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Send mail notifications to the given address
    #[arg(short, long, value_name = "ADDR")]
    pub mail: Option<String>,

    /// Maximum number of individual mails per update before a single
    /// summary mail is sent instead
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub max_notices: Option<usize>,

    /// Repository name shown in notices
    ///
    /// Defaults to the repository directory name
    #[arg(short, long, value_name = "NAME")]
    pub repository: Option<String>,

    /// Maximum diff size in bytes before a link is sent instead (-1 for no limit)
    #[arg(short = 's', long, value_name = "BYTES", allow_negative_numbers = true)]
    pub max_diff: Option<i64>,

    /// Base URL of the gitweb repository browser
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Only report updates of this branch (repeatable)
    #[arg(short, long, value_name = "BRANCH", action = ArgAction::Append)]
    pub include: Vec<String>,

    /// Leave out commits already reachable from this branch (repeatable)
    #[arg(short = 'x', long, value_name = "BRANCH", action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Do not announce merge commits
    #[arg(short = 'X', long, default_value_t = false, action = ArgAction::SetTrue)]
    pub no_merges: bool,

    /// Mail submission program, invoked as `sendmail -t -oi`
    #[arg(long, value_name = "PATH")]
    pub sendmail: Option<PathBuf>,
}

impl Cli {
    /// The update given on the command line, if any. Exits with a usage
    /// error for a partial or malformed triple.
    pub fn single_update(&self) -> Option<ReferenceUpdate> {
        match self.update.as_slice() {
            [] => None,
            [old, new, refname] => match ReferenceUpdate::new(old, new, refname) {
                Ok(update) => Some(update),
                Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
            },
            _ => Cli::command()
                .error(
                    ErrorKind::WrongNumberOfValues,
                    "expected <OLD> <NEW> <REF> or no positional arguments",
                )
                .exit(),
        }
    }

    /// Resolve configuration against the hook's repository and send every
    /// notice. Returns `false` if any update could not be processed.
    #[tracing::instrument(name = "Running hook", level = "info", skip(self))]
    pub async fn run(&self) -> AppResult<bool> {
        let single = self.single_update();
        let repo = GitRepo::open_from_env()?;
        let config = NotifyConfig::resolve(&self.notify, &repo)?;
        debug!("Configuration: {}", serde_json::to_string(&config)?);
        let stdin = BufReader::new(tokio::io::stdin());
        if config.debug {
            process(&config, &repo, &Stdout, single, stdin).await
        } else {
            process(&config, &repo, &Sendmail::new(&config.sendmail), single, stdin).await
        }
    }
}

/// Handle the single update, or every `<old> <new> <ref>` line of `input`.
async fn process<B: Backend, T: Transport, R: AsyncBufRead + Unpin>(
    config: &NotifyConfig,
    backend: &B,
    transport: &T,
    single: Option<ReferenceUpdate>,
    input: R,
) -> AppResult<bool> {
    let dispatcher = Dispatcher::new(config, backend, transport);
    if let Some(update) = single {
        return Ok(handle(&dispatcher, &update).await);
    }

    let mut ok = true;
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match ReferenceUpdate::from_line(line.trim_end()) {
            Some(update) => ok &= handle(&dispatcher, &update).await,
            None => warn!("Ignoring malformed update line {:?}", line),
        }
    }
    Ok(ok)
}

async fn handle<B: Backend, T: Transport>(
    dispatcher: &Dispatcher<'_, B, T>,
    update: &ReferenceUpdate,
) -> bool {
    match dispatcher.dispatch(update).await {
        Ok(outcome) => {
            info!("{}: {}", update.refname, outcome);
            true
        }
        Err(e) => {
            error!("Failed to announce update of {}: {}", update.refname, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fake::FakeBackend;
    use crate::transport::testing::Recorder;

    const OLD: &str = "1111111111111111111111111111111111111111";
    const NEW: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "push-notice", "-m", "list@example.org", "-c", "widgets", "-n", "5", "-s", "-1",
            "-i", "main", "-i", "dev", "-x", "old", "-X", "-d", OLD, NEW, "refs/heads/main",
        ])
        .unwrap();
        assert_eq!(cli.notify.mail.as_deref(), Some("list@example.org"));
        assert_eq!(cli.notify.cia_project.as_deref(), Some("widgets"));
        assert_eq!(cli.notify.max_notices, Some(5));
        assert_eq!(cli.notify.max_diff, Some(-1));
        assert_eq!(cli.notify.include, vec!["main", "dev"]);
        assert_eq!(cli.notify.exclude, vec!["old"]);
        assert!(cli.notify.no_merges);
        assert!(cli.notify.debug);
        let update = cli.single_update().unwrap();
        assert_eq!(update.short_name(), "main");
    }

    #[test]
    fn no_positionals_means_stdin() {
        let cli = Cli::try_parse_from(["push-notice", "-m", "list@example.org"]).unwrap();
        assert!(cli.single_update().is_none());
    }

    #[test]
    fn rejects_extra_positionals() {
        assert!(Cli::try_parse_from(["push-notice", OLD, NEW, "refs/heads/a", "more"]).is_err());
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn stdin_updates_continue_past_failures() {
        let mut backend = FakeBackend::default();
        let ids = backend.add_linear_history(3);
        let config = NotifyConfig {
            repo_name: "widgets".to_string(),
            mail_to: Some("commits@example.org".to_string()),
            ..NotifyConfig::default()
        };
        let missing = "f".repeat(40);
        let null = "0".repeat(40);
        let input = format!(
            "{} {} refs/heads/main\n\
             this is not an update\n\
             {null} {missing} refs/heads/ghost\n\
             {} {} refs/heads/main\n",
            ids[0], ids[1], ids[1], ids[2]
        );
        let recorder = Recorder::default();
        let ok = process(&config, &backend, &recorder, None, input.as_bytes())
            .await
            .unwrap();
        assert!(!ok);
        let subjects: Vec<_> = recorder.sent().into_iter().map(|n| n.subject).collect();
        assert_eq!(subjects, vec!["Alice: Change number 1", "Alice: Change number 2"]);
    }

    #[tokio::test]
    async fn clean_stdin_run_succeeds() {
        let mut backend = FakeBackend::default();
        let ids = backend.add_linear_history(2);
        let config = NotifyConfig {
            mail_to: Some("commits@example.org".to_string()),
            ..NotifyConfig::default()
        };
        let input = format!("{} {} refs/heads/main\r\n", ids[0], ids[1]);
        let recorder = Recorder::default();
        let ok = process(&config, &backend, &recorder, None, input.as_bytes())
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(recorder.sent().len(), 1);
    }
}
