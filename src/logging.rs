use std::io::IsTerminal;

use clap::ColorChoice;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber. Everything goes to stderr, which git relays
/// to the pushing client; stdout is reserved for `--debug` notice output.
pub fn setup_logger(verbosity: &Verbosity<WarnLevel>, color: ColorChoice) {
    let ansi = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .with_env_var("PUSH_NOTICE_LOG")
        .from_env_lossy();

    let fmt = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter)
        .init();
}
