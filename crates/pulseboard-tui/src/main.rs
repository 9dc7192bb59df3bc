//! `pulseboard`: terminal dashboard for a realtime record feed.
//!
//! Shows one page of records from the server's listing endpoint and keeps
//! it current from a websocket push feed: updated rows are replaced in
//! place and briefly highlighted, new records trigger a page reload, and
//! every change is logged to an activity feed. Press `r` to toggle live
//! pushes.
//!
//! Logs are written to a file (default `/tmp/pulseboard.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pulseboard_config::Profile;
use pulseboard_core::{Session, SessionConfig, TlsVerification};

use crate::app::App;

/// Terminal dashboard for a realtime record feed.
#[derive(Parser, Debug)]
#[command(name = "pulseboard", version, about)]
struct Cli {
    /// Server origin (e.g., https://dash.example.com). Overrides the profile.
    #[arg(short = 'o', long, env = "PULSEBOARD_ORIGIN")]
    origin: Option<String>,

    /// Config profile to use (defaults to the file's default_profile)
    #[arg(short = 'p', long, env = "PULSEBOARD_PROFILE")]
    profile: Option<String>,

    /// Session cookie sent with every request (e.g., "sessionid=abc")
    #[arg(long, env = "PULSEBOARD_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Accept invalid TLS certificates on the listing endpoint
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Records per page
    #[arg(long)]
    page_size: Option<usize>,

    /// How long updated rows stay highlighted (e.g., "5s", "1500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    highlight_ttl: Option<std::time::Duration>,

    /// Log file path
    #[arg(long, default_value = "/tmp/pulseboard.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. Nothing may log to stdout/stderr while the
/// TUI owns the terminal. The returned guard flushes logs on drop.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pulseboard={log_level},pulseboard_core={log_level},pulseboard_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("pulseboard.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Resolve the session config and table columns.
///
/// Priority: CLI flags > config profile > built-in defaults.
fn build_session_config(cli: &Cli) -> Result<(SessionConfig, Vec<String>)> {
    let cfg = pulseboard_config::load_config().wrap_err("failed to load config file")?;

    let (mut session, columns) = match cfg.profile(cli.profile.as_deref()) {
        Ok((name, profile)) => {
            info!(profile = name, "using config profile");
            let mut session = pulseboard_config::profile_to_session_config(profile, &cfg.defaults)?;
            if let Some(ref origin) = cli.origin {
                session.origin = origin.parse().wrap_err("invalid --origin")?;
            }
            (session, profile.columns(&cfg.defaults))
        }
        Err(e) => {
            if cli.profile.is_some() {
                return Err(e.into());
            }
            let origin = cli
                .origin
                .clone()
                .ok_or_else(|| eyre!("no --origin given and no config profile found"))?;
            let profile = Profile {
                origin,
                ..Profile::default()
            };
            let session = pulseboard_config::profile_to_session_config(&profile, &cfg.defaults)?;
            (session, profile.columns(&cfg.defaults))
        }
    };

    if let Some(ref cookie) = cli.cookie {
        session.session_cookie = Some(SecretString::from(cookie.clone()));
    }
    if cli.insecure {
        session.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(n) = cli.page_size {
        session.page_size = n.max(1);
    }
    if let Some(ttl) = cli.highlight_ttl {
        session.highlight_ttl = ttl;
    }

    Ok((session, columns))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file; hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    let (config, columns) = build_session_config(&cli)?;
    info!(origin = %config.origin, page_size = config.page_size, "starting pulseboard");

    let cancel = CancellationToken::new();
    let (session, handle) = Session::connect(&config, &cancel)?;
    let session_task = tokio::spawn(session.run(cancel.clone()));

    let mut app = App::new(config.origin.to_string(), &columns, handle.commands());
    let result = app.run(handle, cancel.clone()).await;

    cancel.cancel();
    let _ = session_task.await;
    result
}
