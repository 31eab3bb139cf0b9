#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `mpstream` binary: loads the typed config, wires two simulated controllers
//! into a dual-axis coordinator and runs a maneuver.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use mpstream_config::{Config, Logging};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RunArgs, RunOutcome};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("error: {}", humanize(&e));
        }
        tracing::debug!(error = ?e, "exiting with error");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = mpstream_config::load_toml(&text).wrap_err("parse config TOML")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout only carries results.
/// Precedence for the level: `RUST_LOG`, then `--log-level`, then `[logging].level`.
/// The returned guard flushes the log file when dropped.
fn init_tracing(
    json: bool,
    level: Option<&str>,
    logging: &Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut guard = None;
    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(guard)
}

fn install_shutdown_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    flag
}

fn print_outcome(outcome: &RunOutcome, json: bool) {
    let elapsed_ms = mpstream_core::util::millis(outcome.report.elapsed);
    if json {
        let line = serde_json::json!({
            "reason": "OnTarget",
            "cycles": outcome.report.cycles,
            "elapsed_ms": elapsed_ms,
            "deadline_misses": outcome.report.deadline_misses,
            "left": { "target": outcome.left.target, "position": outcome.left.position },
            "right": { "target": outcome.right.target, "position": outcome.right.position },
        });
        println!("{line}");
    } else {
        println!(
            "on target: left={:.3} (target {:.3}) right={:.3} (target {:.3}) cycles={} elapsed_ms={elapsed_ms}",
            outcome.left.position,
            outcome.left.target,
            outcome.right.position,
            outcome.right.target,
            outcome.report.cycles,
        );
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    let _log_guard = init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            left,
            right,
            max_run_ms,
            arm,
            stats,
        } => {
            let shutdown = install_shutdown_handler();
            let config_dir = cli
                .config
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let outcome = run::run_profiles(
                &cfg,
                &config_dir,
                RunArgs {
                    left,
                    right,
                    max_run_ms,
                    arm,
                    stats,
                },
                &shutdown,
            )?;
            print_outcome(&outcome, cli.json);
        }
        Commands::SelfCheck => {
            run::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "self_check": "ok" }));
            } else {
                println!("self-check ok");
            }
        }
        Commands::Health => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "ok",
                        "version": env!("CARGO_PKG_VERSION"),
                        "config": "valid",
                    })
                );
            } else {
                println!("healthy (config valid)");
            }
        }
    }
    Ok(())
}
