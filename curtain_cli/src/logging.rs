//! Tracing setup: console layer on stderr plus an optional JSON file sink.
//!
//! Stdout carries replies only, so every log line goes to stderr or the file.

use std::path::Path;

use curtain_config::Logging;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

/// `RUST_LOG` wins over `--log-level`, which wins over `[logging].level`.
pub fn init(json: bool, cli_level: Option<&str>, cfg: &Logging) -> eyre::Result<()> {
    let level = cli_level.or(cfg.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match cfg.file.as_deref() {
        Some(path) => {
            let appender = file_appender(Path::new(path), cfg.rotation.as_deref())?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn file_appender(
    path: &Path,
    rotation: Option<&str>,
) -> eyre::Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).wrap_err_with(|| format!("create log dir {dir:?}"))?;
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {path:?}"))?;
    Ok(match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    })
}
