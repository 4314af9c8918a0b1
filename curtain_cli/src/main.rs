mod cli;
mod error_fmt;
mod logging;
mod transport;

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::TryRecvError;
use curtain_config::{Config, LoadOutcome, SettingsFile};
use curtain_core::{Command, Controller, ControllerBuilder, ControllerCfg, ReplyStatus, Tick};
use curtain_traits::Stepper;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

/// Pending request lines between the stdin reader and the control loop.
const REQUEST_QUEUE: usize = 16;

type BoxedStepper = Box<dyn Stepper>;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            std::process::exit(exit_code_for_error(&e));
        }
    }
}

fn run(cli: Cli) -> eyre::Result<i32> {
    let cfg = load_config(&cli.config)?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::info!(config = ?cli.config, "configuration loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    match cli.cmd {
        Commands::SelfCheck => self_check(&cfg, cli.json),
        Commands::Serve => {
            let mut ctrl = start_controller(&cfg)?;
            serve(&mut ctrl, cfg.control.period(), &shutdown)?;
            Ok(0)
        }
        Commands::Exec {
            action,
            value,
            token,
        } => {
            let mut ctrl = start_controller(&cfg)?;
            let token = token.unwrap_or_else(|| cfg.auth.api_key.clone());
            exec(
                &mut ctrl,
                (&action, value.as_deref(), &token),
                cfg.control.period(),
                &shutdown,
                cli.json,
            )
        }
        Commands::Status => {
            let ctrl = start_controller(&cfg)?;
            let report = ctrl.status();
            if cli.json {
                println!("{}", serde_json::to_string(&transport::StatusData::from(&report))?);
            } else {
                println!("{}", transport::describe(&report));
            }
            Ok(0)
        }
        Commands::Erase => {
            let mut ctrl = start_controller(&cfg)?;
            ctrl.erase()?;
            println!("settings erased");
            Ok(0)
        }
    }
}

fn load_config(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("read config {path:?}"))?;
    let cfg = curtain_config::load_toml(&text).wrap_err("parse config")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn make_stepper() -> eyre::Result<BoxedStepper> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        Ok(Box::new(curtain_hardware::GpioStepper::new()))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        tracing::info!("using simulated stepper");
        Ok(Box::new(curtain_hardware::SimulatedStepper::new()))
    }
}

fn start_controller(cfg: &Config) -> eyre::Result<Controller<BoxedStepper, SettingsFile>> {
    ControllerBuilder::new()
        .with_stepper(make_stepper()?)
        .with_store(SettingsFile::new(&cfg.storage.path))
        .with_cfg(ControllerCfg::from(cfg))
        .start()
}

/// Cooperative loop: at most one request per pass, then one tick, then sleep.
/// Exits on Ctrl-C, or on stdin EOF once the motor is idle.
fn serve(
    ctrl: &mut Controller<BoxedStepper, SettingsFile>,
    period: Duration,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let (tx, rx) = crossbeam_channel::bounded::<String>(REQUEST_QUEUE);
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .wrap_err("spawn stdin reader")?;

    let stdout = std::io::stdout();
    tracing::info!(period_us = period.as_micros() as u64, "serving requests on stdin");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        match rx.try_recv() {
            Ok(line) => {
                let reply = transport::handle_line(ctrl, &line);
                let mut out = stdout.lock();
                writeln!(out, "{reply}")?;
                out.flush()?;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                if !ctrl.is_running() {
                    tracing::info!("input closed");
                    break;
                }
            }
        }
        if let Tick::Settled(p) = ctrl.tick()? {
            tracing::debug!(current = p.current, "move settled");
        }
        std::thread::sleep(period);
    }

    // Halt and reconcile so the stored position matches the shaft.
    if let Err(e) = ctrl.stop_motor() {
        tracing::warn!(error = %e, "stop on shutdown failed");
    }
    Ok(())
}

/// Run one request, then tick until any commanded move settles.
fn exec(
    ctrl: &mut Controller<BoxedStepper, SettingsFile>,
    (action, value, token): (&str, Option<&str>, &str),
    period: Duration,
    shutdown: &AtomicBool,
    json: bool,
) -> eyre::Result<i32> {
    let reply = ctrl.handle(action, value, token);
    if json {
        println!("{}", transport::render(&reply));
    } else {
        println!("{}: {}", reply.status.as_str(), reply.message);
    }

    while ctrl.is_running() {
        if shutdown.load(Ordering::Relaxed) {
            ctrl.execute(Command::Stop)?;
            break;
        }
        if let Tick::Settled(p) = ctrl.tick()? {
            if !json {
                println!("settled at {:.3}", p.current);
            }
            break;
        }
        std::thread::sleep(period);
    }

    Ok(match reply.status {
        ReplyStatus::Ok | ReplyStatus::Busy => 0,
        ReplyStatus::Error => 1,
    })
}

fn self_check(cfg: &Config, json: bool) -> eyre::Result<i32> {
    let ccfg = ControllerCfg::from(cfg);
    let mut stepper = make_stepper()?;
    let kind = ccfg.factory.motor.kind;
    stepper
        .configure(&ccfg.pins.wiring(kind))
        .map_err(|e| curtain_core::hw_error::map_hw_error(e.as_ref()))
        .wrap_err("self-check: configure stepper")?;

    let store = SettingsFile::new(&cfg.storage.path);
    let settings = match store.load().wrap_err("self-check: load settings")? {
        LoadOutcome::Loaded(_) => "ok",
        LoadOutcome::Missing => "missing (factory settings on first start)",
        LoadOutcome::VersionMismatch { .. } => "version mismatch (factory settings on start)",
        LoadOutcome::Corrupt(_) => "corrupt (factory settings on start)",
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "motor": kind.as_str(), "settings": settings })
        );
    } else {
        println!("OK: motor {kind}, settings {settings}");
    }
    Ok(0)
}
