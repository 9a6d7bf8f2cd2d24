#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Command-line front end for the heating-plant controller.

mod cli;
mod run;

use std::ffi::OsStr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let cfg = heat_config::load_file(&args.config)?;
    init_tracing(&args, &cfg.logging)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })
        .wrap_err("install SIGINT handler")?;
    }

    let plant = heat_core::PlantCfg::from_toml(&cfg)?;
    match args.cmd {
        Commands::Scan { sim } => run::scan(&cfg, &plant, sim, args.json),
        Commands::Run { cycles, sim } => run::run(&cfg, plant, cycles, sim, stop),
    }
}

/// Console layer (pretty or JSON lines) plus an optional JSON file layer
/// from the `[logging]` config table. CLI `--log-level` wins over the
/// config level; `RUST_LOG` wins over both.
fn init_tracing(args: &Cli, logging: &heat_config::Logging) -> Result<()> {
    let level = args
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console: Box<dyn Layer<Registry> + Send + Sync> = if args.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };
    let mut layers = vec![console];

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let name = path.file_name().unwrap_or_else(|| OsStr::new("heat.log"));
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = cli::FILE_GUARD.set(guard);
        layers.push(fmt::layer().json().with_writer(writer).with_ansi(false).boxed());
    }

    tracing_subscriber::registry().with(layers).with(filter).init();
    Ok(())
}
