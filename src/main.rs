// SPDX-License-Identifier: GPL-3.0-or-later

//! `shimejid`: the daemon binary. Parses CLI flags, wires up logging, loads
//! configuration and character packages, and drives one `calloop::EventLoop`
//! carrying the tick timer and the IPC listener as its only two sources.

use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use clap::Parser;
use shimejid::config::Config;
use shimejid::environment::HeadlessEnvironment;
use shimejid::ipc::{self, Runtime, Shared};
use shimejid::prototype::{load::load_from_dir, store::Store};
use tracing_subscriber::EnvFilter;

const TICK_HZ: u64 = 25;
// No real compositor backend is wired in; the headless
// environment needs some work-area size to report to clients over `ClientHello`.
const DEFAULT_SCREEN_WIDTH: i32 = 1920;
const DEFAULT_SCREEN_HEIGHT: i32 = 1080;

#[derive(Parser, Debug)]
#[command(name = "shimejid", author, version, about = "Desktop mascot companion runtime")]
struct Args {
    /// Directory holding character packages to load at startup.
    #[arg(long = "packages")]
    packages_dir: Option<PathBuf>,

    /// Path to the `shimejid` config file; defaults to the xdg config dir.
    #[arg(long = "config")]
    config_path: Option<PathBuf>,

    /// Path to the IPC socket; defaults to the xdg runtime dir.
    #[arg(long = "socket")]
    socket_path: Option<PathBuf>,
}

fn init_logging() -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shimejid").context("couldn't resolve xdg directories for logging")?;
    let log_dir = xdg_dirs.get_cache_home().join("logs");
    std::fs::create_dir_all(&log_dir).context("couldn't create log directory")?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "shimejid.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    match tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        Err(_) => Ok(None), // a subscriber is already installed (e.g. under a test harness)
    }
}

fn config_path(args: &Args) -> anyhow::Result<PathBuf> {
    if let Some(path) = &args.config_path {
        return Ok(path.clone());
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shimejid").context("couldn't resolve xdg directories for config")?;
    Ok(xdg_dirs.place_config_file("config").context("couldn't place config file")?)
}

fn socket_path(args: &Args) -> anyhow::Result<PathBuf> {
    if let Some(path) = &args.socket_path {
        return Ok(path.clone());
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shimejid").context("couldn't resolve xdg directories for socket")?;
    Ok(xdg_dirs.place_runtime_file("shimejid.sock").context("couldn't place runtime socket")?)
}

fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    if path.exists() {
        Config::load(path).context("failed to parse config file")
    } else {
        Ok(Config::default())
    }
}

fn load_packages(store: &Store, dir: &std::path::Path) -> anyhow::Result<()> {
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "packages directory does not exist, starting with an empty store");
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        match load_from_dir(entry.path()) {
            Ok(proto) => {
                let name = proto.name.clone();
                if let Err(err) = store.add(proto) {
                    tracing::warn!(package = %entry.path().display(), %err, "failed to publish package");
                } else {
                    tracing::info!(prototype = %name, "loaded package");
                }
            }
            Err(err) => tracing::warn!(package = %entry.path().display(), %err, "failed to load package"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging()?;

    tracing::info!("starting shimejid");

    let config = load_config(&config_path(&args)?)?;

    let store = Arc::new(Store::new());
    let packages_dir = args
        .packages_dir
        .clone()
        .unwrap_or_else(|| xdg::BaseDirectories::with_prefix("shimejid").map(|d| d.get_data_home()).unwrap_or_else(|_| PathBuf::from("packages")));
    load_packages(&store, &packages_dir)?;

    let environment = Box::new(HeadlessEnvironment::new(DEFAULT_SCREEN_WIDTH, DEFAULT_SCREEN_HEIGHT));
    let runtime = Arc::new(Runtime::new(store, environment, config));

    let mut event_loop: EventLoop<Shared> = EventLoop::try_new().context("failed to create event loop")?;
    let loop_handle = event_loop.handle();
    let mut shared = Shared::new(runtime.clone(), loop_handle.clone());

    let sock_path = socket_path(&args)?;
    if sock_path.exists() {
        std::fs::remove_file(&sock_path).context("failed to remove stale socket")?;
    }
    let listener = UnixListener::bind(&sock_path).with_context(|| format!("failed to bind ipc socket at {}", sock_path.display()))?;
    tracing::info!(socket = %sock_path.display(), "listening for ipc clients");
    ipc::server::install(&loop_handle, listener).context("failed to install ipc listener")?;

    let tick_period = Duration::from_millis(1000 / TICK_HZ);
    let timer = Timer::from_duration(tick_period);
    loop_handle
        .insert_source(timer, move |_deadline, _metadata, shared: &mut Shared| {
            shared.runtime.run_tick();
            TimeoutAction::ToDuration(tick_period)
        })
        .map_err(|err| anyhow::anyhow!("failed to insert tick timer into event loop: {err}"))?;

    event_loop
        .run(None, &mut shared, |shared| {
            if shared.runtime.should_stop() {
                tracing::info!("stop requested, shutting down");
                std::process::exit(0);
            }
        })
        .context("event loop exited with an error")?;

    Ok(())
}
