use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use unit_bus::{BroadcastTransport, UnitManager};

use crate::{
    cli::{Cli, Mode},
    config::{AppConfig, PLUGIN_PATH_ENV, plugin_path_set},
    console::Console,
    error::{ConfigError, Interrupted},
    media::{
        loader::{OmitSet, chain_file, load_streams, read_chain_description},
        runtime,
        supervisor::ChainSupervisor,
    },
    param::JsonParam,
};

mod cli;
mod config;
mod console;
mod error;
mod media;
mod param;

/// Level to force when `RUST_LOG` does not say otherwise.
fn default_level(verbose: bool, rust_log_set: bool) -> Option<log::LevelFilter> {
    match (rust_log_set, verbose) {
        (true, _) => None,
        (false, true) => Some(log::LevelFilter::Debug),
        (false, false) => Some(log::LevelFilter::Info),
    }
}

fn init_logging(verbose: bool) {
    let rust_log_set = std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some();
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = default_level(verbose, rust_log_set) {
        builder.filter_level(level).filter_module("unit_bus", level);
    }
    builder.init();
}

/// Cancel `cancel` on the first interrupt or terminate signal.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    log::warn!("SIGTERM handler not installed: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::signal::ctrl_c() => log::info!("interrupt received"),
            _ = terminate => log::info!("terminate received"),
        }
        cancel.cancel();
    });
}

async fn run(cli: Cli, console: Console, cancel: CancellationToken) -> anyhow::Result<()> {
    let camera = match cli.mode()? {
        Mode::Camera(name) => name,
        Mode::Simulated(name) => {
            log::debug!("simulation of camera \"{}\" requested", name);
            if !plugin_path_set(std::env::var(PLUGIN_PATH_ENV).ok().as_deref()) {
                return Err(ConfigError::SimulationGate(PLUGIN_PATH_ENV).into());
            }
            return Err(ConfigError::SimulationUnsupported.into());
        }
    };

    let config = AppConfig::from_env(cli.config_dir.as_deref(), cli.param.as_deref())?;
    let param = JsonParam::from_file(config.param_file()).map_err(|e| ConfigError::Store {
        path: config.param_file().display().to_string(),
        reason: format!("{:#}", e),
    })?;

    let omit = OmitSet::new(cli.omitted());
    let streams = load_streams(&param, &camera, &omit)?;
    let chain_path = chain_file(&param, &camera, false, config.config_dir())?;
    let description = read_chain_description(&chain_path)?;

    console.verbose(format!("Connecting to camera: {}", camera));
    for stream in &streams.descriptors {
        console.verbose(format!("  {}", stream));
    }

    let transport = Arc::new(BroadcastTransport::new());
    let manager = Arc::new(UnitManager::new(transport));
    let mut supervisor =
        ChainSupervisor::new(manager, config.retry(), console.clone(), cancel.clone());

    supervisor.load(&description).await?;
    supervisor.initialize().await?;
    supervisor.attach_streams(&streams.descriptors)?;

    let summary = runtime::run(&mut supervisor, cancel).await?;
    log::debug!("{:?}", summary);

    supervisor.shutdown();
    console.break_line();
    console.line("Camera was shut down.");
    Ok(())
}

/// 2 for an unsupported mode of operation, 1 for every other fatal error.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::SimulationGate(_) | ConfigError::SimulationUnsupported) => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let console = Console::stdout(cli.verbose);
    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let result = run(cli, console.clone(), cancel.clone()).await;
    cancel.cancel();
    console.break_line();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<Interrupted>() => {
            log::info!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}
