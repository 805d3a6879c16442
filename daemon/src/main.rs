mod config;
mod daemon;
mod envelope;
mod error;
mod executor;
mod graph;
mod logging;
mod normalizer;
mod serializer;
mod server;
mod signals;

use std::sync::Arc;

use gremlin_core::script::ScriptEngine;
use gremlin_core::TraversalEngine;

use crate::config::DaemonConfig;
use crate::daemon::daemonize;
use crate::error::Result;
use crate::logging::init_logging;
use crate::signals::SignalManager;

fn main() -> Result<()> {
    let cli_config = std::env::args().nth(1);
    let config = DaemonConfig::from_sources(cli_config.as_deref())?;

    let context = daemonize(&config)?;
    init_logging(&config)?;

    let pid_file = context.pid_file_path_owned();
    let (_signal_manager, shutdown) = SignalManager::install(pid_file)?;

    log::info!("gremlind running with pid {}", nix::unistd::getpid());

    let graph = graph::shared_graph(&config)?;
    // one engine for the whole process; bindings stay per-request
    let engine: Arc<dyn ScriptEngine> = Arc::new(TraversalEngine::new());

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(worker_threads) = config.server().worker_threads() {
        runtime.worker_threads(worker_threads);
    }
    let runtime = runtime.build()?;

    runtime.block_on(server::run(&config, graph, engine, shutdown))
}
