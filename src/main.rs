//! §10.5 Process bootstrap: parse the CLI, load and validate
//! configuration, wire up logging, then either serve or exit.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use trellis_ldp::cli::{Cli, Commands};
use trellis_ldp::config::ServerConfig;
use trellis_ldp::memory::{
    InMemoryAccessControlService, InMemoryAgentService, InMemoryBinaryService, InMemoryConstraintService, InMemoryIOService, InMemoryResourceService,
};
use trellis_ldp::root::RootMetadata;
use trellis_ldp::web::{self, AppStateInner};

fn load_config(cli: &Cli) -> Result<ServerConfig, ExitCode> {
    let config = ServerConfig::try_from(cli.config_path().as_deref()).map_err(|error| {
        eprintln!("failed to load configuration: {error}");
        ExitCode::FAILURE
    })?;
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("invalid configuration: {error}");
        }
        return Err(ExitCode::FAILURE);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.debug() { "debug" } else { "info" };
    trellis_ldp::logging::init(level);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match cli.command() {
        Commands::ConfigCheck { .. } => {
            tracing::info!(%config, "configuration is valid");
            ExitCode::SUCCESS
        }
        Commands::Serve { .. } => serve(config).await,
    }
}

/// No production `ResourceService`/`BinaryService`/`IOService`/
/// `ConstraintService`/`AccessControlService` implementation ships in this
/// crate (§6) — a real deployment embeds `trellis_ldp::web::build` behind
/// its own. Lacking one, `serve` falls back to [`trellis_ldp::memory`]'s
/// reference backend: no persistence, no real ACL evaluation, no real
/// SPARQL engine. Fine for local development; never point this at
/// untrusted traffic.
async fn serve(config: ServerConfig) -> ExitCode {
    tracing::warn!("no production backend configured; serving with the non-persistent reference backend (see src/memory.rs)");

    let bind_address = config.bind_address.clone();
    let port = config.port;
    let partitions = config.partitions.clone();

    let state = AppStateInner {
        config,
        resources: Arc::new(InMemoryResourceService::default()),
        binaries: Arc::new(InMemoryBinaryService::new(&partitions)),
        io: Arc::new(InMemoryIOService::default()),
        constraints: Arc::new(InMemoryConstraintService::default()),
        agents: Arc::new(InMemoryAgentService::default()),
        access_control: Arc::new(InMemoryAccessControlService::default()),
        root_metadata: RootMetadata::default(),
    };

    let router = web::build(state);

    let address = format!("{bind_address}:{port}");
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%address, %error, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%address, "listening");
    if let Err(error) = axum::serve(listener, router).await {
        tracing::error!(%error, "server exited with an error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
