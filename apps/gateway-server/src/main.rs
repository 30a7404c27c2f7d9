//! Gateway process entrypoint: CLI parsing, config loading, Connection
//! Manager bootstrap, and transport dispatch (spec §6).
//!
//! Exit codes (spec §6): `0` clean shutdown, `1` config or startup
//! failure, `2` fatal runtime error after start.

use clap::Parser;
use gateway_config::{Cli, Commands, ConfigSources};
use gateway_core::GatewayCore;
use gateway_manager::{ConnectionManager, Lifecycle};
use gateway_rpc::Dispatcher;
use gateway_tx::TransactionRegistry;
use mimalloc::MiMalloc;
use std::process::ExitCode;
use std::sync::Arc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Distinguishes config/startup failures (exit `1`) from failures after
/// the transport has started serving (exit `2`).
enum AppError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    gateway_config::logging::init(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::from(0),
        Err(AppError::Startup(e)) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
        Err(AppError::Runtime(e)) => {
            tracing::error!(error = %e, "fatal runtime error");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let sources = ConfigSources {
        file_path: cli.config.clone().map(std::path::PathBuf::from),
        inline_json: cli.db_config.clone(),
    };
    let connections =
        gateway_config::load_connections(&sources).map_err(|e| AppError::Startup(e.into()))?;

    if cli.print_config {
        print_redacted(&connections);
        return Ok(());
    }

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Check => {
            println!("Configuration check passed");
            print_redacted(&connections);
            Ok(())
        }
        Commands::Run => serve(cli, connections).await,
    }
}

async fn serve(
    cli: Cli,
    connections: Vec<gateway_config::ConnectionSpec>,
) -> Result<(), AppError> {
    let db_ids = {
        let mut ids: Vec<String> = connections.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids
    };

    let manager = Arc::new(ConnectionManager::new(connections, Lifecycle::Eager));
    manager
        .connect()
        .await
        .map_err(|e| AppError::Startup(e.into()))?;

    let core = Arc::new(GatewayCore::new(
        manager,
        Arc::new(TransactionRegistry::new()),
    ));
    let server_name = gateway_config::source::server_name();
    let dispatcher = Arc::new(Dispatcher::new(&server_name, &db_ids, core));

    match cli.transport_mode().as_str() {
        "sse" => serve_sse(&cli, dispatcher).await,
        _ => serve_stdio(dispatcher).await,
    }
}

async fn serve_stdio(dispatcher: Arc<Dispatcher>) -> Result<(), AppError> {
    tracing::info!("serving JSON-RPC over stdio");
    gateway_rpc::stdio::serve(dispatcher)
        .await
        .map_err(|e| AppError::Runtime(e.into()))
}

async fn serve_sse(cli: &Cli, dispatcher: Arc<Dispatcher>) -> Result<(), AppError> {
    let host = cli.host.clone().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = cli.port.unwrap_or(8080);
    let addr = format!("{host}:{port}");

    let router = gateway_rpc::sse::router(dispatcher);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Startup(e.into()))?;

    tracing::info!(%addr, "serving JSON-RPC over SSE+HTTP");
    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Runtime(e.into()))
}

/// Prints the connection list with secrets masked, for `--print-config`
/// and `check` (spec §6).
fn print_redacted(connections: &[gateway_config::ConnectionSpec]) {
    let redacted: Vec<serde_json::Value> = connections
        .iter()
        .map(|c| {
            let mut value = serde_json::to_value(c).unwrap_or(serde_json::Value::Null);
            if let Some(obj) = value.as_object_mut() {
                for key in ["password", "cipherKey", "cipher_key"] {
                    if obj.contains_key(key) {
                        obj.insert(key.to_string(), serde_json::json!("***"));
                    }
                }
            }
            value
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "connections": redacted }))
            .unwrap_or_default()
    );
}
