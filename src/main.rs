// src/main.rs

use axum::serve;
use nvidia_proxy::{
    cli::{Cli, Commands},
    key_rotator::KeyRotator,
    run_with_overrides, setup_configuration, AppError, ServerOverrides,
};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!(signal = "Ctrl+C", "Received signal. Initiating graceful shutdown...") },
        () = terminate => { info!(signal = "Terminate", "Received signal. Initiating graceful shutdown...") },
    }
}

fn init_tracing(json_logs: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

fn server_overrides(cli: &Cli) -> ServerOverrides {
    ServerOverrides {
        host: cli.host.clone(),
        port: cli.port,
    }
}

fn check_config(cli: &Cli) -> Result<(), AppError> {
    let config = setup_configuration(cli.config.clone(), &server_overrides(cli))?;
    let previews: Vec<String> = config
        .api_keys
        .iter()
        .map(|k| KeyRotator::preview_key(&SecretString::new(k.clone())))
        .collect();

    println!("Configuration OK");
    println!("  listen:   {}:{}", config.server.host, config.server.port);
    println!("  upstream: {}", config.upstream.base_url);
    println!("  keys:     {} ({})", previews.len(), previews.join(", "));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse_args();
    init_tracing(cli.json_logs);

    if cli.selected_command() == Commands::CheckConfig {
        return check_config(&cli).map_err(|e| {
            eprintln!("Configuration error: {e}");
            e
        });
    }

    let (app, config) = run_with_overrides(cli.config.clone(), &server_overrides(&cli))
        .await
        .map_err(|e| {
            eprintln!("Application setup error: {e:?}");
            e
        })?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!(server.address = %addr, error = ?e, "Failed to bind to address. Exiting.");
        AppError::from(e)
    })?;
    info!(server.address = %addr, "Server listening");

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = ?e, "Server run loop encountered an error. Exiting.");
            AppError::from(e)
        })?;

    info!("Server shut down gracefully.");
    Ok(())
}
