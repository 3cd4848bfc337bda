use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use axum::{
    Router,
    routing::{any, get},
};
use clap::{Parser, Subcommand};
use http::{HeaderValue, header};
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

mod audit;
mod auth;
mod config;
mod error;
mod forward;
mod middleware;
mod observability;
mod policy;
mod ratelimit;
mod routes;
mod state;

use config::AppConfig;
use state::AppState;

/// Fixed Server header value.
const SERVER_NAME: &str = "authgate";

#[derive(Parser)]
#[command(name = "authgate", version, about = "Forward-auth decision sidecar")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server (default).
    Serve {
        /// Path to the TOML configuration file.
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },

    /// Parse and validate a configuration file, then exit.
    Validate {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },

    /// Read a password from stdin and print its bcrypt hash.
    HashPassword {
        /// bcrypt cost factor (4-31).
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve {
        config: PathBuf::from("config.toml"),
    }) {
        Command::Serve { config } => serve(config).await,
        Command::Validate { config } => validate(&config),
        Command::HashPassword { cost } => hash_password(cost),
    }
}

async fn serve(config_path: PathBuf) -> ExitCode {
    let config = match AppConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error [{}]: {e}", e.code().as_str());
            return ExitCode::FAILURE;
        }
    };

    observability::init_tracing(&config.logging);

    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(
                code = error::ErrorCode::ServerStartup.as_str(),
                error = %e,
                "failed to initialize"
            );
            return ExitCode::FAILURE;
        }
    };

    let app = build_app(&config, state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                code = error::ErrorCode::ServerStartup.as_str(),
                error = %e,
                %addr,
                "failed to bind listener"
            );
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        %addr,
        auth_path = %config.server.auth_path,
        health_path = %config.server.health_path,
        basic = config.basic_auth.len(),
        bearer = config.bearer_token.len(),
        api_keys = config.api_key.len(),
        jwt = config.jwt_enabled(),
        policies = config.route_policy.len(),
        "authgate listening"
    );

    #[cfg(unix)]
    spawn_reload_listener(state.clone(), config_path);

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    state.shutdown();

    match result {
        Ok(()) => {
            tracing::info!("shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(
                code = error::ErrorCode::ServerInternal.as_str(),
                error = %e,
                "server error"
            );
            ExitCode::FAILURE
        }
    }
}

/// Assemble the router. Paths come from the initial configuration;
/// a reload swaps credentials and policies but does not re-bind routes.
pub fn build_app(config: &AppConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route(&config.server.auth_path, any(routes::handle_auth))
        .route(&config.server.health_path, get(routes::handle_health));

    if config.server.enable_debug {
        app = app.route("/debug/config", get(routes::handle_debug));
    }

    app.layer(axum::middleware::from_fn(
        middleware::request_id_middleware,
    ))
    .layer(middleware::catch_panic_layer())
    .layer(TraceLayer::new_for_http())
    .layer(TimeoutLayer::new(Duration::from_secs(
        config.server.write_timeout,
    )))
    .layer(SetResponseHeaderLayer::overriding(
        header::SERVER,
        HeaderValue::from_static(SERVER_NAME),
    ))
    .with_state(state)
}

/// SIGINT / SIGTERM end the accept loop; in-flight requests drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

/// SIGHUP reloads the configuration in place. A broken file keeps the
/// previous configuration serving.
#[cfg(unix)]
fn spawn_reload_listener(state: AppState, config_path: PathBuf) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGHUP handler");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            tracing::info!(path = %config_path.display(), "SIGHUP received, reloading");
            match AppConfig::from_file(&config_path) {
                Ok(config) => {
                    if let Err(e) = state.reload(config) {
                        observability::metrics::record_reload("error");
                        tracing::error!(error = %e, "reload failed; keeping previous configuration");
                    }
                }
                Err(e) => {
                    observability::metrics::record_reload("error");
                    tracing::error!(
                        code = e.code().as_str(),
                        error = %e,
                        "reload failed; keeping previous configuration"
                    );
                }
            }
        }
    });
}

fn validate(config_path: &PathBuf) -> ExitCode {
    match AppConfig::from_file(config_path) {
        Ok(config) => {
            println!(
                "{}: OK ({} basic, {} bearer, {} api keys, jwt {}, {} policies)",
                config_path.display(),
                config.basic_auth.len(),
                config.bearer_token.len(),
                config.api_key.len(),
                if config.jwt_enabled() { "on" } else { "off" },
                config.route_policy.len(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: [{}] {e}", config_path.display(), e.code().as_str());
            ExitCode::FAILURE
        }
    }
}

fn hash_password(cost: u32) -> ExitCode {
    if !(4..=31).contains(&cost) {
        eprintln!("cost must be between 4 and 31");
        return ExitCode::FAILURE;
    }

    eprint!("Password: ");
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        eprintln!("failed to read password from stdin");
        return ExitCode::FAILURE;
    }
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        eprintln!("password cannot be empty");
        return ExitCode::FAILURE;
    }

    match bcrypt::hash(password, cost) {
        Ok(hash) => {
            println!("{hash}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to hash password: {e}");
            ExitCode::FAILURE
        }
    }
}
