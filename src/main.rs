use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voice_relay::{ServerConfig, auth::EmailAllowList, routes, state::AppState};

/// voice-relay - real-time speech interpretation gateway
#[derive(Parser, Debug)]
#[command(name = "voice-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to serving)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the server
    Serve,

    /// Issue an access token signed with the configured secret
    Token {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage the email allow-list file
    Allowlist {
        #[command(subcommand)]
        action: AllowlistAction,
    },
}

#[derive(Subcommand, Debug)]
enum AllowlistAction {
    Add { email: String },
    Remove { email: String },
    List,
}

fn init_tracing() {
    // RUST_LOG wins, then LOG_LEVEL, then info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    let config = match path {
        Some(config_path) => {
            info!("Loading configuration from {}", config_path.display());
            ServerConfig::from_file(&config_path)?
        }
        None => ServerConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    init_tracing();

    // Initialize crypto provider for TLS connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Token { email, name } => issue_token(config, &email, name.as_deref()),
        Commands::Allowlist { action } => manage_allowlist(config, action),
    }
}

fn issue_token(config: ServerConfig, email: &str, name: Option<&str>) -> anyhow::Result<()> {
    let service = voice_relay::auth::AuthService::from_config(&config)?
        .ok_or_else(|| anyhow!("JWT_SECRET_KEY must be set to issue tokens"))?;
    let token = service.issue_token(email, name)?;
    if !service.allow_list().is_allowed(email) {
        eprintln!("warning: {email} is not on the allow-list");
    }
    println!("{token}");
    Ok(())
}

fn manage_allowlist(config: ServerConfig, action: AllowlistAction) -> anyhow::Result<()> {
    let file = config
        .whitelist_file
        .clone()
        .ok_or_else(|| anyhow!("WHITELIST_FILE must be set to manage the allow-list"))?;
    let list = EmailAllowList::load(&[], Some(file.clone()))
        .with_context(|| format!("Failed to read {}", file.display()))?;

    match action {
        AllowlistAction::Add { email } => {
            if list.add(&email)? {
                println!("Added {email}");
            } else {
                println!("{email} is already allowed");
            }
        }
        AllowlistAction::Remove { email } => {
            if list.remove(&email)? {
                println!("Removed {email}");
            } else {
                println!("{email} was not on the allow-list");
            }
        }
        AllowlistAction::List => {
            for email in list.emails() {
                println!("{email}");
            }
        }
    }
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let tls_config = config.tls();
    info!(
        provider = %config.realtime_provider,
        model = %config.gemini_model,
        auth_required = config.auth_required,
        "Starting server on {address}"
    );

    let app_state = AppState::new(config)?;
    let app = routes::create_app(app_state);

    // Start server with or without TLS
    if let Some(tls) = tls_config {
        let socket_addr: SocketAddr = tokio::net::lookup_host(&address)
            .await
            .with_context(|| format!("Invalid server address '{address}'"))?
            .next()
            .ok_or_else(|| anyhow!("Server address '{address}' did not resolve"))?;

        // Load TLS configuration from certificate and key files
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to load TLS certificates from {} and {}: {}",
                    tls.cert_path.display(),
                    tls.key_path.display(),
                    e
                )
            })?;

        info!("Server listening on https://{} (TLS enabled)", socket_addr);

        axum_server::bind_rustls(socket_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| anyhow!("TLS server error: {}", e))?;
    } else {
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;
        info!("Server listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
