//! WhatsApp API - a JSON REST API in front of a WhatsApp gateway.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whatsapp_api::{
    config::{CheckConfig, Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat},
    server::{create_router, ApiTokenAuth, RouterConfig},
    service::{GatewayConfig, GatewayService, WhatsAppService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("WhatsApp API v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");

    if config.auth_enabled {
        info!("  Auth: enabled");
    } else {
        warn!("  Auth: DISABLED - all endpoints are publicly accessible");
        warn!("        Enable for production: --auth-enabled=true --auth-secret=<secret>");
    }

    let service = match config.gateway_url {
        Some(ref url) => {
            info!("  Gateway: {}", url);
            match connect_gateway(&config, url).await {
                Ok(service) => Some(service),
                Err(e) => {
                    error!("Failed to set up gateway client: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            warn!("  Gateway: not configured - WhatsApp endpoints will report not initialized");
            warn!("           Set --gateway-url or WA_GATEWAY_URL");
            None
        }
    };

    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/whatsapp/health", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Create the gateway bridge, take an initial snapshot and start polling.
async fn connect_gateway(
    config: &ServeConfig,
    url: &str,
) -> Result<Arc<dyn WhatsAppService>, String> {
    let mut gateway_config =
        GatewayConfig::new(url).with_timeout(Duration::from_secs(config.gateway_timeout));
    if let Some(ref token) = config.gateway_token {
        gateway_config = gateway_config.with_token(token);
    }

    let gateway = GatewayService::new(gateway_config).map_err(|e| e.to_string())?;

    // An unreachable gateway is not fatal; the poller keeps retrying
    match gateway.refresh().await {
        Ok(snapshot) => {
            info!("  Connected to gateway");
            info!(
                "  Session: connected={}, logged_in={}",
                snapshot.connected, snapshot.logged_in
            );
        }
        Err(e) => {
            warn!("  Gateway not reachable yet: {}", e);
        }
    }

    gateway.spawn_poller(Duration::from_secs(config.poll_interval));

    Ok(Arc::new(gateway))
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "whatsapp_api=debug,tower_http=debug"
    } else {
        "whatsapp_api=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = if config.auth_enabled {
        RouterConfig::new(config.auth_secret_or_empty())
    } else {
        RouterConfig::without_auth()
    };

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let auth = ApiTokenAuth::new(&config.secret);
    let (token, expiry) = auth.issue(Duration::from_secs(config.ttl));

    match config.format {
        TokenOutputFormat::Token => {
            println!("{}", token);
        }
        TokenOutputFormat::Header => {
            println!("Authorization: Bearer {}", token);
        }
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "expiry": expiry,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("WhatsApp API Gateway Check");
    println!("══════════════════════════");
    println!();

    let url = match config.resolve_gateway_url() {
        Ok(url) => {
            println!("✓ Gateway: {}", url);
            url
        }
        Err(e) => {
            println!("✗ Gateway: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut gateway_config =
        GatewayConfig::new(url).with_timeout(Duration::from_secs(config.gateway_timeout));
    if let Some(ref token) = config.gateway_token {
        gateway_config = gateway_config.with_token(token);
    }

    let gateway = match GatewayService::new(gateway_config) {
        Ok(gateway) => gateway,
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!();
    print!("Fetching session... ");

    let snapshot = match gateway.fetch_session().await {
        Ok(snapshot) => {
            println!("✓ success");
            snapshot
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The gateway is running and reachable");
            println!("  - The gateway URL is correct");
            if config.gateway_token.is_some() {
                println!("  - The gateway token is valid");
            }
            return ExitCode::FAILURE;
        }
    };

    println!();
    println!("Session:");
    println!("─────────");
    println!("  Credential store: {}", yes_no(snapshot.store_ready));
    println!("  Client:           {}", yes_no(snapshot.client_ready));
    println!("  Connected:        {}", yes_no(snapshot.connected));
    println!("  Logged in:        {}", yes_no(snapshot.logged_in));
    if let Some(ref device) = snapshot.device {
        println!("  Device:           {} ({})", device.name, device.id);
    }

    println!();
    println!("══════════════════════════");
    if snapshot.connected && snapshot.logged_in {
        println!("✓ All checks passed!");
    } else {
        println!("! Gateway reachable, but the session is not fully operational");
    }

    ExitCode::SUCCESS
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
