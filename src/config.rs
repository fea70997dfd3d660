//! Configuration management for the WhatsApp API.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `WA_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` (default): run the HTTP server
//! - `token`: issue an API bearer token
//! - `check`: probe the upstream gateway
//!
//! # Environment Variables
//!
//! - `WA_HOST` - Server bind address (default: 0.0.0.0)
//! - `WA_PORT` - Server port (default: 3000)
//! - `WA_GATEWAY_URL` - Base URL of the upstream WhatsApp gateway
//! - `WA_GATEWAY_TOKEN` - Bearer token for the upstream gateway
//! - `WA_GATEWAY_TIMEOUT` - Gateway request timeout in seconds (default: 10)
//! - `WA_POLL_INTERVAL` - Session refresh interval in seconds (default: 5)
//! - `WA_AUTH_SECRET` - HMAC secret for API bearer tokens
//! - `WA_AUTH_ENABLED` - Enable authentication (default: true)
//! - `WA_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default gateway request timeout in seconds.
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Default session refresh interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default token lifetime in seconds (1 day).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86400;

/// Maximum token lifetime in seconds (365 days).
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 86400;

// =============================================================================
// CLI
// =============================================================================

/// WhatsApp API - a JSON REST API in front of a WhatsApp gateway.
#[derive(Parser, Debug, Clone)]
#[command(name = "whatsapp-api")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options, used when no subcommand is given
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Issue an API bearer token
    Token(TokenConfig),

    /// Check connectivity to the upstream gateway
    Check(CheckConfig),
}

// =============================================================================
// Serve
// =============================================================================

/// Options for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WA_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WA_PORT")]
    pub port: u16,

    // =========================================================================
    // Gateway Configuration
    // =========================================================================
    /// Base URL of the upstream WhatsApp gateway.
    ///
    /// If not specified, the server still starts but every WhatsApp endpoint
    /// answers "WhatsApp service not initialized".
    #[arg(long, env = "WA_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Bearer token sent to the upstream gateway.
    #[arg(long, env = "WA_GATEWAY_TOKEN")]
    pub gateway_token: Option<String>,

    /// Gateway request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_GATEWAY_TIMEOUT_SECS, env = "WA_GATEWAY_TIMEOUT")]
    pub gateway_timeout: u64,

    /// Interval between session state refreshes, in seconds.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS, env = "WA_POLL_INTERVAL")]
    pub poll_interval: u64,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 bearer tokens.
    ///
    /// If not provided and auth is enabled, the server will fail to start.
    #[arg(long, env = "WA_AUTH_SECRET")]
    pub auth_secret: Option<String>,

    /// Require bearer tokens on the WhatsApp operation endpoints.
    ///
    /// WARNING: Only disable authentication in development/testing.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "WA_AUTH_ENABLED")]
    pub auth_enabled: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WA_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_enabled && self.auth_secret.as_deref().map_or(true, str::is_empty) {
            return Err(
                "Authentication is enabled but no secret provided. \
                 Set --auth-secret or WA_AUTH_SECRET, or disable auth with --auth-enabled=false"
                    .to_string(),
            );
        }

        if let Some(ref url) = self.gateway_url {
            validate_gateway_url(url)?;
        }

        if self.gateway_timeout == 0 {
            return Err("gateway_timeout must be greater than 0".to_string());
        }
        if self.poll_interval == 0 {
            return Err("poll_interval must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the auth secret, or an empty string if not set (call validate() first).
    pub fn auth_secret_or_empty(&self) -> &str {
        self.auth_secret.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Token
// =============================================================================

/// Output format for the `token` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOutputFormat {
    /// Just the token
    #[default]
    Token,
    /// JSON object with token and expiry
    Json,
    /// A ready-to-use Authorization header
    Header,
}

/// Options for the `token` command.
#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Secret key used to sign the token (must match the server's).
    #[arg(long, env = "WA_AUTH_SECRET")]
    pub secret: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret must not be empty. Set --secret or WA_AUTH_SECRET".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        if self.ttl > MAX_TOKEN_TTL_SECS {
            return Err(format!(
                "ttl must be at most {} seconds (365 days)",
                MAX_TOKEN_TTL_SECS
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Check
// =============================================================================

/// Options for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Base URL of the upstream WhatsApp gateway.
    #[arg(long, env = "WA_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Bearer token sent to the upstream gateway.
    #[arg(long, env = "WA_GATEWAY_TOKEN")]
    pub gateway_token: Option<String>,

    /// Gateway request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_GATEWAY_TIMEOUT_SECS, env = "WA_GATEWAY_TIMEOUT")]
    pub gateway_timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    /// Resolve the gateway URL, failing if it is missing or invalid.
    pub fn resolve_gateway_url(&self) -> Result<String, String> {
        let url = self
            .gateway_url
            .clone()
            .ok_or_else(|| "Gateway URL is required. Set --gateway-url or WA_GATEWAY_URL".to_string())?;
        validate_gateway_url(&url)?;
        Ok(url)
    }
}

fn validate_gateway_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid gateway URL '{}': {}", url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "Invalid gateway URL scheme '{}': expected http or https",
            scheme
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================
