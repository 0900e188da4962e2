//! Configuration management for the group study server.
//!
//! Settings come from command-line flags or the environment variables the
//! deployment already uses (`DB_USER`, `DB_PASS`, `ACCESS_TOKEN_SECRET`,
//! `PORT`, ...). Running the binary without a subcommand is the same as
//! `serve`.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use group_study_server::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Token(_) | Command::Check(_) => {}
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 5000)
//! - `DB_USER`, `DB_PASS` - MongoDB credentials (required for the mongo store)
//! - `DB_HOST` - Atlas cluster host
//! - `DB_NAME` - Database name (default: onlinegroupstudyDB)
//! - `DB_APP_NAME` - `appName` connection option (default: Cluster0)
//! - `ACCESS_TOKEN_SECRET` - HMAC secret for credentials (required)
//! - `STORE_BACKEND` - `mongo` or `memory` (default: mongo)
//! - `CORS_ORIGINS` - Comma-separated allowed origins

use std::fmt;

use clap::{Args, Parser, Subcommand, ValueEnum};
use validator::Validate;

use crate::error::format_validation_errors;
use crate::store::{MongoStore, DEFAULT_DB_APP_NAME, DEFAULT_DB_HOST, DEFAULT_DB_NAME};
use crate::token::TokenClaims;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Group Study Server - REST API for the online group study app.
#[derive(Parser, Debug, Clone)]
#[command(name = "group-study-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Serve options when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API server (default).
    Serve(ServeConfig),

    /// Issue a credential offline, e.g. for curl testing.
    Token(TokenConfig),

    /// Check database connectivity.
    Check(CheckConfig),
}

/// Where documents are kept.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// MongoDB Atlas cluster
    Mongo,
    /// In-process store, emptied on restart
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Mongo => write!(f, "mongo"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// MongoDB connection settings.
#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// Database user.
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password.
    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    /// Atlas cluster host.
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "DB_HOST")]
    pub db_host: String,

    /// Database name.
    #[arg(long, default_value = DEFAULT_DB_NAME, env = "DB_NAME")]
    pub db_name: String,

    /// `appName` connection option.
    #[arg(long, default_value = DEFAULT_DB_APP_NAME, env = "DB_APP_NAME")]
    pub db_app_name: String,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.db_user.as_deref().unwrap_or("").is_empty() {
            return Err("Database user is required. Set --db-user or DB_USER".to_string());
        }
        if self.db_pass.as_deref().unwrap_or("").is_empty() {
            return Err("Database password is required. Set --db-pass or DB_PASS".to_string());
        }
        if self.db_host.is_empty() {
            return Err("Database host cannot be empty".to_string());
        }
        if self.db_name.is_empty() {
            return Err("Database name cannot be empty".to_string());
        }
        Ok(())
    }

    /// Full `mongodb+srv://` connection string.
    pub fn connection_uri(&self) -> Result<String, String> {
        self.validate()?;
        Ok(MongoStore::connection_uri(
            self.db_user.as_deref().unwrap_or(""),
            self.db_pass.as_deref().unwrap_or(""),
            &self.db_host,
            &self.db_app_name,
        ))
    }
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Secret used to sign and verify credentials.
    ///
    /// If not provided, the server will fail to start.
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Document store backend.
    ///
    /// `memory` needs no database and loses everything on restart.
    #[arg(long = "store", value_enum, default_value_t = StoreBackend::Mongo, env = "STORE_BACKEND")]
    pub store: StoreBackend,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows the hosted web client origins.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

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
        if self.token_secret.as_deref().unwrap_or("").is_empty() {
            return Err(
                "Token secret is required. Set --token-secret or ACCESS_TOKEN_SECRET".to_string(),
            );
        }

        if self.store == StoreBackend::Mongo {
            self.database.validate()?;
        }

        if let Some(origins) = &self.cors_origins {
            if origins.iter().any(|origin| origin.trim().is_empty()) {
                return Err("CORS origins cannot contain empty entries".to_string());
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the token secret (call validate() first).
    pub fn token_secret_or_empty(&self) -> &str {
        self.token_secret.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Token
// =============================================================================

/// Output format of the `token` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutputFormat {
    /// Bare token
    Token,
    /// Token, claims and lifetime as JSON
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Secret used to sign the credential.
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    /// Email claim of the credential.
    #[arg(long)]
    pub email: Option<String>,

    /// Additional string claim as KEY=VALUE (repeatable).
    #[arg(long = "claim", value_name = "KEY=VALUE")]
    pub claims: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret.is_empty() {
            return Err("Token secret cannot be empty".to_string());
        }
        Ok(())
    }

    /// Build the claims from `--email` and `--claim` flags.
    pub fn parse_claims(&self) -> Result<TokenClaims, String> {
        let mut claims = TokenClaims {
            email: self.email.clone(),
            ..TokenClaims::default()
        };

        for pair in &self.claims {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid claim '{}': expected KEY=VALUE", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("Invalid claim '{}': empty key", pair));
            }
            if key == "email" {
                return Err("Use --email to set the email claim".to_string());
            }
            claims = claims.with_claim(key, value);
        }

        claims
            .validate()
            .map_err(|e| format_validation_errors(&e))?;
        Ok(claims)
    }
}

// =============================================================================
// Check
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Also report the number of documents in each collection.
    #[arg(long, default_value_t = false)]
    pub counts: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
