//! Group Study Server - REST API for the online group study app.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use group_study_server::{
    config::{
        CheckConfig, Cli, Command, DatabaseConfig, ServeConfig, StoreBackend, TokenConfig,
        TokenOutputFormat,
    },
    server::{create_router, RouterConfig},
    store::{Collection, DocumentStore, Filter, MemoryStore, MongoStore},
    token::TokenService,
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

    print_banner();

    info!("Configuration:");
    info!("  Store: {}", config.store);
    if config.store == StoreBackend::Mongo {
        info!("  Database: {} on {}", config.database.db_name, config.database.db_host);
    }
    let router_config = build_router_config(&config);
    info!("  CORS origins: {}", router_config.cors_origins.join(", "));

    let router = match config.store {
        StoreBackend::Mongo => {
            info!("");
            info!("Connecting to MongoDB...");
            match connect_mongo(&config.database).await {
                Ok(store) => {
                    info!("  Connected successfully");
                    create_router(store, router_config)
                }
                Err(e) => {
                    error!("  Failed to connect to MongoDB: {}", e);
                    error!("");
                    error!("  Please check:");
                    error!("    - DB_USER and DB_PASS are correct");
                    error!("    - The cluster '{}' is reachable", config.database.db_host);
                    error!("    - This machine's IP is on the Atlas access list");
                    return ExitCode::FAILURE;
                }
            }
        }
        StoreBackend::Memory => {
            warn!("  Store: MEMORY - all data is lost when the server stops");
            create_router(MemoryStore::new(), router_config)
        }
    };

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/assignments", addr);
    info!("────────────────────────────────────────────────────────────────");
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

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("  Online Group Study Server v{}", version);
    info!("");
}

/// Connect and ping, so a bad URI or credentials fail at startup.
async fn connect_mongo(database: &DatabaseConfig) -> Result<MongoStore, String> {
    let uri = database.connection_uri()?;
    let store = MongoStore::connect(&uri, &database.db_name)
        .await
        .map_err(|e| e.to_string())?;
    store.ping().await.map_err(|e| e.to_string())?;
    Ok(store)
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "group_study_server=debug,tower_http=debug"
    } else {
        "group_study_server=info,tower_http=info"
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
    let mut router_config = RouterConfig::new(config.token_secret_or_empty());

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

    let claims = match config.parse_claims() {
        Ok(claims) => claims,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tokens = TokenService::new(&config.token_secret);
    let token = match tokens.issue(&claims) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        TokenOutputFormat::Token => println!("{}", token),
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "claims": claims,
                "expiresIn": tokens.ttl().as_secs(),
                "cookie": format!("token={}", token),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(output) => println!("{}", output),
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

    println!("Group Study Server Configuration Check");
    println!("══════════════════════════════════════");
    println!();

    let uri = match config.database.connection_uri() {
        Ok(uri) => {
            println!("✓ Credentials: user '{}'", config.database.db_user.as_deref().unwrap_or(""));
            uri
        }
        Err(e) => {
            println!("✗ Credentials: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("✓ Host: {}", config.database.db_host);
    println!("✓ Database: {}", config.database.db_name);
    println!();

    print!("Testing MongoDB connection... ");

    let store = match MongoStore::connect(&uri, &config.database.db_name).await {
        Ok(store) => store,
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = store.ping().await {
        println!("✗ failed");
        println!();
        println!("Error: {}", e);
        println!();
        println!("Please check:");
        println!("  - DB_USER and DB_PASS are correct");
        println!("  - The cluster '{}' is reachable", config.database.db_host);
        return ExitCode::FAILURE;
    }
    println!("✓ success");

    if config.counts {
        println!();
        println!("Collections:");
        println!("────────────");

        for collection in Collection::ALL {
            match store.count(collection, &Filter::all()).await {
                Ok(count) => println!("  {:<20} {}", collection.name(), count),
                Err(e) => println!("  {:<20} error: {}", collection.name(), e),
            }
        }
    }

    println!();
    println!("══════════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
