//! orm-mysql-driver command line entry point.
//!
//! Runs one statement or describes tables through the driver and prints the
//! result as JSON.

use orm_mysql_driver::config::{Command, Config, parse_params};
use orm_mysql_driver::{DbError, MysqlDriver};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DbError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| DbError::internal(format!("Failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

async fn run(config: &Config) -> Result<(), DbError> {
    let (client, driver_config) = config.driver_settings()?;
    let driver = MysqlDriver::with_client(client, driver_config)?;

    info!(
        client = %driver.client(),
        database = %driver.database(),
        "Starting orm-mysql-driver v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = match &config.command {
        Command::Query { sql, params } => {
            let params = parse_params(params)?;
            let result = driver.query(sql, &params).await;
            result.and_then(|r| print_json(&r))
        }
        Command::Schema { tables } => {
            let tables: Vec<&str> = tables.iter().map(String::as_str).collect();
            let result = driver.query_schema_info(&tables).await;
            result.and_then(|r| print_json(&r))
        }
        Command::Tables => {
            let result = driver.list_tables().await;
            result.and_then(|r| print_json(&r))
        }
    };

    driver.close().await;
    result
}

#[tokio::main]
async fn main() {
    let config = Config::parse_args();
    init_tracing(&config);

    if let Err(e) = run(&config).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Suggestion: {suggestion}");
        }
        std::process::exit(1);
    }
}
