//! Connection-related data models.
//!
//! This module defines the supported client kinds and the configuration a
//! driver is constructed from.

use crate::config::PoolOptions;
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_CONNECTION_LIMIT: u32 = 10;

/// Supported client kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// Client-side parameter interpolation over the text protocol
    #[default]
    Mysql,
    /// Server-side parameter binding through prepared statements
    Mysql2,
}

impl ClientKind {
    /// The name callers use to select this client.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mysql2 => "mysql2",
        }
    }

    /// Resolve the protocol strategy for this client.
    pub fn protocol(&self) -> ClientProtocol {
        match self {
            Self::Mysql => ClientProtocol::Text,
            Self::Mysql2 => ClientProtocol::Binary,
        }
    }
}

impl FromStr for ClientKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Self::Mysql),
            "mysql2" => Ok(Self::Mysql2),
            other => Err(DbError::unsupported_client(other)),
        }
    }
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How statement parameters reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProtocol {
    /// Values are escaped into the SQL text before sending.
    Text,
    /// Values are bound to a prepared statement.
    Binary,
}

/// Configuration for one database target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// The schema name as recorded in `information_schema`.
    pub database: String,
    /// Some deployments locate the database by an application name that
    /// differs from the schema name. Takes precedence when connecting.
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
    #[serde(default)]
    pub pool_options: PoolOptions,
    /// Set when the server runs with `sql_mode=NO_BACKSLASH_ESCAPES`.
    #[serde(default)]
    pub no_backslash_escapes: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_connection_limit() -> u32 {
    DEFAULT_CONNECTION_LIMIT
}

impl DriverConfig {
    /// Create a configuration for `database` on the default local server.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            user: default_user(),
            password: None,
            database: database.into(),
            app_name: None,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            pool_options: PoolOptions::default(),
            no_backslash_escapes: false,
        }
    }

    /// Set the server address.
    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = user.into();
        self.password = password;
        self
    }

    /// Set the application name used to locate the database.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Set the maximum number of open connections.
    pub fn with_connection_limit(mut self, limit: u32) -> Self {
        self.connection_limit = limit;
        self
    }

    /// Set the pool tuning options.
    pub fn with_pool_options(mut self, pool_options: PoolOptions) -> Self {
        self.pool_options = pool_options;
        self
    }

    /// The database name used for connecting: the app name when present,
    /// the literal database otherwise.
    pub fn connect_database(&self) -> &str {
        match self.app_name.as_deref() {
            Some(app_name) if !app_name.is_empty() => app_name,
            _ => &self.database,
        }
    }

    /// The literal schema name that metadata queries filter by.
    pub fn schema_database(&self) -> &str {
        &self.database
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.connect_database().is_empty() {
            return Err(DbError::invalid_input(
                "database (or app_name) must not be empty",
            ));
        }
        if self.connection_limit == 0 {
            return Err(DbError::invalid_input(
                "connection_limit must be greater than 0",
            ));
        }
        self.pool_options
            .validate(self.connection_limit)
            .map_err(DbError::invalid_input)
    }
}
