//! MySQL driver layer for an ORM.
//!
//! The crate wraps a pooled `sqlx` MySQL client behind [`MysqlDriver`]:
//! lazy pool management, per-call connection ownership, text or binary
//! protocol execution selected by client kind, escaping, a MySQL dialect
//! formatter for logical queries, schema introspection and DDL helpers.

pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod logger;
pub mod models;

pub use config::Config;
pub use db::{DriverConnection, ExecuteOptions, Spellbook};
pub use driver::MysqlDriver;
pub use error::{DbError, DbResult};
pub use logger::{QueryLogger, TracingQueryLogger};
pub use models::{ClientKind, DriverConfig, QueryParam, QueryResult, Spell};
