//! Query logging.
//!
//! The executor hands every statement to a [`QueryLogger`] before sending it.
//! Logging is fire-and-forget: a failing logger is reported and otherwise
//! ignored.

use crate::db::escape::Escaper;
use crate::error::DbError;
use crate::models::{ClientKind, QueryParam};
use tracing::{debug, warn};

/// Target used for per-statement log lines, so they can be filtered with
/// `RUST_LOG=orm_mysql_driver::query=debug`.
pub const QUERY_LOG_TARGET: &str = "orm_mysql_driver::query";

pub type LogResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Context passed to [`QueryLogger::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogContext {
    pub client: ClientKind,
    /// True when the statement runs on a connection the caller checked out.
    pub caller_owned_connection: bool,
}

pub trait QueryLogger: Send + Sync {
    /// Render a statement and its parameters as one log line.
    fn format(&self, sql: &str, params: &[QueryParam], context: &LogContext) -> String;

    /// Record a formatted statement.
    fn log_query(&self, line: &str) -> LogResult;

    /// Called after a statement failed.
    fn log_query_error(&self, line: &str, error: &DbError) {
        warn!(target: QUERY_LOG_TARGET, sql = %line, error = %error, "Query failed");
    }
}

/// Emits statements through `tracing` at debug level, with the parameters
/// interpolated.
#[derive(Debug, Clone, Default)]
pub struct TracingQueryLogger {
    escaper: Escaper,
}

impl TracingQueryLogger {
    pub fn new(escaper: Escaper) -> Self {
        Self { escaper }
    }
}

impl QueryLogger for TracingQueryLogger {
    fn format(&self, sql: &str, params: &[QueryParam], context: &LogContext) -> String {
        let sql = self.escaper.format(sql, params);
        if context.caller_owned_connection {
            format!("[{}:owned] {}", context.client, sql)
        } else {
            format!("[{}] {}", context.client, sql)
        }
    }

    fn log_query(&self, line: &str) -> LogResult {
        debug!(target: QUERY_LOG_TARGET, "{line}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_interpolates_params() {
        let logger = TracingQueryLogger::default();
        let context = LogContext {
            client: ClientKind::Mysql2,
            caller_owned_connection: false,
        };
        let line = logger.format(
            "SELECT * FROM users WHERE name = ?",
            &["it's".into()],
            &context,
        );
        assert_eq!(line, r"[mysql2] SELECT * FROM users WHERE name = 'it\'s'");
    }

    #[test]
    fn test_format_marks_caller_owned_connection() {
        let logger = TracingQueryLogger::default();
        let context = LogContext {
            client: ClientKind::Mysql,
            caller_owned_connection: true,
        };
        assert_eq!(logger.format("BEGIN", &[], &context), "[mysql:owned] BEGIN");
        assert!(logger.log_query("BEGIN").is_ok());
    }
}
