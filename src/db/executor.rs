//! Query execution engine.
//!
//! [`QueryExecutor`] runs one statement per call, either on a connection the
//! caller supplies or on one borrowed from the pool for the duration of the
//! call. Any returned rows produce [`QueryResult::Rows`]; an empty result
//! is still `Rows` when the prepared statement declares columns, and
//! [`QueryResult::Raw`] otherwise.
//!
//! # Protocols
//!
//! - `Text` interpolates parameters with the pool's escaper and sends the
//!   statement over the text protocol.
//! - `Binary` binds parameters to a prepared statement.
//!
//! Both prepare the statement template first to read its column metadata.
//! Statements the server refuses to prepare (`BEGIN`, `LOCK TABLES`, ...)
//! run unprepared with their parameters interpolated.

use crate::db::escape::Escaper;
use crate::db::params::bind_all;
use crate::db::pool::{DriverConnection, PoolManager};
use crate::db::types::{RowToJson, fields_from_columns};
use crate::error::{DbError, DbResult, ER_UNSUPPORTED_PS};
use crate::logger::{LogContext, QueryLogger};
use crate::models::{
    ClientKind, ClientProtocol, FieldInfo, QueryParam, QueryResult, ResultHeader,
};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::mysql::{MySqlConnection, MySqlQueryResult, MySqlRow};
use sqlx::{Either, Executor, Statement};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Per-call execution options.
#[derive(Debug, Default)]
pub struct ExecuteOptions<'c> {
    /// Run on this caller-owned connection instead of a pooled one. The
    /// connection stays checked out after the call.
    pub connection: Option<&'c mut DriverConnection>,
}

impl<'c> ExecuteOptions<'c> {
    pub fn new() -> Self {
        Self { connection: None }
    }

    pub fn with_connection(connection: &'c mut DriverConnection) -> Self {
        Self {
            connection: Some(connection),
        }
    }
}

pub struct QueryExecutor {
    pool: PoolManager,
    client: ClientKind,
    protocol: ClientProtocol,
    logger: Arc<dyn QueryLogger>,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("client", &self.client)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

impl QueryExecutor {
    pub fn new(pool: PoolManager, client: ClientKind, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            pool,
            client,
            protocol: client.protocol(),
            logger,
        }
    }

    pub fn protocol(&self) -> ClientProtocol {
        self.protocol
    }

    pub(crate) fn set_logger(&mut self, logger: Arc<dyn QueryLogger>) {
        self.logger = logger;
    }

    /// Execute one statement.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[QueryParam],
        options: ExecuteOptions<'_>,
    ) -> DbResult<QueryResult> {
        let context = LogContext {
            client: self.client,
            caller_owned_connection: options.connection.is_some(),
        };
        let line = self.logger.format(sql, params, &context);
        if let Err(e) = self.logger.log_query(&line) {
            warn!(error = %e, "Query logger failed");
        }

        let start = Instant::now();
        let result = match options.connection {
            Some(conn) => self.run(conn.raw(), sql, params).await,
            None => match self.pool.acquire().await {
                Ok(mut conn) => {
                    let result = self.run(conn.raw(), sql, params).await;
                    if should_discard(&result) {
                        conn.discard();
                    }
                    result
                }
                Err(e) => Err(e),
            },
        };

        match &result {
            Ok(r) => debug!(
                client = %self.client,
                rows = r.rows().len(),
                affected_rows = ?r.affected_rows(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query completed"
            ),
            Err(e) => self.logger.log_query_error(&line, e),
        }
        result
    }

    async fn run(
        &self,
        conn: &mut MySqlConnection,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        let escaper = self.pool.escaper();
        let (template, values) = escaper.expand_for_binding(sql, params);

        let statement = match (&mut *conn).prepare(template.as_ref()).await {
            Ok(statement) => statement,
            Err(e) => {
                let err = DbError::query(e, sql);
                if err.code() == Some(ER_UNSUPPORTED_PS) {
                    debug!(sql = %sql, "Statement not preparable, running unprepared");
                    return run_unprepared(conn, escaper, sql, params).await;
                }
                return Err(err);
            }
        };
        let fields = fields_from_columns(statement.columns());

        let (rows, header) = match self.protocol {
            ClientProtocol::Binary => {
                let query = bind_all(statement.query(), values)?;
                collect_results((&mut *conn).fetch_many(query)).await
            }
            ClientProtocol::Text => {
                let text = escaper.format(sql, params);
                collect_results((&mut *conn).fetch_many(text.as_str())).await
            }
        }
        .map_err(|e| DbError::query(e, sql))?;

        Ok(shape_result(&rows, header, Some(fields)))
    }
}

/// Run with parameters interpolated and no metadata.
async fn run_unprepared(
    conn: &mut MySqlConnection,
    escaper: &Escaper,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<QueryResult> {
    let text = escaper.format(sql, params);
    let (rows, header) = collect_results((&mut *conn).fetch_many(text.as_str()))
        .await
        .map_err(|e| DbError::query(e, sql))?;
    Ok(shape_result(&rows, header, None))
}

/// Pick the result shape from what the server returned. Any rows make a
/// `Rows` result described by the first row's columns; prepare-time
/// metadata only decides the shape of an empty result.
fn shape_result<R: RowToJson>(
    rows: &[R],
    header: ResultHeader,
    prepared: Option<Vec<FieldInfo>>,
) -> QueryResult {
    match (rows.first(), prepared) {
        (Some(first), _) => QueryResult::Rows {
            fields: first.fields(),
            rows: rows.iter().map(RowToJson::to_json_map).collect(),
        },
        (None, Some(fields)) if !fields.is_empty() => QueryResult::Rows {
            rows: Vec::new(),
            fields,
        },
        (None, _) => QueryResult::Raw(header),
    }
}

/// Drain a result stream, collecting rows and the combined result header.
async fn collect_results(
    mut stream: BoxStream<'_, Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>>,
) -> Result<(Vec<MySqlRow>, ResultHeader), sqlx::Error> {
    let mut rows = Vec::new();
    let mut header = ResultHeader::default();
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => {
                header.affected_rows += done.rows_affected();
                if done.last_insert_id() != 0 {
                    header.insert_id = done.last_insert_id();
                }
            }
            Either::Right(row) => rows.push(row),
        }
    }
    Ok((rows, header))
}

/// A pooled connection is closed instead of returned when the error left
/// it unusable.
fn should_discard(result: &DbResult<QueryResult>) -> bool {
    matches!(result, Err(e) if e.is_fatal_to_connection())
}
