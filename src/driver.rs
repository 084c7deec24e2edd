//! The MySQL driver façade.
//!
//! [`MysqlDriver`] is what the ORM talks to. It resolves the client kind,
//! owns the pool and the executor, and exposes escaping, formatting,
//! execution, introspection and DDL behind one handle.
//!
//! ```no_run
//! # async fn demo() -> orm_mysql_driver::DbResult<()> {
//! use orm_mysql_driver::{DriverConfig, MysqlDriver};
//!
//! let driver = MysqlDriver::new("mysql2", DriverConfig::new("blog"))?;
//! let result = driver.query("SELECT ? AS answer", &[42.into()]).await?;
//! assert_eq!(result.rows().len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::db::attribute::Attribute;
use crate::db::ddl::{DdlBuilder, IndexOptions};
use crate::db::escape::Escaper;
use crate::db::executor::{ExecuteOptions, QueryExecutor};
use crate::db::pool::{DriverConnection, PoolManager};
use crate::db::schema::SchemaInspector;
use crate::db::spellbook::{SpellFormatter, Spellbook};
use crate::error::DbResult;
use crate::logger::{QueryLogger, TracingQueryLogger};
use crate::models::{
    ClientKind, DriverConfig, FormattedQuery, QueryParam, QueryResult, Spell, TableDescription,
};
use std::sync::Arc;
use tracing::info;

pub struct MysqlDriver {
    client: ClientKind,
    config: DriverConfig,
    pool: PoolManager,
    executor: QueryExecutor,
    formatter: Arc<dyn SpellFormatter>,
    ddl: DdlBuilder,
}

impl std::fmt::Debug for MysqlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlDriver")
            .field("client", &self.client)
            .field("database", &self.config.database)
            .field("app_name", &self.config.app_name)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl MysqlDriver {
    /// Create a driver for the client named `client` (`"mysql"` or
    /// `"mysql2"`). Any other name fails with `UnsupportedClient` before a
    /// pool is created. No connection is opened until the first query.
    pub fn new(client: &str, config: DriverConfig) -> DbResult<Self> {
        let client: ClientKind = client.parse()?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: ClientKind, config: DriverConfig) -> DbResult<Self> {
        let pool = PoolManager::new(&config)?;
        let escaper = *pool.escaper();
        let logger: Arc<dyn QueryLogger> = Arc::new(TracingQueryLogger::new(escaper));
        let executor = QueryExecutor::new(pool.clone(), client, logger);

        info!(
            client = %client,
            protocol = ?client.protocol(),
            database = %config.schema_database(),
            "Driver ready"
        );

        Ok(Self {
            client,
            config,
            pool,
            executor,
            formatter: Arc::new(Spellbook::new(escaper)),
            ddl: DdlBuilder::new(escaper),
        })
    }

    /// Replace the query logger.
    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.executor.set_logger(logger);
        self
    }

    /// Replace the dialect formatter.
    pub fn with_formatter(mut self, formatter: Arc<dyn SpellFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn client(&self) -> ClientKind {
        self.client
    }

    /// The literal database name, used for schema metadata.
    pub fn database(&self) -> &str {
        self.config.schema_database()
    }

    /// The database the pool connects to (app name when set).
    pub fn connect_database(&self) -> &str {
        self.config.connect_database()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn pool(&self) -> &PoolManager {
        &self.pool
    }

    pub fn escaper(&self) -> &Escaper {
        self.pool.escaper()
    }

    pub fn escape_id(&self, name: &str) -> String {
        self.escaper().escape_id(name)
    }

    pub fn escape(&self, value: &QueryParam) -> String {
        self.escaper().escape(value)
    }

    /// Interpolate `params` into `sql`.
    pub fn format_sql(&self, sql: &str, params: &[QueryParam]) -> String {
        self.escaper().format(sql, params)
    }

    /// Compile a logical query with the configured formatter.
    pub fn format(&self, spell: &Spell) -> DbResult<FormattedQuery> {
        self.formatter.format(spell)
    }

    /// Check out a connection. It stays checked out until dropped (returned
    /// to the pool) or closed (destroyed).
    pub async fn get_connection(&self) -> DbResult<DriverConnection> {
        self.pool.acquire().await
    }

    pub async fn execute(
        &self,
        sql: &str,
        params: &[QueryParam],
        options: ExecuteOptions<'_>,
    ) -> DbResult<QueryResult> {
        self.executor.execute(sql, params, options).await
    }

    /// Execute on a pooled connection.
    pub async fn query(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        self.execute(sql, params, ExecuteOptions::new()).await
    }

    /// Format `spell` and execute it.
    pub async fn execute_spell(
        &self,
        spell: &Spell,
        options: ExecuteOptions<'_>,
    ) -> DbResult<QueryResult> {
        let query = self.format(spell)?;
        self.execute(&query.sql, &query.values, options).await
    }

    pub async fn begin(&self, connection: &mut DriverConnection) -> DbResult<QueryResult> {
        self.execute("BEGIN", &[], ExecuteOptions::with_connection(connection))
            .await
    }

    pub async fn commit(&self, connection: &mut DriverConnection) -> DbResult<QueryResult> {
        self.execute("COMMIT", &[], ExecuteOptions::with_connection(connection))
            .await
    }

    pub async fn rollback(&self, connection: &mut DriverConnection) -> DbResult<QueryResult> {
        self.execute("ROLLBACK", &[], ExecuteOptions::with_connection(connection))
            .await
    }

    /// Describe `tables` of the literal database.
    pub async fn query_schema_info(&self, tables: &[&str]) -> DbResult<Vec<TableDescription>> {
        SchemaInspector::query_schema_info(&self.executor, self.database(), tables).await
    }

    pub async fn list_tables(&self) -> DbResult<Vec<String>> {
        SchemaInspector::list_tables(&self.executor, self.database()).await
    }

    async fn run_ddl(&self, sql: String) -> DbResult<QueryResult> {
        self.query(&sql, &[]).await
    }

    pub async fn create_table(&self, table: &str, attributes: &[Attribute]) -> DbResult<QueryResult> {
        let sql = self.ddl.create_table(table, attributes)?;
        self.run_ddl(sql).await
    }

    pub async fn drop_table(&self, table: &str) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.drop_table(table)).await
    }

    pub async fn truncate_table(&self, table: &str) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.truncate_table(table)).await
    }

    pub async fn rename_table(&self, table: &str, new_name: &str) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.rename_table(table, new_name)).await
    }

    pub async fn add_column(&self, table: &str, attribute: &Attribute) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.add_column(table, attribute)).await
    }

    pub async fn change_column(&self, table: &str, attribute: &Attribute) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.change_column(table, attribute)).await
    }

    pub async fn remove_column(&self, table: &str, column: &str) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.remove_column(table, column)).await
    }

    pub async fn rename_column(
        &self,
        table: &str,
        column: &str,
        new_name: &str,
    ) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.rename_column(table, column, new_name))
            .await
    }

    pub async fn add_index(
        &self,
        table: &str,
        columns: &[&str],
        options: &IndexOptions,
    ) -> DbResult<QueryResult> {
        let sql = self.ddl.add_index(table, columns, options)?;
        self.run_ddl(sql).await
    }

    pub async fn remove_index(&self, table: &str, name: &str) -> DbResult<QueryResult> {
        self.run_ddl(self.ddl.remove_index(table, name)).await
    }

    /// Number of open connections, idle or in use.
    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    pub fn num_idle(&self) -> usize {
        self.pool.num_idle()
    }

    /// Close the pool. Checked-out connections are closed when returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::models::{ClientProtocol, Condition};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_unsupported_client_fails_before_pool() {
        // No runtime here: reaching pool creation would panic.
        let err = MysqlDriver::new("sqlite", DriverConfig::new("blog")).unwrap_err();
        match err {
            DbError::UnsupportedClient { client } => assert_eq!(client, "sqlite"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_err!(MysqlDriver::new("MySQL", DriverConfig::new("blog")));
    }

    #[tokio::test]
    async fn test_lazy_construction_for_both_clients() {
        let mysql = assert_ok!(MysqlDriver::new("mysql", DriverConfig::new("blog")));
        assert_eq!(mysql.client(), ClientKind::Mysql);
        assert_eq!(mysql.executor.protocol(), ClientProtocol::Text);
        assert_eq!(mysql.size(), 0);

        let mysql2 = assert_ok!(MysqlDriver::new("mysql2", DriverConfig::new("blog")));
        assert_eq!(mysql2.executor.protocol(), ClientProtocol::Binary);
        assert_eq!(mysql2.num_idle(), 0);
    }

    #[tokio::test]
    async fn test_app_name_and_database() {
        let driver =
            MysqlDriver::new("mysql", DriverConfig::new("B").with_app_name("A")).unwrap();
        assert_eq!(driver.connect_database(), "A");
        assert_eq!(driver.database(), "B");
    }

    #[tokio::test]
    async fn test_escaping_and_formatting() {
        let driver = MysqlDriver::new("mysql2", DriverConfig::new("blog")).unwrap();
        assert_eq!(driver.escape_id("posts.title"), "`posts`.`title`");
        assert_eq!(driver.escape(&QueryParam::from("it's")), r"'it\'s'");
        assert_eq!(
            driver.format_sql("SELECT * FROM ?? WHERE id = ?", &["posts".into(), 1.into()]),
            "SELECT * FROM `posts` WHERE id = 1"
        );

        let query = driver
            .format(&Spell::select("posts").filter(Condition::eq("id", 1)))
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM `posts` WHERE `id` = ?");
        assert_eq!(query.values, vec![QueryParam::from(1)]);
    }

    #[tokio::test]
    async fn test_custom_formatter() {
        struct Fixed;
        impl SpellFormatter for Fixed {
            fn format(&self, _spell: &Spell) -> DbResult<FormattedQuery> {
                Ok(FormattedQuery::new("SELECT 1", Vec::new()))
            }
        }

        let driver = MysqlDriver::new("mysql", DriverConfig::new("blog"))
            .unwrap()
            .with_formatter(Arc::new(Fixed));
        assert_eq!(driver.format(&Spell::delete("posts")).unwrap().sql, "SELECT 1");
    }
}
