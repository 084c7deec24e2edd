//! Data models shared across the driver.

pub mod connection;
pub mod query;
pub mod schema;
pub mod spell;

pub use connection::{
    ClientKind, ClientProtocol, DEFAULT_CONNECTION_LIMIT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USER,
    DriverConfig,
};
pub use query::{FieldInfo, FormattedQuery, QueryParam, QueryResult, ResultHeader, Row};
pub use schema::{ColumnInfo, TableDescription};
pub use spell::{
    AggregateFn, Assignments, Command, CompareOp, Condition, Join, JoinKind, Order, Selection,
    Spell, assignments,
};
