//! Database layer.
//!
//! - Connection pool management and caller-owned connections
//! - Query execution over the text or binary protocol
//! - Escaping and the MySQL dialect formatter
//! - Logical data types, attributes and DDL generation
//! - Row decoding and schema introspection

pub mod attribute;
pub mod data_types;
pub mod ddl;
pub mod escape;
pub mod executor;
pub(crate) mod params;
pub mod pool;
pub mod schema;
pub mod spellbook;
pub mod types;

pub use attribute::Attribute;
pub use data_types::{DataType, TextLength};
pub use ddl::{DdlBuilder, IndexOptions};
pub use escape::Escaper;
pub use executor::{ExecuteOptions, QueryExecutor};
pub use pool::{DriverConnection, PoolManager};
pub use schema::SchemaInspector;
pub use spellbook::{SpellFormatter, Spellbook};
