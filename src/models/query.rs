//! Query-related data models.
//!
//! This module defines statement parameters and the two result shapes a
//! statement can produce.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned values above `i64::MAX` (e.g. BIGINT UNSIGNED ids)
    UInt(u64),
    Float(f64),
    String(String),
    /// Expands to a comma-separated list, e.g. for `IN (?)`
    List(Vec<QueryParam>),
    /// Binary data (base64 encoded in JSON)
    #[serde(serialize_with = "base64_bytes::serialize", skip_deserializing)]
    Bytes(Vec<u8>),
    #[serde(skip_deserializing)]
    DateTime(NaiveDateTime),
    /// Stored in a JSON column
    Json(JsonValue),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Bytes(_) => "bytes",
            Self::DateTime(_) => "datetime",
            Self::Json(_) => "json",
        }
    }

    /// Map a plain JSON value onto the closest scalar parameter. Objects
    /// stay JSON; arrays become lists.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(v) => Self::Bool(v),
            JsonValue::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Int(v)
                } else if let Some(v) = n.as_u64() {
                    Self::UInt(v)
                } else {
                    n.as_f64().map(Self::Float).unwrap_or(Self::Null)
                }
            }
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            object @ JsonValue::Object(_) => Self::Json(object),
        }
    }
}

macro_rules! impl_from_param {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for QueryParam {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )+
    };
}

impl_from_param!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    NaiveDateTime => DateTime,
    JsonValue => Json,
);

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }
}

/// SQL text plus its positional parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedQuery {
    pub sql: String,
    #[serde(default)]
    pub values: Vec<QueryParam>,
}

impl FormattedQuery {
    /// Create a new formatted query.
    pub fn new(sql: impl Into<String>, values: Vec<QueryParam>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }
}

/// Column metadata of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    /// MySQL type name as reported by the server, e.g. "BIGINT", "VARCHAR"
    pub column_type: String,
    pub ordinal: usize,
}

impl FieldInfo {
    /// Create new field metadata.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            ordinal,
        }
    }
}

/// Outcome of a statement that produced no result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultHeader {
    pub affected_rows: u64,
    /// Zero when the statement generated no AUTO_INCREMENT value
    pub insert_id: u64,
}

pub type Row = serde_json::Map<String, JsonValue>;

/// Result of executing one statement.
///
/// Statements with column metadata (SELECT, SHOW, ...) produce `Rows`, all
/// others produce `Raw`. An empty SELECT is still `Rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Rows { rows: Vec<Row>, fields: Vec<FieldInfo> },
    Raw(ResultHeader),
}

impl QueryResult {
    /// Rows of a result set; empty for `Raw`.
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Rows { rows, .. } => rows,
            Self::Raw(_) => &[],
        }
    }

    /// Field metadata; `None` for `Raw`.
    pub fn fields(&self) -> Option<&[FieldInfo]> {
        match self {
            Self::Rows { fields, .. } => Some(fields),
            Self::Raw(_) => None,
        }
    }

    /// Consume the result, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows { rows, .. } => rows,
            Self::Raw(_) => Vec::new(),
        }
    }

    pub fn affected_rows(&self) -> Option<u64> {
        match self {
            Self::Raw(header) => Some(header.affected_rows),
            Self::Rows { .. } => None,
        }
    }

    pub fn insert_id(&self) -> Option<u64> {
        match self {
            Self::Raw(header) => Some(header.insert_id),
            Self::Rows { .. } => None,
        }
    }

    /// Check if this result carries column metadata.
    pub fn has_fields(&self) -> bool {
        matches!(self, Self::Rows { .. })
    }
}
