//! Row decoding for MySQL result sets.
//!
//! Each column's server-reported type is first reduced to a
//! [`TypeCategory`]; the category picks the decoder that turns the cell into
//! JSON. Cells a decoder rejects fall back to their raw bytes.

use crate::models::{FieldInfo, Row as JsonRow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlColumn, MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, MySql, Row, Type, TypeInfo};
use tracing::debug;

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Text,
    Binary,
    Json,
    Unknown,
}

/// Classify a MySQL type name (as reported by the client library, e.g.
/// "BIGINT UNSIGNED", "VARCHAR", "BOOLEAN") into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();
    let base = lower.split_whitespace().next().unwrap_or_default();

    match base {
        "decimal" | "numeric" => TypeCategory::Decimal,
        "boolean" | "bool" => TypeCategory::Boolean,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
            TypeCategory::Integer
        }
        "float" | "double" | "real" => TypeCategory::Float,
        "date" | "datetime" | "timestamp" | "time" => TypeCategory::Temporal,
        "json" => TypeCategory::Json,
        "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "enum" | "set" => {
            TypeCategory::Text
        }
        _ if base.contains("blob") || base.contains("binary") => TypeCategory::Binary,
        _ => TypeCategory::Unknown,
    }
}

/// DECIMAL and NUMERIC values, kept as the exact text the server sent.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <str as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        categorize_type(ty.name()) == TypeCategory::Decimal
    }
}

impl<'r> Decode<'r, MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <&str as Decode<MySql>>::decode(value).map(|text| Self(text.to_owned()))
    }
}

/// Binary cells are base64 text. With `prefer_text`, valid UTF-8 is kept
/// as-is.
pub fn decode_binary_value(bytes: &[u8], prefer_text: bool) -> JsonValue {
    if prefer_text {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return JsonValue::String(text.to_owned());
        }
    }
    JsonValue::String(BASE64.encode(bytes))
}

/// Field metadata for a result set, from the prepared statement or row
/// columns.
pub fn fields_from_columns(columns: &[MySqlColumn]) -> Vec<FieldInfo> {
    columns
        .iter()
        .map(|col| FieldInfo::new(col.name(), col.type_info().name(), col.ordinal()))
        .collect()
}

/// Conversion of a result row into a JSON object keyed by column name.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
    fn fields(&self) -> Vec<FieldInfo>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> JsonRow {
        let mut map = JsonRow::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let category = categorize_type(col.type_info().name());
            map.insert(col.name().to_owned(), decode_cell(self, idx, category));
        }
        map
    }

    fn fields(&self) -> Vec<FieldInfo> {
        fields_from_columns(self.columns())
    }
}

type Decoded = Result<Option<JsonValue>, sqlx::Error>;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn cell<'r, T>(row: &'r MySqlRow, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, MySql> + Type<MySql>,
{
    row.try_get(idx)
}

/// Decode one cell. Values the category decoder rejects (zero dates,
/// out-of-range TIME, spatial types) fall back to their raw bytes.
fn decode_cell(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    let decoded: Decoded = match category {
        TypeCategory::Integer => cell::<i64>(row, idx)
            .map(|v| v.map(JsonValue::from))
            .or_else(|_| cell::<u64>(row, idx).map(|v| v.map(JsonValue::from)))
            .or_else(|_| cell::<u16>(row, idx).map(|v| v.map(JsonValue::from))),
        TypeCategory::Decimal => cell::<RawDecimal>(row, idx).map(|v| v.map(|d| JsonValue::String(d.0))),
        TypeCategory::Boolean => cell::<bool>(row, idx).map(|v| v.map(JsonValue::Bool)),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Temporal => decode_temporal(row, idx),
        TypeCategory::Json => cell::<JsonValue>(row, idx),
        TypeCategory::Binary => {
            cell::<Vec<u8>>(row, idx).map(|v| v.map(|b| decode_binary_value(&b, false)))
        }
        TypeCategory::Text | TypeCategory::Unknown => {
            cell::<String>(row, idx).map(|v| v.map(JsonValue::String))
        }
    };

    match decoded {
        Ok(value) => value.unwrap_or(JsonValue::Null),
        Err(e) => {
            debug!(column = idx, category = ?category, error = %e, "Falling back to raw cell bytes");
            raw_cell(row, idx)
        }
    }
}

/// FLOAT goes through its shortest decimal form so both protocols agree
/// (`1.1`, not `1.100000023841858`).
fn decode_float(row: &MySqlRow, idx: usize) -> Decoded {
    let number = |v: f64| {
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    };
    cell::<f32>(row, idx)
        .map(|v| v.map(|f| number(f.to_string().parse().unwrap_or(f64::from(f)))))
        .or_else(|_| cell::<f64>(row, idx).map(|v| v.map(number)))
}

/// Dates and times render as the text MySQL itself would print.
fn decode_temporal(row: &MySqlRow, idx: usize) -> Decoded {
    let text = cell::<NaiveDateTime>(row, idx)
        .map(|v| v.map(|t| t.format(DATETIME_FORMAT).to_string()))
        .or_else(|_| {
            cell::<DateTime<Utc>>(row, idx).map(|v| v.map(|t| t.format(DATETIME_FORMAT).to_string()))
        })
        .or_else(|_| cell::<NaiveDate>(row, idx).map(|v| v.map(|d| d.to_string())))
        .or_else(|_| {
            cell::<NaiveTime>(row, idx).map(|v| v.map(|t| t.format("%H:%M:%S%.f").to_string()))
        })?;
    Ok(text.map(JsonValue::String))
}

fn raw_cell(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
        Ok(Some(bytes)) => decode_binary_value(&bytes, true),
        _ => JsonValue::Null,
    }
}
