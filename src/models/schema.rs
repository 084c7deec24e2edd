//! Schema-related data models.
//!
//! This module defines the normalized table/column description produced by
//! schema introspection.

use crate::db::data_types::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableDescription {
    /// Create a new table description.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary key columns, in ordinal order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Full native type, e.g. "bigint(20) unsigned", "varchar(255)"
    pub native_type: String,
    /// Bare type name, e.g. "bigint", "varchar"
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime_precision: Option<u8>,
    /// None when the native type has no logical counterpart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_type: Option<DataType>,
}

impl ColumnInfo {
    /// Create a new column description; the logical type is derived from
    /// the native type.
    pub fn new(name: impl Into<String>, native_type: impl Into<String>, nullable: bool) -> Self {
        let native_type = native_type.into();
        let data_type = native_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let logical_type = DataType::from_native(&native_type);
        Self {
            name: name.into(),
            native_type,
            data_type,
            nullable,
            default_value: None,
            primary_key: false,
            unique: false,
            auto_increment: false,
            comment: None,
            datetime_precision: None,
            logical_type,
        }
    }

    /// Set the default value expression.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Mark as primary key. Primary keys are unique as well.
    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self.unique = self.unique || primary_key;
        self
    }

    /// Mark as unique.
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique || self.primary_key;
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// Set the column comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_datetime_precision(mut self, precision: u8) -> Self {
        self.datetime_precision = Some(precision);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_info_derives_types() {
        let col = ColumnInfo::new("id", "bigint(20) unsigned", false);
        assert_eq!(col.data_type, "bigint");
        assert_eq!(
            col.logical_type,
            Some(DataType::BigInt {
                length: Some(20),
                unsigned: true
            })
        );

        let col = ColumnInfo::new("shape", "geometry", true);
        assert_eq!(col.data_type, "geometry");
        assert!(col.logical_type.is_none());
    }

    #[test]
    fn test_primary_key_implies_unique() {
        let col = ColumnInfo::new("id", "int", false).with_primary_key(true);
        assert!(col.unique);
        let col = col.with_unique(false);
        assert!(col.unique);
    }

    #[test]
    fn test_table_primary_key() {
        let mut table = TableDescription::new("posts");
        table
            .columns
            .push(ColumnInfo::new("id", "bigint", false).with_primary_key(true));
        table.columns.push(ColumnInfo::new("title", "varchar(255)", true));
        assert_eq!(table.primary_key(), vec!["id"]);
        assert!(table.column("title").is_some());
        assert!(table.column("missing").is_none());
    }
}
