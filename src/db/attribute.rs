//! Column definitions and value conversion.
//!
//! An [`Attribute`] is the ORM's description of one column: its logical
//! [`DataType`] plus constraints. It renders the column's DDL and converts
//! values between their database and application forms.

use crate::db::data_types::DataType;
use crate::db::escape::Escaper;
use crate::models::{ColumnInfo, QueryParam};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Application-side name, e.g. "createdAt"
    pub name: String,
    /// Database column, e.g. "created_at"
    pub column_name: String,
    pub data_type: DataType,
    pub allow_null: bool,
    pub default_value: Option<QueryParam>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub comment: Option<String>,
}

impl Attribute {
    /// A nullable column named after `name` in snake case.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            column_name: snake_case(&name),
            name,
            data_type,
            allow_null: true,
            default_value: None,
            primary_key: false,
            auto_increment: false,
            unique: false,
            comment: None,
        }
    }

    /// Interpret an introspected column. `None` when its type has no
    /// logical counterpart.
    pub fn from_column(column: &ColumnInfo) -> Option<Self> {
        let data_type = column.logical_type.clone()?;
        Some(Self {
            name: column.name.clone(),
            column_name: column.name.clone(),
            data_type,
            allow_null: column.nullable,
            default_value: column.default_value.clone().map(QueryParam::String),
            primary_key: column.primary_key,
            auto_increment: column.auto_increment,
            unique: column.unique,
            comment: column.comment.clone().filter(|c| !c.is_empty()),
        })
    }

    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<QueryParam>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Mark as primary key. Primary keys never allow NULL.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Column definition without the column name, e.g.
    /// `BIGINT PRIMARY KEY AUTO_INCREMENT` or
    /// `VARCHAR(255) NOT NULL DEFAULT 'draft' COMMENT 'state'`.
    pub fn to_sql_definition(&self, escaper: &Escaper) -> String {
        let mut chunks = vec![self.data_type.to_sql()];
        if self.primary_key {
            chunks.push("PRIMARY KEY".to_string());
        }
        if self.auto_increment {
            chunks.push("AUTO_INCREMENT".to_string());
        }
        if !self.primary_key {
            chunks.push(if self.allow_null { "NULL" } else { "NOT NULL" }.to_string());
        }
        if let Some(default) = &self.default_value {
            chunks.push(format!("DEFAULT {}", escaper.escape(default)));
        }
        if self.unique && !self.primary_key {
            chunks.push("UNIQUE".to_string());
        }
        if let Some(comment) = &self.comment {
            chunks.push(format!("COMMENT {}", escaper.escape_str(comment)));
        }
        chunks.join(" ")
    }

    /// Convert a value read from the database into its application form.
    pub fn cast(&self, value: JsonValue) -> JsonValue {
        match (&self.data_type, value) {
            (_, JsonValue::Null) => JsonValue::Null,
            (DataType::Boolean, JsonValue::Number(n)) => {
                JsonValue::Bool(n.as_i64().is_some_and(|v| v != 0))
            }
            (DataType::Boolean, JsonValue::String(s)) => JsonValue::Bool(s != "0" && !s.is_empty()),
            (DataType::Json, JsonValue::String(s)) => {
                serde_json::from_str(&s).unwrap_or(JsonValue::String(s))
            }
            (_, value) => value,
        }
    }

    /// Convert an application value into a statement parameter.
    pub fn uncast(&self, value: JsonValue) -> QueryParam {
        match (&self.data_type, value) {
            (_, JsonValue::Null) => QueryParam::Null,
            (DataType::Json, value) => QueryParam::Json(value),
            (DataType::Boolean, JsonValue::Number(n)) => {
                QueryParam::Bool(n.as_f64().is_some_and(|v| v != 0.0))
            }
            (_, value) => QueryParam::from_json(value),
        }
    }
}

/// `createdAt` → `created_at`
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case_column_name() {
        assert_eq!(Attribute::new("createdAt", DataType::Date).column_name, "created_at");
        assert_eq!(Attribute::new("id", DataType::bigint()).column_name, "id");
        assert_eq!(
            Attribute::new("title", DataType::string())
                .with_column_name("post_title")
                .column_name,
            "post_title"
        );
    }

    #[test]
    fn test_definition_primary_key() {
        let attr = Attribute::new("id", DataType::bigint())
            .primary_key()
            .auto_increment();
        assert_eq!(
            attr.to_sql_definition(&Escaper::default()),
            "BIGINT PRIMARY KEY AUTO_INCREMENT"
        );
    }

    #[test]
    fn test_definition_constraints() {
        let attr = Attribute::new("state", DataType::string())
            .not_null()
            .with_default("draft")
            .unique()
            .with_comment("post's state");
        assert_eq!(
            attr.to_sql_definition(&Escaper::default()),
            r"VARCHAR(255) NOT NULL DEFAULT 'draft' UNIQUE COMMENT 'post\'s state'"
        );

        let attr = Attribute::new("published", DataType::Boolean).with_default(false);
        assert_eq!(
            attr.to_sql_definition(&Escaper::default()),
            "TINYINT(1) NULL DEFAULT false"
        );

        let attr = Attribute::new("meta", DataType::Json)
            .with_default(QueryParam::Json(json!({"tags": ["it's"]})));
        assert_eq!(
            attr.to_sql_definition(&Escaper::default()),
            r#"JSON NULL DEFAULT '{\"tags\":[\"it\'s\"]}'"#
        );
    }

    #[test]
    fn test_cast() {
        let flag = Attribute::new("flag", DataType::Boolean);
        assert_eq!(flag.cast(json!(1)), json!(true));
        assert_eq!(flag.cast(json!(0)), json!(false));
        assert_eq!(flag.cast(JsonValue::Null), JsonValue::Null);

        let meta = Attribute::new("meta", DataType::Json);
        assert_eq!(meta.cast(json!(r#"{"a":1}"#)), json!({"a": 1}));
        assert_eq!(meta.cast(json!({"a": 1})), json!({"a": 1}));

        let title = Attribute::new("title", DataType::string());
        assert_eq!(title.cast(json!("x")), json!("x"));
    }

    #[test]
    fn test_uncast() {
        let meta = Attribute::new("meta", DataType::Json);
        assert_eq!(meta.uncast(json!([1, 2])), QueryParam::Json(json!([1, 2])));
        assert_eq!(meta.uncast(JsonValue::Null), QueryParam::Null);

        let flag = Attribute::new("flag", DataType::Boolean);
        assert_eq!(flag.uncast(json!(1)), QueryParam::Bool(true));

        let title = Attribute::new("title", DataType::string());
        assert_eq!(title.uncast(json!("x")), QueryParam::from("x"));
    }

    #[test]
    fn test_from_column() {
        let column = ColumnInfo::new("id", "bigint(20) unsigned", false)
            .with_primary_key(true)
            .with_auto_increment(true);
        let attr = Attribute::from_column(&column).unwrap();
        assert!(attr.primary_key);
        assert!(!attr.allow_null);
        assert!(attr.data_type.is_integer());

        assert!(Attribute::from_column(&ColumnInfo::new("shape", "geometry", true)).is_none());
    }
}
