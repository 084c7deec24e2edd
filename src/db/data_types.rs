//! Logical column types and their MySQL spellings.
//!
//! [`DataType`] maps both ways: `to_sql()` renders the native type used in
//! DDL, `from_native()` interprets a `COLUMN_TYPE` read from
//! `information_schema`.

use serde::{Deserialize, Serialize};

/// Size class shared by TEXT and BLOB types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextLength {
    Tiny,
    #[default]
    Default,
    Medium,
    Long,
}

impl TextLength {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Tiny => "TINY",
            Self::Default => "",
            Self::Medium => "MEDIUM",
            Self::Long => "LONG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataType {
    Char {
        length: u32,
    },
    Varchar {
        length: u32,
    },
    Text {
        length: TextLength,
    },
    TinyInt {
        length: Option<u32>,
        unsigned: bool,
    },
    SmallInt {
        length: Option<u32>,
        unsigned: bool,
    },
    MediumInt {
        length: Option<u32>,
        unsigned: bool,
    },
    Integer {
        length: Option<u32>,
        unsigned: bool,
    },
    BigInt {
        length: Option<u32>,
        unsigned: bool,
    },
    /// Stored as TINYINT(1)
    Boolean,
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
        unsigned: bool,
    },
    Float,
    Double,
    Date,
    DateTime {
        precision: Option<u8>,
    },
    Timestamp {
        precision: Option<u8>,
    },
    Time {
        precision: Option<u8>,
    },
    Json,
    Binary {
        length: u32,
    },
    VarBinary {
        length: u32,
    },
    Blob {
        length: TextLength,
    },
}

pub const DEFAULT_STRING_LENGTH: u32 = 255;

impl DataType {
    /// VARCHAR(255)
    pub fn string() -> Self {
        Self::Varchar {
            length: DEFAULT_STRING_LENGTH,
        }
    }

    /// Signed INTEGER
    pub fn integer() -> Self {
        Self::Integer {
            length: None,
            unsigned: false,
        }
    }

    /// Signed BIGINT
    pub fn bigint() -> Self {
        Self::BigInt {
            length: None,
            unsigned: false,
        }
    }

    /// Render the native MySQL type.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Char { length } => format!("CHAR({length})"),
            Self::Varchar { length } => format!("VARCHAR({length})"),
            Self::Text { length } => format!("{}TEXT", length.prefix()),
            Self::TinyInt { length, unsigned } => integer_sql("TINYINT", *length, *unsigned),
            Self::SmallInt { length, unsigned } => integer_sql("SMALLINT", *length, *unsigned),
            Self::MediumInt { length, unsigned } => integer_sql("MEDIUMINT", *length, *unsigned),
            Self::Integer { length, unsigned } => integer_sql("INTEGER", *length, *unsigned),
            Self::BigInt { length, unsigned } => integer_sql("BIGINT", *length, *unsigned),
            Self::Boolean => "TINYINT(1)".to_string(),
            Self::Decimal {
                precision,
                scale,
                unsigned,
            } => {
                let mut sql = match (precision, scale) {
                    (Some(p), Some(s)) => format!("DECIMAL({p},{s})"),
                    (Some(p), None) => format!("DECIMAL({p})"),
                    _ => "DECIMAL".to_string(),
                };
                if *unsigned {
                    sql.push_str(" UNSIGNED");
                }
                sql
            }
            Self::Float => "FLOAT".to_string(),
            Self::Double => "DOUBLE".to_string(),
            Self::Date => "DATE".to_string(),
            Self::DateTime { precision } => with_precision("DATETIME", *precision),
            Self::Timestamp { precision } => with_precision("TIMESTAMP", *precision),
            Self::Time { precision } => with_precision("TIME", *precision),
            Self::Json => "JSON".to_string(),
            Self::Binary { length } => format!("BINARY({length})"),
            Self::VarBinary { length } => format!("VARBINARY({length})"),
            Self::Blob { length } => format!("{}BLOB", length.prefix()),
        }
    }

    /// Interpret a native column type such as `bigint(20) unsigned`,
    /// `varchar(255)`, `tinyint(1)` or `datetime(3)`. Returns `None` for
    /// types without a logical counterpart (enum, set, geometry, ...).
    pub fn from_native(native: &str) -> Option<Self> {
        let lower = native.trim().to_lowercase();
        let unsigned = lower.contains("unsigned");
        let (name, args) = match lower.find('(') {
            Some(open) => {
                let close = lower[open..].find(')').map(|c| open + c)?;
                let args: Vec<u32> = lower[open + 1..close]
                    .split(',')
                    .filter_map(|a| a.trim().parse().ok())
                    .collect();
                (lower[..open].trim(), args)
            }
            None => (
                lower.split_whitespace().next().unwrap_or_default(),
                Vec::new(),
            ),
        };
        let first = args.first().copied();
        let precision = first.and_then(|p| u8::try_from(p).ok());

        let data_type = match name {
            "char" => Self::Char {
                length: first.unwrap_or(1),
            },
            "varchar" => Self::Varchar {
                length: first.unwrap_or(DEFAULT_STRING_LENGTH),
            },
            "tinytext" => Self::Text {
                length: TextLength::Tiny,
            },
            "text" => Self::Text {
                length: TextLength::Default,
            },
            "mediumtext" => Self::Text {
                length: TextLength::Medium,
            },
            "longtext" => Self::Text {
                length: TextLength::Long,
            },
            "tinyint" | "bool" | "boolean" if first == Some(1) || name != "tinyint" => {
                Self::Boolean
            }
            "tinyint" => Self::TinyInt {
                length: first,
                unsigned,
            },
            "smallint" => Self::SmallInt {
                length: first,
                unsigned,
            },
            "mediumint" => Self::MediumInt {
                length: first,
                unsigned,
            },
            "int" | "integer" => Self::Integer {
                length: first,
                unsigned,
            },
            "bigint" => Self::BigInt {
                length: first,
                unsigned,
            },
            "decimal" | "numeric" => Self::Decimal {
                precision: first,
                scale: args.get(1).copied(),
                unsigned,
            },
            "float" => Self::Float,
            "double" | "real" => Self::Double,
            "date" => Self::Date,
            "datetime" => Self::DateTime { precision },
            "timestamp" => Self::Timestamp { precision },
            "time" => Self::Time { precision },
            "json" => Self::Json,
            "binary" => Self::Binary {
                length: first.unwrap_or(1),
            },
            "varbinary" => Self::VarBinary {
                length: first.unwrap_or(DEFAULT_STRING_LENGTH),
            },
            "tinyblob" => Self::Blob {
                length: TextLength::Tiny,
            },
            "blob" => Self::Blob {
                length: TextLength::Default,
            },
            "mediumblob" => Self::Blob {
                length: TextLength::Medium,
            },
            "longblob" => Self::Blob {
                length: TextLength::Long,
            },
            _ => return None,
        };
        Some(data_type)
    }

    /// True for types whose values travel as JSON documents.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt { .. }
                | Self::SmallInt { .. }
                | Self::MediumInt { .. }
                | Self::Integer { .. }
                | Self::BigInt { .. }
        )
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn integer_sql(name: &str, length: Option<u32>, unsigned: bool) -> String {
    let mut sql = match length {
        Some(len) => format!("{name}({len})"),
        None => name.to_string(),
    };
    if unsigned {
        sql.push_str(" UNSIGNED");
    }
    sql
}

fn with_precision(name: &str, precision: Option<u8>) -> String {
    match precision {
        Some(p) if p > 0 => format!("{name}({p})"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql() {
        assert_eq!(DataType::string().to_sql(), "VARCHAR(255)");
        assert_eq!(DataType::Boolean.to_sql(), "TINYINT(1)");
        assert_eq!(DataType::Json.to_sql(), "JSON");
        assert_eq!(
            DataType::BigInt {
                length: None,
                unsigned: true
            }
            .to_sql(),
            "BIGINT UNSIGNED"
        );
        assert_eq!(
            DataType::Decimal {
                precision: Some(10),
                scale: Some(2),
                unsigned: false
            }
            .to_sql(),
            "DECIMAL(10,2)"
        );
        assert_eq!(
            DataType::DateTime { precision: Some(3) }.to_sql(),
            "DATETIME(3)"
        );
        assert_eq!(
            DataType::Text {
                length: TextLength::Medium
            }
            .to_sql(),
            "MEDIUMTEXT"
        );
        assert_eq!(
            DataType::Blob {
                length: TextLength::Default
            }
            .to_sql(),
            "BLOB"
        );
    }

    #[test]
    fn test_from_native() {
        assert_eq!(
            DataType::from_native("bigint(20) unsigned"),
            Some(DataType::BigInt {
                length: Some(20),
                unsigned: true
            })
        );
        assert_eq!(
            DataType::from_native("varchar(64)"),
            Some(DataType::Varchar { length: 64 })
        );
        assert_eq!(DataType::from_native("tinyint(1)"), Some(DataType::Boolean));
        assert_eq!(
            DataType::from_native("tinyint(4)"),
            Some(DataType::TinyInt {
                length: Some(4),
                unsigned: false
            })
        );
        assert_eq!(
            DataType::from_native("decimal(10,2)"),
            Some(DataType::Decimal {
                precision: Some(10),
                scale: Some(2),
                unsigned: false
            })
        );
        assert_eq!(
            DataType::from_native("DATETIME(3)"),
            Some(DataType::DateTime { precision: Some(3) })
        );
        assert_eq!(
            DataType::from_native("longtext"),
            Some(DataType::Text {
                length: TextLength::Long
            })
        );
        assert_eq!(DataType::from_native("json"), Some(DataType::Json));
        assert_eq!(DataType::from_native("enum('a','b')"), None);
        assert_eq!(DataType::from_native("geometry"), None);
    }

    #[test]
    fn test_native_round_trip_for_ddl_types() {
        for ty in [
            DataType::string(),
            DataType::Boolean,
            DataType::Json,
            DataType::Date,
            DataType::DateTime { precision: Some(6) },
            DataType::Double,
        ] {
            assert_eq!(DataType::from_native(&ty.to_sql()), Some(ty.clone()), "{ty}");
        }
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_value(DataType::Varchar { length: 32 }).unwrap();
        assert_eq!(json["type"], "varchar");
        assert_eq!(json["length"], 32);
    }
}
