//! Logical query descriptors ("spells").
//!
//! A [`Spell`] describes a query without committing to a SQL dialect. The
//! spellbook turns it into MySQL text plus positional parameters.

use crate::models::QueryParam;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select,
    Insert,
    /// Insert, or update the existing row on a duplicate key
    Upsert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// One item of the select list.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Column(String),
    Aliased {
        column: String,
        alias: String,
    },
    /// `COUNT(*)` when `column` is `None`
    Aggregate {
        func: AggregateFn,
        column: Option<String>,
        alias: Option<String>,
    },
    /// Inserted verbatim
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

/// A filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op value`
    Compare {
        column: String,
        op: CompareOp,
        value: QueryParam,
    },
    /// `left op right`, both columns
    Columns {
        left: String,
        op: CompareOp,
        right: String,
    },
    In {
        column: String,
        values: Vec<QueryParam>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
    Between {
        column: String,
        low: QueryParam,
        high: QueryParam,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// SQL fragment with its own `?` placeholders
    Raw {
        sql: String,
        values: Vec<QueryParam>,
    },
}

impl Condition {
    fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<QueryParam>) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Like, pattern.into())
    }

    pub fn columns(left: impl Into<String>, op: CompareOp, right: impl Into<String>) -> Self {
        Self::Columns {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    pub fn in_list<V: Into<QueryParam>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<V: Into<QueryParam>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::Null {
            column: column.into(),
            negated: false,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::Null {
            column: column.into(),
            negated: true,
        }
    }

    pub fn between(
        column: impl Into<String>,
        low: impl Into<QueryParam>,
        high: impl Into<QueryParam>,
    ) -> Self {
        Self::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn raw(sql: impl Into<String>, values: Vec<QueryParam>) -> Self {
        Self::Raw {
            sql: sql.into(),
            values,
        }
    }

    /// Combine with `other` using AND, flattening nested ANDs.
    pub fn and(self, other: Condition) -> Self {
        match (self, other) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (this, other) => Self::And(vec![this, other]),
        }
    }

    /// Combine with `other` using OR, flattening nested ORs.
    pub fn or(self, other: Condition) -> Self {
        match (self, other) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (this, other) => Self::Or(vec![this, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// Column/value pairs of one inserted row or of an update.
pub type Assignments = Vec<(String, QueryParam)>;

#[derive(Debug, Clone, PartialEq)]
pub struct Spell {
    pub command: Command,
    pub table: String,
    pub alias: Option<String>,
    /// Empty selects `*`
    pub columns: Vec<Selection>,
    pub joins: Vec<Join>,
    pub filter: Option<Condition>,
    pub group_by: Vec<String>,
    pub having: Option<Condition>,
    pub orders: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Rows to insert or upsert; all rows must name the same columns
    pub rows: Vec<Assignments>,
    /// Update assignments
    pub sets: Assignments,
    /// Lets an upsert report the id of the row it updated
    pub primary_key: Option<String>,
}

impl Spell {
    fn new(command: Command, table: impl Into<String>) -> Self {
        Self {
            command,
            table: table.into(),
            alias: None,
            columns: Vec::new(),
            joins: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            having: None,
            orders: Vec::new(),
            limit: None,
            offset: None,
            rows: Vec::new(),
            sets: Vec::new(),
            primary_key: None,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(Command::Select, table)
    }

    pub fn insert(table: impl Into<String>, row: Assignments) -> Self {
        Self::insert_many(table, vec![row])
    }

    pub fn insert_many(table: impl Into<String>, rows: Vec<Assignments>) -> Self {
        let mut spell = Self::new(Command::Insert, table);
        spell.rows = rows;
        spell
    }

    pub fn upsert(table: impl Into<String>, row: Assignments) -> Self {
        let mut spell = Self::new(Command::Upsert, table);
        spell.rows = vec![row];
        spell
    }

    pub fn update(table: impl Into<String>, sets: Assignments) -> Self {
        let mut spell = Self::new(Command::Update, table);
        spell.sets = sets;
        spell
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(Command::Delete, table)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add one plain column to the select list.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(Selection::Column(column.into()));
        self
    }

    pub fn select_item(mut self, selection: Selection) -> Self {
        self.columns.push(selection);
        self
    }

    pub fn join(
        mut self,
        kind: JoinKind,
        table: impl Into<String>,
        alias: Option<&str>,
        on: Condition,
    ) -> Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            alias: alias.map(String::from),
            on,
        });
        self
    }

    /// Add a WHERE condition, ANDed with any existing one.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.orders.push(Order {
            column: column.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }
}

/// Build an [`Assignments`] list from `(column, value)` pairs.
pub fn assignments<K, V, I>(pairs: I) -> Assignments
where
    K: Into<String>,
    V: Into<QueryParam>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
