//! MySQL identifier and literal escaping.
//!
//! [`Escaper`] renders identifiers and values the way the MySQL server parses
//! them, and expands `?` / `??` placeholders. The pool owns one escaper,
//! configured from the driver's `no_backslash_escapes` option; the driver,
//! the spellbook and the query logger all borrow it.

use crate::models::QueryParam;
use std::borrow::Cow;

/// A piece of SQL text split around placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    /// `?`
    Value,
    /// `??`
    Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    Quoted(u8),
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Escaper {
    no_backslash_escapes: bool,
}

impl Escaper {
    /// Create an escaper. Set `no_backslash_escapes` when the server runs with
    /// `sql_mode=NO_BACKSLASH_ESCAPES`.
    pub fn new(no_backslash_escapes: bool) -> Self {
        Self {
            no_backslash_escapes,
        }
    }

    pub fn no_backslash_escapes(&self) -> bool {
        self.no_backslash_escapes
    }

    /// Quote an identifier with backticks. Dots separate qualifiers, so
    /// `posts.title` becomes `` `posts`.`title` ``; a bare `*` is kept as is.
    pub fn escape_id(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        for (i, part) in name.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            if part == "*" {
                out.push('*');
            } else {
                out.push('`');
                out.push_str(&part.replace('`', "``"));
                out.push('`');
            }
        }
        out
    }

    /// Quote a string literal.
    pub fn escape_str(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        if self.no_backslash_escapes {
            out.push_str(&value.replace('\'', "''"));
        } else {
            for c in value.chars() {
                match c {
                    '\0' => out.push_str("\\0"),
                    '\x08' => out.push_str("\\b"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\x1a' => out.push_str("\\Z"),
                    '"' => out.push_str("\\\""),
                    '\'' => out.push_str("\\'"),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
        }
        out.push('\'');
        out
    }

    /// Render a value as a SQL literal.
    pub fn escape(&self, value: &QueryParam) -> String {
        match value {
            QueryParam::Null => "NULL".to_string(),
            QueryParam::Bool(v) => v.to_string(),
            QueryParam::Int(v) => v.to_string(),
            QueryParam::UInt(v) => v.to_string(),
            // Exponent form so the server types the literal as DOUBLE, not DECIMAL.
            QueryParam::Float(v) if v.is_finite() => format!("{v:e}"),
            QueryParam::Float(_) => "NULL".to_string(),
            QueryParam::String(v) => self.escape_str(v),
            QueryParam::List(items) => self.escape_list(items),
            QueryParam::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("X'{hex}'")
            }
            QueryParam::DateTime(v) => {
                self.escape_str(&v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            QueryParam::Json(v) => self.escape_str(&v.to_string()),
        }
    }

    /// Comma-separated members; nested lists become parenthesised groups.
    /// An empty list renders as `NULL` so `IN (?)` stays valid SQL.
    fn escape_list(&self, items: &[QueryParam]) -> String {
        if items.is_empty() {
            return "NULL".to_string();
        }
        items
            .iter()
            .map(|item| match item {
                QueryParam::List(inner) => format!("({})", self.escape_list(inner)),
                other => self.escape(other),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render a value used in an identifier position (`??`).
    fn escape_id_param(&self, value: &QueryParam) -> String {
        match value {
            QueryParam::String(name) => self.escape_id(name),
            QueryParam::List(items) => items
                .iter()
                .map(|item| self.escape_id_param(item))
                .collect::<Vec<_>>()
                .join(", "),
            other => self.escape_id(&self.escape(other)),
        }
    }

    /// Interpolate `params` into `sql`: `?` takes an escaped value, `??` an
    /// escaped identifier. Placeholders inside quoted text are ignored, and
    /// placeholders beyond the supplied parameters are left untouched.
    pub fn format(&self, sql: &str, params: &[QueryParam]) -> String {
        if params.is_empty() {
            return sql.to_string();
        }

        let mut values = params.iter();
        let mut out = String::with_capacity(sql.len() + params.len() * 8);
        for segment in self.segments(sql) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Value => match values.next() {
                    Some(value) => out.push_str(&self.escape(value)),
                    None => out.push('?'),
                },
                Segment::Identifier => match values.next() {
                    Some(value) => out.push_str(&self.escape_id_param(value)),
                    None => out.push_str("??"),
                },
            }
        }
        out
    }

    /// Prepare `sql` for server-side binding: identifiers (`??`) are inlined,
    /// list values expand to one placeholder per member, and the remaining
    /// scalar values are returned in placeholder order.
    pub fn expand_for_binding<'a>(
        &self,
        sql: &'a str,
        params: &'a [QueryParam],
    ) -> (Cow<'a, str>, Vec<&'a QueryParam>) {
        let needs_rewrite = params
            .iter()
            .any(|p| matches!(p, QueryParam::List(_)))
            || sql.contains("??");
        if !needs_rewrite {
            return (Cow::Borrowed(sql), params.iter().collect());
        }

        let mut values = params.iter();
        let mut bound = Vec::with_capacity(params.len());
        let mut out = String::with_capacity(sql.len());
        for segment in self.segments(sql) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Value => match values.next() {
                    Some(QueryParam::List(items)) => {
                        out.push_str(&expand_list_placeholders(items, &mut bound));
                    }
                    Some(value) => {
                        out.push('?');
                        bound.push(value);
                    }
                    None => out.push('?'),
                },
                Segment::Identifier => match values.next() {
                    Some(value) => out.push_str(&self.escape_id_param(value)),
                    None => out.push_str("??"),
                },
            }
        }
        (Cow::Owned(out), bound)
    }

    /// Split SQL text around placeholders that are outside quoted regions
    /// and comments.
    fn segments<'a>(&self, sql: &'a str) -> Vec<Segment<'a>> {
        let bytes = sql.as_bytes();
        let mut segments = Vec::new();
        let mut state = ScanState::Normal;
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            match state {
                ScanState::Quoted(q) => {
                    if b == b'\\' && q != b'`' && !self.no_backslash_escapes {
                        i += 2;
                        continue;
                    }
                    if b == q {
                        if bytes.get(i + 1) == Some(&q) {
                            i += 2;
                            continue;
                        }
                        state = ScanState::Normal;
                    }
                    i += 1;
                }
                ScanState::LineComment => {
                    if b == b'\n' {
                        state = ScanState::Normal;
                    }
                    i += 1;
                }
                ScanState::BlockComment => {
                    if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        state = ScanState::Normal;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                ScanState::Normal => match b {
                    b'\'' | b'"' | b'`' => {
                        state = ScanState::Quoted(b);
                        i += 1;
                    }
                    b'#' => {
                        state = ScanState::LineComment;
                        i += 1;
                    }
                    // MySQL needs whitespace after `--`, so `1--1` stays arithmetic.
                    b'-' if bytes.get(i + 1) == Some(&b'-')
                        && bytes.get(i + 2).is_none_or(|c| c.is_ascii_whitespace()) =>
                    {
                        state = ScanState::LineComment;
                        i += 2;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        state = ScanState::BlockComment;
                        i += 2;
                    }
                    b'?' => {
                        if start < i {
                            segments.push(Segment::Text(&sql[start..i]));
                        }
                        if bytes.get(i + 1) == Some(&b'?') {
                            segments.push(Segment::Identifier);
                            i += 2;
                        } else {
                            segments.push(Segment::Value);
                            i += 1;
                        }
                        start = i;
                    }
                    _ => i += 1,
                },
            }
        }

        if start < sql.len() {
            segments.push(Segment::Text(&sql[start..]));
        }
        segments
    }
}

fn expand_list_placeholders<'a>(items: &'a [QueryParam], bound: &mut Vec<&'a QueryParam>) -> String {
    if items.is_empty() {
        return "NULL".to_string();
    }
    items
        .iter()
        .map(|item| match item {
            QueryParam::List(inner) => format!("({})", expand_list_placeholders(inner, bound)),
            other => {
                bound.push(other);
                "?".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
