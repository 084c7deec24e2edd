//! MySQL dialect formatter.
//!
//! [`Spellbook`] compiles a [`Spell`] into SQL text with `?` placeholders
//! and the matching parameter list. Literal values never appear in the
//! text. Identifiers are quoted with the pool's escaper.

use crate::db::escape::Escaper;
use crate::error::{DbError, DbResult};
use crate::models::{
    Assignments, Command, CompareOp, Condition, FormattedQuery, JoinKind, QueryParam, Selection,
    Spell,
};

/// MySQL has no "offset without limit"; this is the documented stand-in.
pub const MAX_LIMIT: u64 = u64::MAX;

/// Turns a logical query into SQL text plus positional parameters.
pub trait SpellFormatter: Send + Sync {
    fn format(&self, spell: &Spell) -> DbResult<FormattedQuery>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Spellbook {
    escaper: Escaper,
}

impl Spellbook {
    pub fn new(escaper: Escaper) -> Self {
        Self { escaper }
    }
}

impl SpellFormatter for Spellbook {
    fn format(&self, spell: &Spell) -> DbResult<FormattedQuery> {
        let mut builder = SqlBuilder {
            escaper: &self.escaper,
            sql: String::new(),
            values: Vec::new(),
        };
        match spell.command {
            Command::Select => builder.select(spell),
            Command::Insert => builder.insert(spell, false)?,
            Command::Upsert => builder.insert(spell, true)?,
            Command::Update => builder.update(spell)?,
            Command::Delete => builder.delete(spell),
        }
        Ok(FormattedQuery::new(builder.sql, builder.values))
    }
}

struct SqlBuilder<'a> {
    escaper: &'a Escaper,
    sql: String,
    values: Vec<QueryParam>,
}

impl SqlBuilder<'_> {
    fn id(&self, name: &str) -> String {
        self.escaper.escape_id(name)
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn placeholder(&mut self, value: &QueryParam) {
        self.sql.push('?');
        self.values.push(value.clone());
    }

    fn table(&mut self, spell: &Spell) {
        let table = self.id(&spell.table);
        self.push(&table);
        if let Some(alias) = &spell.alias {
            let alias = self.id(alias);
            self.push(" AS ");
            self.push(&alias);
        }
    }

    fn select(&mut self, spell: &Spell) {
        self.push("SELECT ");
        if spell.columns.is_empty() {
            self.push("*");
        } else {
            let list = spell
                .columns
                .iter()
                .map(|s| self.selection(s))
                .collect::<Vec<_>>()
                .join(", ");
            self.push(&list);
        }
        self.push(" FROM ");
        self.table(spell);
        self.joins(spell);
        self.where_clause(spell);

        if !spell.group_by.is_empty() {
            let columns = self.id_list(&spell.group_by);
            self.push(" GROUP BY ");
            self.push(&columns);
        }
        if let Some(having) = &spell.having {
            self.push(" HAVING ");
            self.condition(having, false);
        }
        self.order_and_limit(spell);
    }

    fn selection(&self, selection: &Selection) -> String {
        match selection {
            Selection::Column(column) => self.id(column),
            Selection::Aliased { column, alias } => {
                format!("{} AS {}", self.id(column), self.id(alias))
            }
            Selection::Aggregate {
                func,
                column,
                alias,
            } => {
                let arg = column.as_deref().map_or("*".to_string(), |c| self.id(c));
                let expr = format!("{}({})", func.as_sql(), arg);
                match alias {
                    Some(alias) => format!("{} AS {}", expr, self.id(alias)),
                    None => expr,
                }
            }
            Selection::Raw(sql) => sql.clone(),
        }
    }

    fn id_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.id(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn joins(&mut self, spell: &Spell) {
        for join in &spell.joins {
            self.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
                JoinKind::Right => " RIGHT JOIN ",
            });
            let table = self.id(&join.table);
            self.push(&table);
            if let Some(alias) = &join.alias {
                let alias = self.id(alias);
                self.push(" AS ");
                self.push(&alias);
            }
            self.push(" ON ");
            self.condition(&join.on, false);
        }
    }

    fn where_clause(&mut self, spell: &Spell) {
        if let Some(filter) = &spell.filter {
            self.push(" WHERE ");
            self.condition(filter, false);
        }
    }

    fn order_and_limit(&mut self, spell: &Spell) {
        if !spell.orders.is_empty() {
            let orders = spell
                .orders
                .iter()
                .map(|o| {
                    let dir = if o.descending { "DESC" } else { "ASC" };
                    format!("{} {}", self.id(&o.column), dir)
                })
                .collect::<Vec<_>>()
                .join(", ");
            self.push(" ORDER BY ");
            self.push(&orders);
        }
        match (spell.limit, spell.offset) {
            (Some(limit), Some(offset)) => self.push(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => self.push(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => self.push(&format!(" LIMIT {MAX_LIMIT} OFFSET {offset}")),
            (None, None) => {}
        }
    }

    /// Render a condition. `nested` wraps compound conditions in parentheses.
    fn condition(&mut self, condition: &Condition, nested: bool) {
        match condition {
            Condition::Compare { column, op, value } => {
                let column = self.id(column);
                match (op, value) {
                    (CompareOp::Eq, QueryParam::Null) => self.push(&format!("{column} IS NULL")),
                    (CompareOp::Ne, QueryParam::Null) => {
                        self.push(&format!("{column} IS NOT NULL"))
                    }
                    _ => {
                        self.push(&format!("{} {} ", column, op.as_sql()));
                        self.placeholder(value);
                    }
                }
            }
            Condition::Columns { left, op, right } => {
                let text = format!("{} {} {}", self.id(left), op.as_sql(), self.id(right));
                self.push(&text);
            }
            Condition::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    self.push(if *negated { "TRUE" } else { "FALSE" });
                    return;
                }
                let column = self.id(column);
                self.push(&column);
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.placeholder(value);
                }
                self.push(")");
            }
            Condition::Null { column, negated } => {
                let column = self.id(column);
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                self.push(&format!("{column} {op}"));
            }
            Condition::Between { column, low, high } => {
                let column = self.id(column);
                self.push(&format!("{column} BETWEEN "));
                self.placeholder(low);
                self.push(" AND ");
                self.placeholder(high);
            }
            Condition::And(items) => self.compound(items, " AND ", "TRUE", nested),
            Condition::Or(items) => self.compound(items, " OR ", "FALSE", nested),
            Condition::Not(inner) => {
                self.push("NOT (");
                self.condition(inner, false);
                self.push(")");
            }
            Condition::Raw { sql, values } => {
                self.push(sql);
                self.values.extend(values.iter().cloned());
            }
        }
    }

    fn compound(&mut self, items: &[Condition], separator: &str, empty: &str, nested: bool) {
        match items {
            [] => self.push(empty),
            [only] => self.condition(only, nested),
            _ => {
                if nested {
                    self.push("(");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(separator);
                    }
                    self.condition(item, true);
                }
                if nested {
                    self.push(")");
                }
            }
        }
    }

    fn insert(&mut self, spell: &Spell, upsert: bool) -> DbResult<()> {
        let columns = insert_columns(&spell.rows)?;

        self.push("INSERT INTO ");
        let table = self.id(&spell.table);
        self.push(&table);
        let column_list = self.id_list(&columns);
        self.push(&format!(" ({column_list}) VALUES "));

        for (i, row) in spell.rows.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push("(");
            for (j, column) in columns.iter().enumerate() {
                if j > 0 {
                    self.push(", ");
                }
                match row.iter().find(|(name, _)| name == column) {
                    Some((_, value)) => self.placeholder(value),
                    None => return Err(mismatched_rows()),
                }
            }
            self.push(")");
        }

        if upsert {
            self.on_duplicate_key(spell, &columns);
        }
        Ok(())
    }

    fn on_duplicate_key(&mut self, spell: &Spell, columns: &[String]) {
        let mut updates = Vec::new();
        if let Some(pk) = &spell.primary_key {
            let pk = self.id(pk);
            updates.push(format!("{pk} = LAST_INSERT_ID({pk})"));
        }
        for column in columns {
            if spell.primary_key.as_deref() == Some(column.as_str()) {
                continue;
            }
            let column = self.id(column);
            updates.push(format!("{column} = VALUES({column})"));
        }
        self.push(" ON DUPLICATE KEY UPDATE ");
        self.push(&updates.join(", "));
    }

    fn update(&mut self, spell: &Spell) -> DbResult<()> {
        if spell.sets.is_empty() {
            return Err(DbError::invalid_input(format!(
                "Update of `{}` has no assignments",
                spell.table
            )));
        }
        self.push("UPDATE ");
        self.table(spell);
        self.joins(spell);
        self.push(" SET ");
        for (i, (column, value)) in spell.sets.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let column = self.id(column);
            self.push(&format!("{column} = "));
            self.placeholder(value);
        }
        self.where_clause(spell);
        self.order_and_limit(spell);
        Ok(())
    }

    fn delete(&mut self, spell: &Spell) {
        if spell.joins.is_empty() {
            self.push("DELETE FROM ");
            self.table(spell);
            self.where_clause(spell);
            self.order_and_limit(spell);
        } else {
            // Multi-table form: delete rows of the main table only
            let target = self.id(spell.alias.as_deref().unwrap_or(&spell.table));
            self.push(&format!("DELETE {target} FROM "));
            self.table(spell);
            self.joins(spell);
            self.where_clause(spell);
        }
    }
}

/// Column list shared by every inserted row, in first-row order.
fn insert_columns(rows: &[Assignments]) -> DbResult<Vec<String>> {
    let first = rows
        .first()
        .ok_or_else(|| DbError::invalid_input("Insert needs at least one row"))?;
    if first.is_empty() {
        return Err(DbError::invalid_input("Insert row has no columns"));
    }
    let columns: Vec<String> = first.iter().map(|(name, _)| name.clone()).collect();
    for row in &rows[1..] {
        if row.len() != columns.len() || row.iter().any(|(name, _)| !columns.contains(name)) {
            return Err(mismatched_rows());
        }
    }
    Ok(columns)
}

fn mismatched_rows() -> DbError {
    DbError::invalid_input("All inserted rows must have the same columns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregateFn, assignments};

    fn format(spell: &Spell) -> FormattedQuery {
        Spellbook::default().format(spell).unwrap()
    }

    #[test]
    fn test_select_all() {
        let q = format(&Spell::select("posts"));
        assert_eq!(q.sql, "SELECT * FROM `posts`");
        assert!(q.values.is_empty());
    }

    #[test]
    fn test_select_with_filters_and_order() {
        let spell = Spell::select("posts")
            .column("id")
            .column("title")
            .filter(Condition::eq("author_id", 3))
            .filter(Condition::like("title", "%rust%").or(Condition::is_null("title")))
            .order_by("created_at", true)
            .limit(10)
            .offset(20);
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "SELECT `id`, `title` FROM `posts` WHERE `author_id` = ? AND (`title` LIKE ? OR `title` IS NULL) ORDER BY `created_at` DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(q.values, vec![QueryParam::Int(3), QueryParam::from("%rust%")]);
    }

    #[test]
    fn test_offset_without_limit() {
        let q = format(&Spell::select("posts").offset(5));
        assert_eq!(
            q.sql,
            "SELECT * FROM `posts` LIMIT 18446744073709551615 OFFSET 5"
        );
    }

    #[test]
    fn test_null_comparison() {
        let q = format(&Spell::select("posts").filter(Condition::eq("deleted_at", QueryParam::Null)));
        assert_eq!(q.sql, "SELECT * FROM `posts` WHERE `deleted_at` IS NULL");
        assert!(q.values.is_empty());
    }

    #[test]
    fn test_in_lists() {
        let q = format(&Spell::select("posts").filter(Condition::in_list("id", [1, 2, 3])));
        assert_eq!(q.sql, "SELECT * FROM `posts` WHERE `id` IN (?, ?, ?)");
        assert_eq!(q.values.len(), 3);

        let q = format(&Spell::select("posts").filter(Condition::in_list("id", Vec::<i64>::new())));
        assert_eq!(q.sql, "SELECT * FROM `posts` WHERE FALSE");

        let q = format(&Spell::select("posts").filter(Condition::not_in("id", Vec::<i64>::new())));
        assert_eq!(q.sql, "SELECT * FROM `posts` WHERE TRUE");
    }

    #[test]
    fn test_join_group_having() {
        let spell = Spell::select("posts")
            .with_alias("p")
            .column("p.author_id")
            .select_item(Selection::Aggregate {
                func: AggregateFn::Count,
                column: None,
                alias: Some("total".into()),
            })
            .join(
                JoinKind::Left,
                "comments",
                Some("c"),
                Condition::columns("c.post_id", CompareOp::Eq, "p.id"),
            )
            .group_by("p.author_id")
            .having(Condition::raw("COUNT(*) > ?", vec![1.into()]));
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "SELECT `p`.`author_id`, COUNT(*) AS `total` FROM `posts` AS `p` LEFT JOIN `comments` AS `c` ON `c`.`post_id` = `p`.`id` GROUP BY `p`.`author_id` HAVING COUNT(*) > ?"
        );
        assert_eq!(q.values, vec![QueryParam::Int(1)]);
    }

    #[test]
    fn test_between_and_not() {
        let spell = Spell::select("posts")
            .filter(Condition::between("id", 1, 9))
            .filter(Condition::eq("draft", true).not());
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "SELECT * FROM `posts` WHERE `id` BETWEEN ? AND ? AND NOT (`draft` = ?)"
        );
        assert_eq!(q.values.len(), 3);
    }

    #[test]
    fn test_insert_many() {
        let spell = Spell::insert_many(
            "posts",
            vec![
                assignments([("title", "a"), ("body", "x")]),
                assignments([("body", "y"), ("title", "b")]),
            ],
        );
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "INSERT INTO `posts` (`title`, `body`) VALUES (?, ?), (?, ?)"
        );
        assert_eq!(
            q.values,
            vec![
                QueryParam::from("a"),
                QueryParam::from("x"),
                QueryParam::from("b"),
                QueryParam::from("y")
            ]
        );
    }

    #[test]
    fn test_insert_errors() {
        let book = Spellbook::default();
        let err = book.format(&Spell::insert_many("posts", vec![])).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));

        let spell = Spell::insert_many(
            "posts",
            vec![
                assignments([("title", "a")]),
                assignments([("body", "y")]),
            ],
        );
        assert!(matches!(
            book.format(&spell),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_upsert() {
        let spell = Spell::upsert(
            "posts",
            assignments([
                ("id", QueryParam::Int(1)),
                ("title", "a".into()),
                ("body", "b".into()),
            ]),
        )
        .with_primary_key("id");
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "INSERT INTO `posts` (`id`, `title`, `body`) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE `id` = LAST_INSERT_ID(`id`), `title` = VALUES(`title`), `body` = VALUES(`body`)"
        );
        assert_eq!(q.values.len(), 3);
    }

    #[test]
    fn test_update() {
        let spell = Spell::update("posts", assignments([("title", "new")]))
            .filter(Condition::eq("id", 1))
            .order_by("id", false)
            .limit(1);
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "UPDATE `posts` SET `title` = ? WHERE `id` = ? ORDER BY `id` ASC LIMIT 1"
        );
        assert_eq!(q.values, vec![QueryParam::from("new"), QueryParam::Int(1)]);

        let err = Spellbook::default()
            .format(&Spell::update("posts", vec![]))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_delete() {
        let q = format(&Spell::delete("posts").filter(Condition::lt("id", 5)).limit(2));
        assert_eq!(q.sql, "DELETE FROM `posts` WHERE `id` < ? LIMIT 2");

        let spell = Spell::delete("posts")
            .with_alias("p")
            .join(
                JoinKind::Inner,
                "users",
                Some("u"),
                Condition::columns("u.id", CompareOp::Eq, "p.author_id"),
            )
            .filter(Condition::eq("u.banned", true));
        let q = format(&spell);
        assert_eq!(
            q.sql,
            "DELETE `p` FROM `posts` AS `p` INNER JOIN `users` AS `u` ON `u`.`id` = `p`.`author_id` WHERE `u`.`banned` = ?"
        );
    }

    #[test]
    fn test_identifiers_are_escaped() {
        let q = format(&Spell::select("we`ird").column("order"));
        assert_eq!(q.sql, "SELECT `order` FROM `we``ird`");
    }
}
