//! DDL statement generation.
//!
//! Everything here is pure string building; the driver executes the
//! result through its normal path.

use crate::db::attribute::Attribute;
use crate::db::escape::Escaper;
use crate::error::{DbError, DbResult};

/// Index creation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub unique: bool,
    /// Defaults to `idx_<table>_<columns>`, or `uk_...` when unique
    pub name: Option<String>,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self {
            unique: true,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DdlBuilder {
    escaper: Escaper,
}

impl DdlBuilder {
    pub fn new(escaper: Escaper) -> Self {
        Self { escaper }
    }

    fn column_definition(&self, attribute: &Attribute) -> String {
        format!(
            "{} {}",
            self.escaper.escape_id(&attribute.column_name),
            attribute.to_sql_definition(&self.escaper)
        )
    }

    pub fn create_table(&self, table: &str, attributes: &[Attribute]) -> DbResult<String> {
        if attributes.is_empty() {
            return Err(DbError::invalid_input(format!(
                "Table {table} needs at least one column"
            )));
        }
        let columns: Vec<String> = attributes
            .iter()
            .map(|a| self.column_definition(a))
            .collect();
        Ok(format!(
            "CREATE TABLE {} ({})",
            self.escaper.escape_id(table),
            columns.join(", ")
        ))
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.escaper.escape_id(table))
    }

    pub fn truncate_table(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.escaper.escape_id(table))
    }

    pub fn rename_table(&self, table: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.escaper.escape_id(table),
            self.escaper.escape_id(new_name)
        )
    }

    pub fn add_column(&self, table: &str, attribute: &Attribute) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.escaper.escape_id(table),
            self.column_definition(attribute)
        )
    }

    /// Redefine an existing column in place.
    pub fn change_column(&self, table: &str, attribute: &Attribute) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.escaper.escape_id(table),
            self.column_definition(attribute)
        )
    }

    pub fn remove_column(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.escaper.escape_id(table),
            self.escaper.escape_id(column)
        )
    }

    pub fn rename_column(&self, table: &str, column: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.escaper.escape_id(table),
            self.escaper.escape_id(column),
            self.escaper.escape_id(new_name)
        )
    }

    pub fn add_index(
        &self,
        table: &str,
        columns: &[&str],
        options: &IndexOptions,
    ) -> DbResult<String> {
        if columns.is_empty() {
            return Err(DbError::invalid_input(format!(
                "Index on {table} needs at least one column"
            )));
        }
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| index_name(table, columns, options.unique));
        let columns: Vec<String> = columns.iter().map(|c| self.escaper.escape_id(c)).collect();
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if options.unique { "UNIQUE " } else { "" },
            self.escaper.escape_id(&name),
            self.escaper.escape_id(table),
            columns.join(", ")
        ))
    }

    pub fn remove_index(&self, table: &str, name: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.escaper.escape_id(name),
            self.escaper.escape_id(table)
        )
    }
}

/// `idx_posts_title_author_id`, or `uk_...` for unique indexes.
pub fn index_name(table: &str, columns: &[&str], unique: bool) -> String {
    let prefix = if unique { "uk" } else { "idx" };
    format!("{prefix}_{table}_{}", columns.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::data_types::DataType;

    fn ddl() -> DdlBuilder {
        DdlBuilder::default()
    }

    #[test]
    fn test_create_table() {
        let attributes = vec![
            Attribute::new("id", DataType::bigint())
                .primary_key()
                .auto_increment(),
            Attribute::new("title", DataType::string()).not_null(),
            Attribute::new("createdAt", DataType::DateTime { precision: Some(3) }),
        ];
        assert_eq!(
            ddl().create_table("posts", &attributes).unwrap(),
            "CREATE TABLE `posts` (`id` BIGINT PRIMARY KEY AUTO_INCREMENT, \
             `title` VARCHAR(255) NOT NULL, `created_at` DATETIME(3) NULL)"
        );
    }

    #[test]
    fn test_create_table_without_columns() {
        let err = ddl().create_table("posts", &[]).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_table_statements() {
        assert_eq!(ddl().drop_table("posts"), "DROP TABLE IF EXISTS `posts`");
        assert_eq!(ddl().truncate_table("posts"), "TRUNCATE TABLE `posts`");
        assert_eq!(
            ddl().rename_table("posts", "articles"),
            "ALTER TABLE `posts` RENAME TO `articles`"
        );
    }

    #[test]
    fn test_column_statements() {
        let attr = Attribute::new("wordCount", DataType::integer()).with_default(0);
        assert_eq!(
            ddl().add_column("posts", &attr),
            "ALTER TABLE `posts` ADD COLUMN `word_count` INTEGER NULL DEFAULT 0"
        );
        assert_eq!(
            ddl().change_column("posts", &attr.clone().not_null()),
            "ALTER TABLE `posts` MODIFY COLUMN `word_count` INTEGER NOT NULL DEFAULT 0"
        );
        assert_eq!(
            ddl().remove_column("posts", "word_count"),
            "ALTER TABLE `posts` DROP COLUMN `word_count`"
        );
        assert_eq!(
            ddl().rename_column("posts", "title", "subject"),
            "ALTER TABLE `posts` RENAME COLUMN `title` TO `subject`"
        );
    }

    #[test]
    fn test_index_statements() {
        assert_eq!(
            ddl()
                .add_index("posts", &["author_id", "title"], &IndexOptions::default())
                .unwrap(),
            "CREATE INDEX `idx_posts_author_id_title` ON `posts` (`author_id`, `title`)"
        );
        assert_eq!(
            ddl()
                .add_index("users", &["email"], &IndexOptions::unique())
                .unwrap(),
            "CREATE UNIQUE INDEX `uk_users_email` ON `users` (`email`)"
        );
        assert_eq!(
            ddl()
                .add_index("users", &["email"], &IndexOptions::default().with_name("by_email"))
                .unwrap(),
            "CREATE INDEX `by_email` ON `users` (`email`)"
        );
        assert!(ddl().add_index("users", &[], &IndexOptions::default()).is_err());
        assert_eq!(
            ddl().remove_index("users", "uk_users_email"),
            "DROP INDEX `uk_users_email` ON `users`"
        );
    }
}
