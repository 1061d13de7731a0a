//! Weighted free-text search over transactions and their owners.
//!
//! Each column carries a weight. A term scores `15 × weight` on an exact
//! match, `5 × weight` on a prefix match and `1 × weight` on a substring
//! match, all case-insensitive. Rows scoring zero are not results.

use sqlx::{Postgres, QueryBuilder};

use crate::error::LedgerResult;
use crate::validation::validate_sql_identifier;

pub const EXACT_MULTIPLIER: u32 = 15;
pub const PREFIX_MULTIPLIER: u32 = 5;
pub const CONTAINS_MULTIPLIER: u32 = 1;
pub const DEFAULT_WEIGHT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedColumn {
    pub table: String,
    pub column: String,
    pub weight: u32,
}

impl WeightedColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>, weight: u32) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            weight,
        }
    }

    fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// `LEFT JOIN {table} ON {local_table}.{local_column} = {table}.{foreign_column}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJoin {
    pub table: String,
    pub local_table: String,
    pub local_column: String,
    pub foreign_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDescriptor {
    pub columns: Vec<WeightedColumn>,
    pub joins: Vec<SearchJoin>,
}

impl SearchDescriptor {
    /// Transaction uuid plus the owning user's email and username.
    pub fn transactions(transaction_table: &str, users_table: &str) -> Self {
        Self {
            columns: vec![
                WeightedColumn::new(transaction_table, "uuid", DEFAULT_WEIGHT),
                WeightedColumn::new(users_table, "email", DEFAULT_WEIGHT),
                WeightedColumn::new(users_table, "username", DEFAULT_WEIGHT),
            ],
            joins: vec![SearchJoin {
                table: users_table.to_string(),
                local_table: transaction_table.to_string(),
                local_column: "payable_id".to_string(),
                foreign_column: "id".to_string(),
            }],
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        for column in &self.columns {
            validate_sql_identifier("search.table", &column.table)?;
            validate_sql_identifier("search.column", &column.column)?;
        }
        for join in &self.joins {
            validate_sql_identifier("search.join.table", &join.table)?;
            validate_sql_identifier("search.join.local_table", &join.local_table)?;
            validate_sql_identifier("search.join.local_column", &join.local_column)?;
            validate_sql_identifier("search.join.foreign_column", &join.foreign_column)?;
        }
        Ok(())
    }

    /// Score of one column value against the term.
    pub fn column_score(weight: u32, value: &str, term: &str) -> u32 {
        let value = value.to_lowercase();
        let term = term.to_lowercase();
        if term.is_empty() {
            return 0;
        }

        if value == term {
            weight.saturating_mul(EXACT_MULTIPLIER)
        } else if value.starts_with(&term) {
            weight.saturating_mul(PREFIX_MULTIPLIER)
        } else if value.contains(&term) {
            weight.saturating_mul(CONTAINS_MULTIPLIER)
        } else {
            0
        }
    }

    /// Total score of a row; `lookup` returns the value of a column, or
    /// `None` when the row has no such value (e.g. an unmatched join).
    pub fn score<F>(&self, term: &str, lookup: F) -> u32
    where
        F: Fn(&WeightedColumn) -> Option<String>,
    {
        self.columns
            .iter()
            .filter_map(|column| {
                lookup(column).map(|value| Self::column_score(column.weight, &value, term))
            })
            .fold(0u32, u32::saturating_add)
    }

    pub fn push_joins(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for join in &self.joins {
            builder.push(format!(
                " LEFT JOIN {table} ON {local_table}.{local_column} = {table}.{foreign_column}",
                table = join.table,
                local_table = join.local_table,
                local_column = join.local_column,
                foreign_column = join.foreign_column,
            ));
        }
    }

    /// Pushes the relevance expression, binding the escaped term patterns.
    pub fn push_relevance(&self, builder: &mut QueryBuilder<'_, Postgres>, term: &str) {
        let escaped = escape_like(term);
        builder.push("(0");
        for column in &self.columns {
            let target = format!("{}::text", column.qualified());
            let exact = column.weight.saturating_mul(EXACT_MULTIPLIER);
            let prefix = column.weight.saturating_mul(PREFIX_MULTIPLIER);
            let contains = column.weight.saturating_mul(CONTAINS_MULTIPLIER);

            builder.push(format!(" + CASE WHEN {} ILIKE ", target));
            builder.push_bind(escaped.clone());
            builder.push(format!(" THEN {} WHEN {} ILIKE ", exact, target));
            builder.push_bind(format!("{}%", escaped));
            builder.push(format!(" THEN {} WHEN {} ILIKE ", prefix, target));
            builder.push_bind(format!("%{}%", escaped));
            builder.push(format!(" THEN {} ELSE 0 END", contains));
        }
        builder.push(")");
    }
}

/// Escapes LIKE wildcards so the term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> SearchDescriptor {
        SearchDescriptor::transactions("transactions", "users")
    }

    #[test]
    fn default_descriptor_weights() {
        let d = descriptor();
        let weights: Vec<(String, u32)> = d
            .columns
            .iter()
            .map(|c| (c.qualified(), c.weight))
            .collect();
        assert_eq!(
            weights,
            vec![
                ("transactions.uuid".to_string(), 10),
                ("users.email".to_string(), 10),
                ("users.username".to_string(), 10),
            ]
        );
        assert_eq!(d.joins[0].local_column, "payable_id");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn column_score_tiers() {
        assert_eq!(SearchDescriptor::column_score(10, "Alice", "alice"), 150);
        assert_eq!(SearchDescriptor::column_score(10, "alice@example.com", "alice"), 50);
        assert_eq!(SearchDescriptor::column_score(10, "bob.alice", "alice"), 10);
        assert_eq!(SearchDescriptor::column_score(10, "bob", "alice"), 0);
        assert_eq!(SearchDescriptor::column_score(10, "bob", ""), 0);
    }

    #[test]
    fn score_sums_matching_columns() {
        let d = descriptor();
        let score = d.score("alice", |column| match column.column.as_str() {
            "email" => Some("alice@example.com".to_string()),
            "username" => Some("alice".to_string()),
            _ => None,
        });
        assert_eq!(score, 50 + 150);
    }

    #[test]
    fn huge_weights_saturate() {
        assert_eq!(SearchDescriptor::column_score(u32::MAX, "alice", "alice"), u32::MAX);

        let d = SearchDescriptor {
            columns: vec![
                WeightedColumn::new("users", "email", u32::MAX),
                WeightedColumn::new("users", "username", u32::MAX),
            ],
            joins: Vec::new(),
        };
        assert_eq!(d.score("alice", |_| Some("alice".to_string())), u32::MAX);
    }

    #[test]
    fn invalid_identifiers_rejected() {
        let d = SearchDescriptor::transactions("transactions", "users; drop");
        assert!(d.validate().is_err());
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn renders_join_and_relevance() {
        let d = descriptor();
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM transactions");
        d.push_joins(&mut builder);
        builder.push(" WHERE ");
        d.push_relevance(&mut builder, "alice");
        builder.push(" > 0");

        let sql = builder.sql();
        assert!(sql.contains("LEFT JOIN users ON transactions.payable_id = users.id"));
        assert!(sql.contains("CASE WHEN users.email::text ILIKE $4 THEN 150"));
        assert!(sql.contains("WHEN transactions.uuid::text ILIKE $3 THEN 10 ELSE 0 END"));
        assert!(sql.ends_with(") > 0"));
    }
}
