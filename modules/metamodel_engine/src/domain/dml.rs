//! Parameterised DML text for instance tables
//!
//! Statements carry one placeholder per bound value; the values themselves are
//! produced by [`super::values`].

use super::ddl::{StoreTarget, TableLayout};
use crate::infra::datasource::sql::placeholder;
use sea_orm::DbBackend;

/// A single `WHERE` predicate on a lower-cased column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = ?`, consumes one bound value
    Eq(String),
    IsNull(String),
}

pub struct DmlBuilder<'a> {
    target: &'a StoreTarget,
    backend: DbBackend,
}

impl<'a> DmlBuilder<'a> {
    pub fn new(target: &'a StoreTarget, backend: DbBackend) -> Self {
        Self { target, backend }
    }

    fn params(&self, from: usize, count: usize) -> String {
        (from..from + count)
            .map(|i| placeholder(self.backend, i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn insert(&self, table: &str, columns: &[String]) -> String {
        let names = columns
            .iter()
            .map(|c| self.target.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({names}) VALUES ({})",
            self.target.qualified(table),
            self.params(1, columns.len())
        )
    }

    /// `UPDATE ... SET` over the given columns; the id binds last
    pub fn update(&self, table: &str, columns: &[String]) -> String {
        let sets = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", self.target.quote(c), placeholder(self.backend, i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {sets} WHERE {} = {}",
            self.target.qualified(table),
            self.target.quote("id"),
            placeholder(self.backend, columns.len() + 1)
        )
    }

    pub fn select_by_id(&self, table: &str) -> String {
        format!(
            "SELECT * FROM {} WHERE {} = {}",
            self.target.qualified(table),
            self.target.quote("id"),
            placeholder(self.backend, 1)
        )
    }

    pub fn delete_by_ids(&self, table: &str, count: usize) -> String {
        let predicate = if count == 1 {
            format!("= {}", placeholder(self.backend, 1))
        } else {
            format!("IN ({})", self.params(1, count))
        };
        format!(
            "DELETE FROM {} WHERE {} {predicate}",
            self.target.qualified(table),
            self.target.quote("id")
        )
    }

    /// `WHERE` clause with a leading space, or empty.
    ///
    /// Platform listings skip bookkeeping rows that point at an external store.
    pub fn where_clause(&self, predicates: &[Predicate]) -> String {
        let mut index = 0;
        let mut parts: Vec<String> = predicates
            .iter()
            .map(|p| match p {
                Predicate::Eq(column) => {
                    index += 1;
                    format!("{} = {}", self.target.quote(column), placeholder(self.backend, index))
                }
                Predicate::IsNull(column) => format!("{} IS NULL", self.target.quote(column)),
            })
            .collect();
        if self.target.layout == TableLayout::Platform {
            parts.push(format!("{} IS NULL", self.target.quote("datasource_id")));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    pub fn count(&self, table: &str, predicates: &[Predicate]) -> String {
        format!(
            "SELECT COUNT(*) AS total FROM {}{}",
            self.target.qualified(table),
            self.where_clause(predicates)
        )
    }

    /// Newest first, optionally limited to one page
    pub fn select(&self, table: &str, predicates: &[Predicate], page: Option<(u64, u64)>) -> String {
        let mut sql = format!(
            "SELECT * FROM {}{} ORDER BY {} DESC",
            self.target.qualified(table),
            self.where_clause(predicates),
            self.target.quote("created_at")
        );
        if let Some((limit, offset)) = page {
            sql.push(' ');
            sql.push_str(&self.target.connector.paginate(limit, offset));
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::datasource::dialects::{MySqlConnector, PostgresConnector, SqlServerConnector};
    use crate::infra::datasource::DialectConnector;
    use std::sync::Arc;

    fn target(connector: Arc<dyn DialectConnector>, layout: TableLayout) -> StoreTarget {
        StoreTarget {
            label: "t".to_string(),
            connector,
            layout,
            schema: None,
        }
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insert_and_update_number_placeholders() {
        let pg = target(Arc::new(PostgresConnector), TableLayout::Platform);
        let dml = DmlBuilder::new(&pg, DbBackend::Postgres);
        assert_eq!(
            dml.insert("default_person", &cols(&["id", "name"])),
            "INSERT INTO \"default_person\" (\"id\", \"name\") VALUES ($1, $2)"
        );
        assert_eq!(
            dml.update("default_person", &cols(&["updated_at", "name"])),
            "UPDATE \"default_person\" SET \"updated_at\" = $1, \"name\" = $2 WHERE \"id\" = $3"
        );
    }

    #[test]
    fn mysql_uses_question_marks_and_backticks() {
        let my = target(Arc::new(MySqlConnector::mysql()), TableLayout::External);
        let dml = DmlBuilder::new(&my, DbBackend::MySql);
        assert_eq!(
            dml.delete_by_ids("crm_order", 3),
            "DELETE FROM `crm_order` WHERE `id` IN (?, ?, ?)"
        );
        assert_eq!(dml.delete_by_ids("crm_order", 1), "DELETE FROM `crm_order` WHERE `id` = ?");
    }

    #[test]
    fn where_clause_numbers_only_bound_predicates() {
        let pg = target(Arc::new(PostgresConnector), TableLayout::External);
        let dml = DmlBuilder::new(&pg, DbBackend::Postgres);
        let predicates = vec![
            Predicate::Eq("a".into()),
            Predicate::IsNull("b".into()),
            Predicate::Eq("c".into()),
        ];
        assert_eq!(
            dml.where_clause(&predicates),
            " WHERE \"a\" = $1 AND \"b\" IS NULL AND \"c\" = $2"
        );
        assert_eq!(dml.where_clause(&[]), "");
    }

    #[test]
    fn platform_listing_hides_bookkeeping_rows() {
        let pg = target(Arc::new(PostgresConnector), TableLayout::Platform);
        let dml = DmlBuilder::new(&pg, DbBackend::Postgres);
        assert_eq!(
            dml.count("x", &[]),
            "SELECT COUNT(*) AS total FROM \"x\" WHERE \"datasource_id\" IS NULL"
        );
    }

    #[test]
    fn paging_follows_dialect() {
        let ms = target(Arc::new(SqlServerConnector), TableLayout::External);
        let dml = DmlBuilder::new(&ms, DbBackend::Postgres);
        assert!(dml
            .select("x", &[], Some((10, 20)))
            .ends_with("ORDER BY [created_at] DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));
    }
}
