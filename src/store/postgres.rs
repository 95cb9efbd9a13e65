use async_trait::async_trait;
use log::info;
use sqlx::PgPool;

use super::{header_matches, Cell, Column, ColumnKind, StoreError, TableStore};

/// PostgreSQL-backed store. The store identifier is a schema and every tab is
/// a table inside it; the header row is the table's ordered column list.
#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
    schema: String,
}

impl PgTableStore {
    /// `schema` must satisfy `is_valid_identifier`; config loading checks this.
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgTableStore { pool, schema: schema.into() }
    }

    fn qualified(&self, tab: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(tab))
    }

    async fn tab_exists(&self, tab: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(&self.schema)
        .bind(tab)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_tab(&self, tab: &str, header: &[Column]) -> Result<(), StoreError> {
        let schema_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)")
                .bind(&self.schema)
                .fetch_one(&self.pool)
                .await?;

        let mut tx = self.pool.begin().await?;
        if !schema_exists {
            sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema)))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(&create_table_sql(&self.qualified(tab), header))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn check_header(&self, tab: &str, header: &[Column]) -> Result<(), StoreError> {
        let found = self.read_header(tab).await?;
        if !header_matches(&found, header) {
            return Err(StoreError::HeaderMismatch { tab: tab.to_string(), found });
        }
        Ok(())
    }
}

/// Plain SQL identifiers only, so names can be spliced into DDL safely.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(qualified: &str, header: &[Column]) -> String {
    let columns: Vec<String> = header
        .iter()
        .map(|column| {
            let ty = match column.kind {
                ColumnKind::Text => "TEXT",
                ColumnKind::Integer => "BIGINT",
            };
            format!("{} {} NOT NULL", quote_ident(column.name), ty)
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (row_id BIGSERIAL PRIMARY KEY, {})",
        qualified,
        columns.join(", ")
    )
}

fn insert_sql(qualified: &str, header: &[String]) -> String {
    let columns: Vec<String> = header.iter().map(|name| quote_ident(name)).collect();
    let params: Vec<String> = (1..=header.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified,
        columns.join(", "),
        params.join(", ")
    )
}

// Another writer created the same schema or table between our check and our DDL.
fn is_already_exists(code: &str) -> bool {
    matches!(code, "23505" | "42P06" | "42P07")
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn ensure_tab(&self, tab: &str, header: &[Column]) -> Result<bool, StoreError> {
        if self.tab_exists(tab).await? {
            self.check_header(tab, header).await?;
            return Ok(false);
        }

        match self.create_tab(tab, header).await {
            Ok(()) => {
                info!("Created tab {} with header", self.qualified(tab));
                Ok(true)
            }
            Err(StoreError::Database(err))
                if err
                    .as_database_error()
                    .and_then(|db| db.code())
                    .is_some_and(|code| is_already_exists(&code)) =>
            {
                self.check_header(tab, header).await?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn read_header(&self, tab: &str) -> Result<Vec<String>, StoreError> {
        let header: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::TEXT FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 AND column_name <> 'row_id' \
             ORDER BY ordinal_position",
        )
        .bind(&self.schema)
        .bind(tab)
        .fetch_all(&self.pool)
        .await?;

        if header.is_empty() {
            return Err(StoreError::TabNotFound(tab.to_string()));
        }
        Ok(header)
    }

    async fn append_row(&self, tab: &str, row: &[Cell]) -> Result<(), StoreError> {
        let header = self.read_header(tab).await?;
        if header.len() != row.len() {
            return Err(StoreError::RowShape { expected: header.len(), got: row.len() });
        }

        let sql = insert_sql(&self.qualified(tab), &header);
        let mut query = sqlx::query(&sql);
        for cell in row {
            query = match cell {
                Cell::Text(value) => query.bind(value.as_str()),
                Cell::Integer(value) => query.bind(*value),
            };
        }
        query.execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HEADER;

    #[test]
    fn accepts_only_plain_identifiers() {
        assert!(is_valid_identifier("uploads"));
        assert!(is_valid_identifier("_file_uploads_2024"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2024_uploads"));
        assert!(!is_valid_identifier("uploads; DROP TABLE x"));
        assert!(!is_valid_identifier("my-tab"));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn builds_create_table_from_header() {
        let sql = create_table_sql("\"uploads\".\"file_uploads\"", &HEADER);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"uploads\".\"file_uploads\" (row_id BIGSERIAL PRIMARY KEY, \
             \"Name\" TEXT NOT NULL, \"Bucket\" TEXT NOT NULL, \"Size\" BIGINT NOT NULL, \
             \"ContentType\" TEXT NOT NULL, \"CreatedAt\" TEXT NOT NULL, \"Source\" TEXT NOT NULL)"
        );
    }

    #[test]
    fn concurrent_creation_codes_count_as_existing() {
        assert!(is_already_exists("42P07"));
        assert!(is_already_exists("42P06"));
        assert!(is_already_exists("23505"));
        assert!(!is_already_exists("42501"));
        assert!(!is_already_exists("08006"));
    }

    #[test]
    fn builds_positional_insert() {
        let header = vec!["Name".to_string(), "Size".to_string()];
        assert_eq!(
            insert_sql("\"s\".\"t\"", &header),
            "INSERT INTO \"s\".\"t\" (\"Name\", \"Size\") VALUES ($1, $2)"
        );
    }
}
