//! PostgreSQL document store: one `documents` table per namespace schema, payloads as JSONB.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    merge_fields, next_id, DeleteOutcome, Document, DocumentStore, Filter, FindOptions,
    UpdateOutcome,
};
use crate::error::StoreError;
use crate::partition::{CollectionRef, Namespace};

/// PostgreSQL schema backing each namespace. Must be valid identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaNames {
    pub listings: String,
    pub applications: String,
}

impl Default for SchemaNames {
    fn default() -> Self {
        SchemaNames {
            listings: "visa_hub".into(),
            applications: "user_applications".into(),
        }
    }
}

impl SchemaNames {
    fn schema(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Listings => &self.listings,
            Namespace::Applications => &self.applications,
        }
    }

    /// Schema-qualified documents table (e.g. `"visa_hub"."documents"`).
    fn documents_table(&self, namespace: Namespace) -> String {
        format!("{}.{}", quote_ident(self.schema(namespace)), quote_ident("documents"))
    }

    fn all(&self) -> [&str; 2] {
        [&self.listings, &self.applications]
    }
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    schemas: SchemaNames,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schemas: SchemaNames) -> Self {
        PgDocumentStore { pool, schemas }
    }

    fn table(&self, coll: &CollectionRef) -> String {
        self.schemas.documents_table(coll.namespace())
    }
}

/// Create each namespace schema and its `documents` table if missing.
pub async fn ensure_document_tables(
    pool: &PgPool,
    schemas: &SchemaNames,
) -> Result<(), StoreError> {
    for schema in schemas.all() {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
            .execute(pool)
            .await?;
        let table = format!("{}.{}", quote_ident(schema), quote_ident("documents"));
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                collection TEXT NOT NULL,
                id UUID NOT NULL,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
            table
        );
        sqlx::query(&ddl).execute(pool).await?;
        let index = format!(
            "CREATE INDEX IF NOT EXISTS documents_payload_idx \
             ON {} USING GIN (payload jsonb_path_ops)",
            table
        );
        sqlx::query(&index).execute(pool).await?;
        tracing::info!(schema = %schema, "document table ready");
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn into_document(coll: &CollectionRef, id: Uuid, payload: Value) -> Result<Document, StoreError> {
    match payload {
        Value::Object(fields) => Ok(Document { id, fields }),
        other => Err(StoreError::CorruptDocument {
            collection: coll.to_string(),
            id: id.to_string(),
            reason: format!("payload is not an object: {}", other),
        }),
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_one(
        &self,
        coll: &CollectionRef,
        fields: Map<String, Value>,
    ) -> Result<Uuid, StoreError> {
        let id = next_id();
        let sql = format!(
            "INSERT INTO {} (collection, id, payload) VALUES ($1, $2, $3)",
            self.table(coll)
        );
        tracing::debug!(collection = %coll, %id, "insert");
        sqlx::query(&sql)
            .bind(coll.name())
            .bind(id)
            .bind(Value::Object(fields))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find(
        &self,
        coll: &CollectionRef,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let order = if options.newest_first { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT id, payload FROM {} WHERE collection = $1 AND payload @> $2 \
             ORDER BY id {} LIMIT $3 OFFSET $4",
            self.table(coll),
            order
        );
        tracing::debug!(collection = %coll, filter = ?filter, options = ?options, "find");
        let rows: Vec<(Uuid, Value)> = sqlx::query_as(&sql)
            .bind(coll.name())
            .bind(filter.to_json())
            .bind(options.limit.map(to_i64))
            .bind(to_i64(options.skip))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(id, payload)| into_document(coll, id, payload))
            .collect()
    }

    async fn find_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "SELECT payload FROM {} WHERE collection = $1 AND id = $2",
            self.table(coll)
        );
        tracing::debug!(collection = %coll, %id, "find_by_id");
        let row: Option<(Value,)> = sqlx::query_as(&sql)
            .bind(coll.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(payload,)| into_document(coll, id, payload)).transpose()
    }

    async fn update_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
        fields: Map<String, Value>,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let table = self.table(coll);
        tracing::debug!(collection = %coll, %id, upsert, "update_by_id");
        let mut tx = self.pool.begin().await?;
        let current: Option<(Value,)> = sqlx::query_as(&format!(
            "SELECT payload FROM {} WHERE collection = $1 AND id = $2 FOR UPDATE",
            table
        ))
        .bind(coll.name())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match current {
            Some((payload,)) => {
                let mut doc = into_document(coll, id, payload)?;
                let changed = merge_fields(&mut doc.fields, fields);
                if changed {
                    sqlx::query(&format!(
                        "UPDATE {} SET payload = $3 WHERE collection = $1 AND id = $2",
                        table
                    ))
                    .bind(coll.name())
                    .bind(id)
                    .bind(Value::Object(doc.fields))
                    .execute(&mut *tx)
                    .await?;
                }
                UpdateOutcome {
                    matched: 1,
                    modified: u64::from(changed),
                    upserted_id: None,
                }
            }
            None if upsert => {
                let payload = Value::Object(fields);
                let inserted = sqlx::query(&format!(
                    "INSERT INTO {} (collection, id, payload) VALUES ($1, $2, $3) \
                     ON CONFLICT (collection, id) DO NOTHING",
                    table
                ))
                .bind(coll.name())
                .bind(id)
                .bind(&payload)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 1 {
                    UpdateOutcome {
                        matched: 0,
                        modified: 0,
                        upserted_id: Some(id),
                    }
                } else {
                    // Lost a race with a concurrent upsert of the same id.
                    sqlx::query(&format!(
                        "UPDATE {} SET payload = payload || $3 WHERE collection = $1 AND id = $2",
                        table
                    ))
                    .bind(coll.name())
                    .bind(id)
                    .bind(&payload)
                    .execute(&mut *tx)
                    .await?;
                    UpdateOutcome {
                        matched: 1,
                        modified: 1,
                        upserted_id: None,
                    }
                }
            }
            None => UpdateOutcome::default(),
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
    ) -> Result<DeleteOutcome, StoreError> {
        let sql = format!("DELETE FROM {} WHERE collection = $1 AND id = $2", self.table(coll));
        tracing::debug!(collection = %coll, %id, "delete_by_id");
        let result = sqlx::query(&sql)
            .bind(coll.name())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(DeleteOutcome {
            deleted: result.rows_affected(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_swaps_database_name() {
        let url = "postgres://u:p@localhost:5432/global_visa_hub?sslmode=disable";
        let (admin, db) = parse_db_name_from_url(url).unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "global_visa_hub");
    }

    #[test]
    fn namespaces_map_to_quoted_schemas() {
        let schemas = SchemaNames::default();
        assert_eq!(
            schemas.documents_table(Namespace::Listings),
            "\"visa_hub\".\"documents\""
        );
        assert_eq!(
            schemas.documents_table(Namespace::Applications),
            "\"user_applications\".\"documents\""
        );
    }

    #[test]
    fn identifiers_escape_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
