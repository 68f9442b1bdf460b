//! services/api/src/adapters/db.rs
//!
//! This module contains the Postgres document store, the concrete implementation
//! of the `DocumentStore` port from the `core` crate. Documents are stored
//! schemaless as JSONB rows keyed by collection and id, using `sqlx`.

use async_trait::async_trait;
use memory_wall_core::domain::{Fields, StoredDocument};
use memory_wall_core::ports::{DocumentStore, PortError, PortResult};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::warn;

use super::passwords::new_token;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: String,
    fields: Value,
}

impl DocumentRecord {
    fn into_domain(self) -> PortResult<StoredDocument> {
        Ok(StoredDocument {
            fields: into_fields(self.fields, &self.id)?,
            id: self.id,
        })
    }
}

fn into_fields(value: Value, id: &str) -> PortResult<Fields> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(PortError::Unexpected(format!(
            "Document {} holds {} instead of an object",
            id, other
        ))),
    }
}

/// Converts listed rows, skipping any whose fields are not a JSON object.
fn documents_from_records(records: Vec<DocumentRecord>) -> Vec<StoredDocument> {
    records
        .into_iter()
        .filter_map(|record| match record.into_domain() {
            Ok(document) => Some(document),
            Err(e) => {
                warn!("Skipping malformed document: {:?}", e);
                None
            }
        })
        .collect()
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_document(&self, collection: &str, fields: Fields) -> PortResult<String> {
        let id = new_token();
        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Value::Object(fields))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(id)
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO UPDATE SET fields = EXCLUDED.fields",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> PortResult<Fields> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, fields FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("{}/{}", collection, id)),
            _ => unexpected(e),
        })?;
        into_fields(record.fields, id)
    }

    async fn list_documents(&self, collection: &str) -> PortResult<Vec<StoredDocument>> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, fields FROM documents WHERE collection = $1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(documents_from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_rows_are_skipped_when_listing() {
        let records = vec![
            DocumentRecord {
                id: "good".into(),
                fields: json!({ "name": "Alice", "thought": "Best four years ever" }),
            },
            DocumentRecord {
                id: "bad".into(),
                fields: json!("not an object"),
            },
            DocumentRecord {
                id: "null".into(),
                fields: Value::Null,
            },
        ];

        let documents = documents_from_records(records);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "good");
        assert_eq!(documents[0].fields["name"], "Alice");
    }

    #[test]
    fn single_lookups_still_reject_non_objects() {
        assert!(into_fields(json!([1, 2]), "x").is_err());
        assert!(into_fields(json!({}), "x").is_ok());
    }
}
