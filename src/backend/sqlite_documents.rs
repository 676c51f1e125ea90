//! SqliteDocumentStore - schemaless document collections kept in SQLite.
//!
//! Each row holds one JSON object in `fields`. Ordered queries sort on a
//! top-level field through `json_extract`, with insertion order as the
//! tie-breaker. Server timestamps come from a [`ServerClock`] so they never
//! repeat within this store.

use super::{
    BackendError, BackendResult, Document, DocumentApi, Fields, NewDocument, ServerClock,
    ensure_field_name,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{QueryBuilder, Row, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
    clock: Arc<ServerClock>,
}

impl SqliteDocumentStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self {
            db,
            clock: Arc::new(ServerClock::default()),
        }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> BackendResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.db)
            .await
            .map_err(|err| BackendError::Sqlx(err.into()))
    }

    fn decode(id: String, raw: &str) -> BackendResult<Document> {
        let fields = match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        Ok(Document { id, fields })
    }

    async fn fetch_fields(&self, collection: &str, id: &str) -> BackendResult<Option<String>> {
        let row = sqlx::query("SELECT fields FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("fields")))
    }
}

#[async_trait]
impl DocumentApi for SqliteDocumentStore {
    async fn create(&self, collection: &str, doc: NewDocument) -> BackendResult<String> {
        let NewDocument {
            mut fields,
            server_timestamps,
        } = doc;

        if !server_timestamps.is_empty() {
            let stamp = ServerClock::format(self.clock.next());
            for name in server_timestamps {
                ensure_field_name(&name)?;
                fields.insert(name, Value::String(stamp.clone()));
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(&fields)?;

        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(&body)
            .execute(&*self.db)
            .await?;

        debug!(collection, id = %id, "created document");
        Ok(id)
    }

    async fn query_ordered(
        &self,
        collection: &str,
        sort_field: &str,
        descending: bool,
    ) -> BackendResult<Vec<Document>> {
        ensure_field_name(sort_field)?;
        let direction = if descending { "DESC" } else { "ASC" };

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT id, fields FROM documents WHERE collection = ");
        builder.push_bind(collection);
        builder.push(" ORDER BY json_extract(fields, ");
        builder.push_bind(format!("$.{}", sort_field));
        builder.push(format!(") {direction}, seq {direction}"));

        let rows = builder.build().fetch_all(&*self.db).await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let raw: String = row.get("fields");
                Self::decode(id, &raw)
            })
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> BackendResult<Option<Document>> {
        match self.fetch_fields(collection, id).await? {
            Some(raw) => Ok(Some(Self::decode(id.to_string(), &raw)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, collection: &str, id: &str, partial: Fields) -> BackendResult<()> {
        for name in partial.keys() {
            ensure_field_name(name)?;
        }

        // Read-modify-write inside one transaction keeps the merge atomic.
        let mut tx = self.db.begin().await?;
        let row = sqlx::query("SELECT fields FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(BackendError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        let mut doc = Self::decode(id.to_string(), &row.get::<String, _>("fields"))?;
        doc.fields.extend(partial);

        sqlx::query("UPDATE documents SET fields = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&doc.fields)?)
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(collection, id, "updated document");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> BackendResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        debug!(collection, id, "deleted document");
        Ok(())
    }

    async fn ping(&self) -> BackendResult<()> {
        let v = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if v == 1 {
            Ok(())
        } else {
            Err(BackendError::Sqlx(sqlx::Error::Protocol(format!(
                "unexpected result: {}",
                v
            ))))
        }
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteDocumentStore {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    let store = SqliteDocumentStore::new(Arc::new(pool));
    store.migrate().await.expect("run migrations");
    store
}
