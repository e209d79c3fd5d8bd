//! Document store adapter
//!
//! Documents are JSON bodies grouped by kind and addressed by a UUID. The
//! [`DocumentStore`] trait is the untyped seam; [`Collection`] is the typed
//! view a service works with. Two implementations exist: [`PgDocumentStore`]
//! keeps one `JSONB` row per document in PostgreSQL, [`MemoryDocumentStore`]
//! keeps everything in process and is used by tests and local runs.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::database;
use crate::error::{DatabaseError, DatabaseResult};

/// A typed document stored under a fixed kind
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind the documents are grouped under
    const KIND: &'static str;

    /// Top-level fields whose values must be unique within the kind
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    /// Identifier of this document
    fn id(&self) -> Uuid;

    /// Order applied to listings; creation order is kept by default
    fn sort(_documents: &mut [Self])
    where
        Self: Sized,
    {
    }
}

/// Untyped document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document
    async fn insert(&self, kind: &str, id: Uuid, body: Value, unique: &[&str])
    -> DatabaseResult<()>;

    /// Every document of a kind, in creation order
    async fn find_all(&self, kind: &str) -> DatabaseResult<Vec<Value>>;

    /// A document by identifier
    async fn find_by_id(&self, kind: &str, id: Uuid) -> DatabaseResult<Option<Value>>;

    /// The oldest document whose top-level string `field` equals `value`
    async fn find_one_by(&self, kind: &str, field: &str, value: &str)
    -> DatabaseResult<Option<Value>>;

    /// Replace the body of an existing document; `false` when it does not exist
    async fn replace(&self, kind: &str, id: Uuid, body: Value, unique: &[&str])
    -> DatabaseResult<bool>;

    /// Delete a document; `false` when it does not exist
    async fn delete(&self, kind: &str, id: Uuid) -> DatabaseResult<bool>;

    /// Check that the store is reachable
    async fn health_check(&self) -> DatabaseResult<bool>;

    /// Release the underlying resources
    async fn close(&self);
}

/// Typed view over the documents of one kind
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    /// Create a collection backed by `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Persist a new document
    pub async fn insert(&self, document: &T) -> DatabaseResult<()> {
        let body = serde_json::to_value(document)?;
        self.store
            .insert(T::KIND, document.id(), body, T::UNIQUE_FIELDS)
            .await
    }

    /// Every document, in the kind's listing order
    pub async fn find_all(&self) -> DatabaseResult<Vec<T>> {
        let mut documents = self
            .store
            .find_all(T::KIND)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        T::sort(&mut documents);
        Ok(documents)
    }

    /// The oldest document of the kind
    pub async fn first(&self) -> DatabaseResult<Option<T>> {
        Ok(self.find_all().await?.into_iter().next())
    }

    /// A document by identifier
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<T>> {
        self.store
            .find_by_id(T::KIND, id)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(DatabaseError::from)
    }

    /// A document by the value of one of its top-level string fields
    pub async fn find_one_by(&self, field: &str, value: &str) -> DatabaseResult<Option<T>> {
        self.store
            .find_one_by(T::KIND, field, value)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(DatabaseError::from)
    }

    /// Overwrite an existing document; `false` when it no longer exists
    pub async fn replace(&self, document: &T) -> DatabaseResult<bool> {
        let body = serde_json::to_value(document)?;
        self.store
            .replace(T::KIND, document.id(), body, T::UNIQUE_FIELDS)
            .await
    }

    /// Delete by identifier; `false` when it does not exist
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        self.store.delete(T::KIND, id).await
    }
}

/// PostgreSQL-backed document store
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a new document store over an initialized pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema migrations
    pub async fn migrate(&self) -> DatabaseResult<()> {
        database::run_migrations(&self.pool).await
    }
}

fn classify_write_error(error: sqlx::Error, unique: &[&str]) -> DatabaseError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            let fields = if unique.is_empty() {
                vec!["_id".to_string()]
            } else {
                unique.iter().map(|field| field.to_string()).collect()
            };
            return DatabaseError::UniqueViolation { fields };
        }
    }
    DatabaseError::Query(error)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(
        &self,
        kind: &str,
        id: Uuid,
        body: Value,
        unique: &[&str],
    ) -> DatabaseResult<()> {
        debug!("Inserting {} document {}", kind, id);

        sqlx::query(
            r#"
            INSERT INTO documents (id, kind, body)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(kind)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, unique))?;

        Ok(())
    }

    async fn find_all(&self, kind: &str) -> DatabaseResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT body
            FROM documents
            WHERE kind = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_by_id(&self, kind: &str, id: Uuid) -> DatabaseResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT body
            FROM documents
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_one_by(
        &self,
        kind: &str,
        field: &str,
        value: &str,
    ) -> DatabaseResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT body
            FROM documents
            WHERE kind = $1 AND body ->> $2 = $3
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(kind)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn replace(
        &self,
        kind: &str,
        id: Uuid,
        body: Value,
        unique: &[&str],
    ) -> DatabaseResult<bool> {
        debug!("Replacing {} document {}", kind, id);

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = $3, updated_at = now()
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(kind)
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, unique))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, kind: &str, id: Uuid) -> DatabaseResult<bool> {
        debug!("Deleting {} document {}", kind, id);

        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(kind)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        database::health_check(&self.pool).await
    }

    async fn close(&self) {
        database::close_pool(&self.pool).await;
    }
}

/// In-process document store
#[derive(Default)]
pub struct MemoryDocumentStore {
    kinds: RwLock<HashMap<String, Vec<(Uuid, Value)>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents of a kind
    pub async fn count(&self, kind: &str) -> usize {
        self.kinds.read().await.get(kind).map_or(0, Vec::len)
    }
}

fn check_unique(
    documents: &[(Uuid, Value)],
    id: Uuid,
    body: &Value,
    unique: &[&str],
) -> DatabaseResult<()> {
    let duplicated: Vec<String> = unique
        .iter()
        .filter(|field| {
            let Some(candidate) = body.get(**field).filter(|value| !value.is_null()) else {
                return false;
            };
            documents
                .iter()
                .any(|(other_id, other)| *other_id != id && other.get(**field) == Some(candidate))
        })
        .map(|field| field.to_string())
        .collect();

    if duplicated.is_empty() {
        Ok(())
    } else {
        Err(DatabaseError::UniqueViolation { fields: duplicated })
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(
        &self,
        kind: &str,
        id: Uuid,
        body: Value,
        unique: &[&str],
    ) -> DatabaseResult<()> {
        let mut kinds = self.kinds.write().await;
        let documents = kinds.entry(kind.to_string()).or_default();

        if documents.iter().any(|(existing, _)| *existing == id) {
            return Err(DatabaseError::UniqueViolation {
                fields: vec!["_id".to_string()],
            });
        }
        check_unique(documents, id, &body, unique)?;

        documents.push((id, body));
        Ok(())
    }

    async fn find_all(&self, kind: &str) -> DatabaseResult<Vec<Value>> {
        let kinds = self.kinds.read().await;
        Ok(kinds
            .get(kind)
            .map(|documents| documents.iter().map(|(_, body)| body.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_by_id(&self, kind: &str, id: Uuid) -> DatabaseResult<Option<Value>> {
        let kinds = self.kinds.read().await;
        Ok(kinds.get(kind).and_then(|documents| {
            documents
                .iter()
                .find(|(existing, _)| *existing == id)
                .map(|(_, body)| body.clone())
        }))
    }

    async fn find_one_by(
        &self,
        kind: &str,
        field: &str,
        value: &str,
    ) -> DatabaseResult<Option<Value>> {
        let kinds = self.kinds.read().await;
        Ok(kinds.get(kind).and_then(|documents| {
            documents
                .iter()
                .find(|(_, body)| body.get(field).and_then(Value::as_str) == Some(value))
                .map(|(_, body)| body.clone())
        }))
    }

    async fn replace(
        &self,
        kind: &str,
        id: Uuid,
        body: Value,
        unique: &[&str],
    ) -> DatabaseResult<bool> {
        let mut kinds = self.kinds.write().await;
        let Some(documents) = kinds.get_mut(kind) else {
            return Ok(false);
        };
        check_unique(documents, id, &body, unique)?;

        match documents.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, stored)) => {
                *stored = body;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, kind: &str, id: Uuid) -> DatabaseResult<bool> {
        let mut kinds = self.kinds.write().await;
        let Some(documents) = kinds.get_mut(kind) else {
            return Ok(false);
        };
        let before = documents.len();
        documents.retain(|(existing, _)| *existing != id);
        Ok(documents.len() < before)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id")]
        id: Uuid,
        title: String,
        slug: String,
    }

    impl Document for Note {
        const KIND: &'static str = "note";
        const UNIQUE_FIELDS: &'static [&'static str] = &["slug"];

        fn id(&self) -> Uuid {
            self.id
        }

        fn sort(documents: &mut [Self]) {
            documents.sort_by(|a, b| a.title.cmp(&b.title));
        }
    }

    fn note(title: &str, slug: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
        }
    }

    fn notes() -> (Arc<MemoryDocumentStore>, Collection<Note>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let collection = Collection::new(store.clone());
        (store, collection)
    }

    #[tokio::test]
    async fn test_insert_and_find() -> DatabaseResult<()> {
        let (_, collection) = notes();
        let first = note("first", "first");
        collection.insert(&first).await?;

        assert_eq!(collection.find_by_id(first.id).await?, Some(first.clone()));
        assert_eq!(collection.find_one_by("slug", "first").await?, Some(first));
        assert_eq!(collection.find_by_id(Uuid::new_v4()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_uses_document_order() -> DatabaseResult<()> {
        let (_, collection) = notes();
        collection.insert(&note("b", "b")).await?;
        collection.insert(&note("a", "a")).await?;

        let titles: Vec<String> = collection
            .find_all()
            .await?
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_fields_are_enforced() -> DatabaseResult<()> {
        let (store, collection) = notes();
        collection.insert(&note("one", "same")).await?;

        let err = collection.insert(&note("two", "same")).await.unwrap_err();
        assert!(
            matches!(err, DatabaseError::UniqueViolation { ref fields } if fields == &["slug"])
        );
        assert_eq!(store.count(Note::KIND).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_keeps_own_unique_value() -> DatabaseResult<()> {
        let (_, collection) = notes();
        let mut stored = note("one", "one");
        collection.insert(&stored).await?;

        stored.title = "renamed".to_string();
        assert!(collection.replace(&stored).await?);
        assert_eq!(collection.find_by_id(stored.id).await?, Some(stored));

        assert!(!collection.replace(&note("ghost", "ghost")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_twice() -> DatabaseResult<()> {
        let (store, collection) = notes();
        let stored = note("one", "one");
        collection.insert(&stored).await?;

        assert!(collection.delete(stored.id).await?);
        assert!(!collection.delete(stored.id).await?);
        assert_eq!(store.count(Note::KIND).await, 0);
        Ok(())
    }
}
