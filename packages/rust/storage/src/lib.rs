//! Turso Embedded / libSQL vector store (offline mode).
//!
//! The [`VectorStore`] struct wraps a libSQL database holding named document
//! collections and their embeddings. Nearest-neighbour search is delegated to
//! libSQL's native vector functions (`vector32`, `vector_distance_cos`).
//!
//! **Access rules:**
//! - Offline indexing job and tests: read-write via [`VectorStore::open`]
//! - Chat front-ends: read-only via [`VectorStore::open_readonly`]

mod migrations;

use std::path::Path;

use bankchat_shared::{BankChatError, Result};
use chrono::Utc;
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Summary of a stored collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    /// Model the collection was embedded with, if recorded.
    pub embedding_model: Option<String>,
    /// Length of every embedding in the collection.
    pub dimension: u32,
    pub document_count: u64,
}

/// A similarity search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub content: String,
    /// Cosine distance to the query (0 = identical direction).
    pub distance: f64,
}

/// Primary storage handle wrapping a libSQL database.
pub struct VectorStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> BankChatError {
    BankChatError::Storage(e.to_string())
}

impl VectorStore {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| BankChatError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let store = Self {
            db,
            conn,
            readonly: false,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an existing database at `path` in read-only mode.
    ///
    /// Unlike [`VectorStore::open`], a missing file is an error: the chat
    /// front-ends never create the index themselves.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BankChatError::Storage(format!(
                "vector database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        BankChatError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(BankChatError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Collection operations
    // -----------------------------------------------------------------------

    /// Create an empty collection. Fails if the name is already taken.
    pub async fn create_collection(
        &self,
        name: &str,
        embedding_model: Option<&str>,
        dimension: u32,
    ) -> Result<()> {
        self.check_writable()?;
        if dimension == 0 {
            return Err(BankChatError::validation(
                "collection dimension must be greater than zero",
            ));
        }
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO collections (name, embedding_model, dimension, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, embedding_model, i64::from(dimension), now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        tracing::info!(collection = name, dimension, "created collection");
        Ok(())
    }

    /// List all collections with their document counts, ordered by name.
    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.name, c.embedding_model, c.dimension, COUNT(d.id)
                 FROM collections c LEFT JOIN documents d ON d.collection_id = c.id
                 GROUP BY c.id ORDER BY c.name",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_collection_info(&row)?);
        }
        Ok(results)
    }

    /// Look up a collection by name.
    pub async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.name, c.embedding_model, c.dimension, COUNT(d.id)
                 FROM collections c LEFT JOIN documents d ON d.collection_id = c.id
                 WHERE c.name = ?1
                 GROUP BY c.id",
                params![name],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_collection_info(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Delete a collection and all of its documents.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.check_writable()?;
        let (collection_id, _) = self.resolve_collection(name).await?;
        self.conn
            .execute(
                "DELETE FROM documents WHERE collection_id = ?1",
                params![collection_id],
            )
            .await
            .map_err(storage_err)?;
        self.conn
            .execute("DELETE FROM collections WHERE id = ?1", params![collection_id])
            .await
            .map_err(storage_err)?;
        tracing::info!(collection = name, "deleted collection");
        Ok(())
    }

    /// Resolve a collection name to `(id, dimension)`.
    async fn resolve_collection(&self, name: &str) -> Result<(i64, u32)> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, dimension FROM collections WHERE name = ?1",
                params![name],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok((
                row.get::<i64>(0).map_err(storage_err)?,
                row.get::<u32>(1).map_err(storage_err)?,
            )),
            None => Err(BankChatError::collection_not_found(name)),
        }
    }

    // -----------------------------------------------------------------------
    // Document operations
    // -----------------------------------------------------------------------

    /// Add a document and its embedding to a collection.
    ///
    /// Documents are deduplicated by content within a collection. Returns
    /// `true` if a new row was written.
    pub async fn add_document(
        &self,
        collection: &str,
        content: &str,
        metadata_json: Option<&str>,
        embedding: &[f32],
    ) -> Result<bool> {
        self.check_writable()?;
        let (collection_id, dimension) = self.resolve_collection(collection).await?;
        check_dimension(dimension, embedding.len())?;

        let id = Uuid::now_v7().to_string();
        let hash = content_hash(content);
        let vector = vector_literal(embedding)?;
        let written = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO documents
                   (id, collection_id, content, content_hash, metadata_json, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, vector32(?6))",
                params![
                    id.as_str(),
                    collection_id,
                    content,
                    hash.as_str(),
                    metadata_json,
                    vector.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(written > 0)
    }

    /// Return the `k` documents nearest to `query` by cosine distance,
    /// closest first.
    pub async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let (collection_id, dimension) = self.resolve_collection(collection).await?;
        check_dimension(dimension, query.len())?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = vector_literal(query)?;
        let limit = i64::try_from(k).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT content, vector_distance_cos(embedding, vector32(?1)) AS distance
                 FROM documents
                 WHERE collection_id = ?2
                 ORDER BY distance ASC
                 LIMIT ?3",
                params![vector.as_str(), collection_id, limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(ScoredDocument {
                content: row.get::<String>(0).map_err(storage_err)?,
                distance: row.get::<f64>(1).map_err(storage_err)?,
            });
        }
        tracing::debug!(collection, k, hits = results.len(), "similarity search");
        Ok(results)
    }
}

fn row_to_collection_info(row: &libsql::Row) -> Result<CollectionInfo> {
    Ok(CollectionInfo {
        name: row.get::<String>(0).map_err(storage_err)?,
        embedding_model: row.get::<Option<String>>(1).map_err(storage_err)?,
        dimension: row.get::<u32>(2).map_err(storage_err)?,
        document_count: u64::try_from(row.get::<i64>(3).map_err(storage_err)?).unwrap_or(0),
    })
}

fn check_dimension(expected: u32, actual: usize) -> Result<()> {
    if usize::try_from(expected).ok() != Some(actual) {
        return Err(BankChatError::validation(format!(
            "embedding has {actual} dimensions, collection expects {expected}"
        )));
    }
    Ok(())
}

/// Text form accepted by `vector32()`, e.g. `[0.1,0.2,0.3]`.
fn vector_literal(values: &[f32]) -> Result<String> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(BankChatError::validation(
            "embedding contains non-finite values",
        ));
    }
    serde_json::to_string(values).map_err(|e| BankChatError::validation(e.to_string()))
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
