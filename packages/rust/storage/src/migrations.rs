//! SQL migration definitions for the BankChat vector database.
//!
//! Migrations are applied in order on read-write open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: collections, documents with FLOAT32 embeddings",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Named document collections
CREATE TABLE IF NOT EXISTS collections (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    embedding_model TEXT,
    dimension       INTEGER NOT NULL,
    created_at      TEXT NOT NULL
);

-- Documents and their embeddings (libSQL vector blobs)
CREATE TABLE IF NOT EXISTS documents (
    id            TEXT PRIMARY KEY,
    collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    content       TEXT NOT NULL,
    content_hash  TEXT NOT NULL,
    metadata_json TEXT,
    embedding     BLOB NOT NULL,
    UNIQUE(collection_id, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
