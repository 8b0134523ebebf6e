//! Durable vector store on an embedded SQLite database.
//!
//! Embeddings are stored as little-endian `f32` blobs and scanned in insertion
//! order on every search, which keeps ranking identical to the in-memory store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use ragdemo_common::{Embedding, Metadata, RagError, Result, TextSegment};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::task;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::store::{VectorStore, check_batch, check_dimension, rank};
use crate::types::{CreateOption, EmbeddingMatch, SearchRequest, StoreConfig};

pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    table: Arc<str>,
    dimension: usize,
}

fn store_err(e: rusqlite::Error) -> RagError {
    RagError::Store(e.to_string())
}

fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(RagError::Config(format!("Invalid table name: '{table}'")));
    }
    Ok(())
}

fn encode_vector(embedding: &Embedding) -> Vec<u8> {
    embedding
        .vector()
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

fn decode_vector(bytes: &[u8], dimension: usize) -> Result<Embedding> {
    if bytes.len() % 4 != 0 {
        return Err(RagError::Store(format!(
            "Corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    let vector: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if vector.len() != dimension {
        return Err(RagError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(Embedding::new(vector))
}

fn create_table(conn: &Connection, table: &str, if_not_exists: bool) -> rusqlite::Result<()> {
    let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
    conn.execute(
        &format!(
            "CREATE TABLE {guard}{table} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{{}}',
                embedding BLOB NOT NULL
            )"
        ),
        [],
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl SqliteVectorStore {
    /// Opens (or creates) the database at `config.db_path`.
    pub fn open(config: &StoreConfig, dimension: usize) -> Result<Self> {
        Self::open_at(&config.db_path, &config.table, config.create_option, dimension)
    }

    pub fn open_at(
        db_path: &Path,
        table: &str,
        create_option: CreateOption,
        dimension: usize,
    ) -> Result<Self> {
        validate_table_name(table)?;
        if dimension == 0 {
            return Err(RagError::Config("embedding dimension must be positive".into()));
        }

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            db_path = %db_path.display(),
            table = %table,
            create_option = ?create_option,
            "Opening SQLite vector store"
        );

        let conn = Connection::open(db_path).map_err(store_err)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )
        .map_err(store_err)?;

        match create_option {
            CreateOption::None => {
                if !table_exists(&conn, table).map_err(store_err)? {
                    return Err(RagError::Store(format!("Table '{table}' does not exist")));
                }
            }
            CreateOption::CreateIfNotExists => {
                create_table(&conn, table, true).map_err(store_err)?;
            }
            CreateOption::CreateOrReplace => {
                conn.execute(&format!("DROP TABLE IF EXISTS {table}"), [])
                    .map_err(store_err)?;
                create_table(&conn, table, false).map_err(store_err)?;
            }
        }

        // A reopened table must hold vectors of the configured size
        let sample: Option<Vec<u8>> = conn
            .query_row(
                &format!("SELECT embedding FROM {table} ORDER BY seq LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        if let Some(bytes) = sample {
            decode_vector(&bytes, dimension)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: Arc::from(table),
            dimension,
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        let table = self.table.clone();
        task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn, &table)
        })
        .await
        .map_err(|e| RagError::Store(format!("Blocking task failed: {e}")))?
    }
}

fn insert(
    conn: &Connection,
    table: &str,
    embedding: &Embedding,
    segment: &TextSegment,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let metadata = serde_json::to_string(segment.metadata())?;
    conn.execute(
        &format!("INSERT INTO {table} (id, text, metadata, embedding) VALUES (?1, ?2, ?3, ?4)"),
        params![id, segment.text(), metadata, encode_vector(embedding)],
    )
    .map_err(store_err)?;
    Ok(id)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, embedding, segment))]
    async fn add(&self, embedding: Embedding, segment: TextSegment) -> Result<String> {
        check_dimension(self.dimension, &embedding)?;
        let id = self
            .with_conn(move |conn, table| insert(conn, table, &embedding, &segment))
            .await?;
        debug!(id = %id, "Added record");
        Ok(id)
    }

    #[instrument(skip(self, embeddings, segments), fields(count = embeddings.len()))]
    async fn add_all(
        &self,
        embeddings: Vec<Embedding>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<String>> {
        check_batch(&embeddings, &segments)?;
        for embedding in &embeddings {
            check_dimension(self.dimension, embedding)?;
        }

        self.with_conn(move |conn, table| {
            let tx = conn.transaction().map_err(store_err)?;
            let mut ids = Vec::with_capacity(embeddings.len());
            for (embedding, segment) in embeddings.iter().zip(segments.iter()) {
                ids.push(insert(&tx, table, embedding, segment)?);
            }
            tx.commit().map_err(store_err)?;
            Ok(ids)
        })
        .await
    }

    #[instrument(skip(self, request), fields(max_results = request.max_results))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<EmbeddingMatch>> {
        check_dimension(self.dimension, &request.query)?;
        let dimension = self.dimension;

        let rows = self
            .with_conn(move |conn, table| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT id, text, metadata, embedding FROM {table} ORDER BY seq"
                    ))
                    .map_err(store_err)?;
                let raw = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                        ))
                    })
                    .map_err(store_err)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(store_err)?;

                raw.into_iter()
                    .map(|(id, text, metadata, blob)| {
                        let metadata: Metadata = serde_json::from_str(&metadata)?;
                        let embedding = decode_vector(&blob, dimension)?;
                        Ok((id, embedding, TextSegment::with_metadata(text, metadata)))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .await?;

        let candidates = rows.len();
        let matches = rank(request, rows);
        debug!(candidates, matches = matches.len(), "Searched store");
        Ok(matches)
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> Result<u64> {
        let removed = self
            .with_conn(|conn, table| {
                let tx = conn.transaction().map_err(store_err)?;
                let removed = tx
                    .execute(&format!("DELETE FROM {table}"), [])
                    .map_err(store_err)?;
                tx.commit().map_err(store_err)?;
                Ok(removed as u64)
            })
            .await?;
        info!(removed, "Deleted all embeddings");
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        self.with_conn(|conn, table| {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .map_err(store_err)?;
            Ok(count as u64)
        })
        .await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
