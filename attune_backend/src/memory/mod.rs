//! Two-tier similarity memory.
//!
//! Every stored message lives in exactly one partition: `recent` for ordinary
//! turns, `long_term` for messages flagged as long-term when saved. Queries
//! fetch up to `k / 2` neighbours from each partition and concatenate them,
//! recent first. Scores from different partitions are never compared.

pub mod inmemory;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::database::MessageRole;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::emotion::Emotion;

pub use inmemory::InMemoryBackend;

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Recent,
    LongTerm,
}

impl Partition {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Partition::Recent => "recent",
            Partition::LongTerm => "long_term",
        }
    }

    pub fn for_message(is_long_term: bool) -> Self {
        if is_long_term {
            Partition::LongTerm
        } else {
            Partition::Recent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub role: MessageRole,
    pub emotion: Emotion,
    pub emotion_confidence: f64,
    pub conversation_id: i64,
}

/// One stored message. `id` is always the id of the message row it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub embedding: Vec<f32>,
    pub content: String,
    pub metadata: MemoryMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub content: String,
    pub metadata: MemoryMetadata,
}

/// A record plus its similarity to the query, as returned by a backend.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub score: f32,
}

/// Storage/indexing contract for the memory store. An id lives in exactly one
/// partition: a repeated id overwrites, and moves the record when the
/// partition differs.
pub trait MemoryBackend: Send + Sync {
    fn upsert(&self, partition: Partition, record: MemoryRecord) -> Result<()>;

    /// Up to `k` records of `partition`, most similar first. Records whose
    /// dimension differs from `query` are skipped.
    fn nearest(&self, partition: Partition, query: &[f32], k: usize) -> Result<Vec<ScoredRecord>>;

    fn count(&self, partition: Partition) -> Result<usize>;
}

/// Rank candidates by cosine similarity and keep the top `k`.
pub(crate) fn rank_by_similarity(
    candidates: impl IntoIterator<Item = MemoryRecord>,
    query: &[f32],
    k: usize,
) -> Vec<ScoredRecord> {
    let mut scored: Vec<ScoredRecord> = candidates
        .into_iter()
        .filter(|record| record.embedding.len() == query.len())
        .map(|record| {
            let score = cosine_similarity(&record.embedding, query);
            ScoredRecord { record, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

/// SQLite backend. Embeddings are stored as little-endian f32 BLOBs and
/// searched by brute-force cosine similarity.
pub struct SqliteMemoryBackend {
    conn: Mutex<Connection>,
}

impl SqliteMemoryBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open memory database")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS memory_records (
                id INTEGER PRIMARY KEY,
                partition TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                embedding BLOB NOT NULL,
                stored_at TEXT NOT NULL
            )"#,
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory database lock poisoned: {}", e))
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

impl MemoryBackend for SqliteMemoryBackend {
    fn upsert(&self, partition: Partition, record: MemoryRecord) -> Result<()> {
        let metadata_json =
            serde_json::to_string(&record.metadata).context("Failed to serialize metadata")?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO memory_records (id, partition, content, metadata_json, embedding, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                partition.as_db_str(),
                record.content,
                metadata_json,
                encode_embedding(&record.embedding),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn nearest(&self, partition: Partition, query: &[f32], k: usize) -> Result<Vec<ScoredRecord>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, metadata_json, embedding FROM memory_records WHERE partition = ?1",
        )?;

        let rows = stmt
            .query_map([partition.as_db_str()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, content, metadata_json, blob) in rows {
            let Some(embedding) = decode_embedding(&blob) else {
                tracing::warn!("Skipping memory record {} with corrupt embedding", id);
                continue;
            };
            let metadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Corrupt metadata on memory record {}", id))?;
            records.push(MemoryRecord {
                id,
                embedding,
                content,
                metadata,
            });
        }

        Ok(rank_by_similarity(records, query, k))
    }

    fn count(&self, partition: Partition) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memory_records WHERE partition = ?1",
            [partition.as_db_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Embeds text through the configured provider and routes records to the
/// right partition of the backend.
pub struct MemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Box<dyn MemoryBackend>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, backend: Box<dyn MemoryBackend>) -> Self {
        Self { embedder, backend }
    }

    pub async fn store(
        &self,
        id: i64,
        text: &str,
        metadata: MemoryMetadata,
        partition: Partition,
    ) -> Result<()> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .with_context(|| format!("Failed to embed message {}", id))?;
        self.store_embedding(id, embedding, text, metadata, partition)
    }

    /// Embed without storing, for callers that must know the vector exists
    /// before writing anything else.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await.context("Failed to embed text")
    }

    pub fn store_embedding(
        &self,
        id: i64,
        embedding: Vec<f32>,
        text: &str,
        metadata: MemoryMetadata,
        partition: Partition,
    ) -> Result<()> {
        self.backend.upsert(
            partition,
            MemoryRecord {
                id,
                embedding,
                content: text.to_string(),
                metadata,
            },
        )
    }

    /// Up to `k / 2` hits from recent memory followed by up to `k / 2` from
    /// long-term memory. The two lists are concatenated as-is.
    pub async fn query(&self, text: &str, k: usize, include_long_term: bool) -> Result<Vec<MemoryHit>> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .context("Failed to embed memory query")?;
        let per_partition = k / 2;

        let mut hits = self
            .backend
            .nearest(Partition::Recent, &embedding, per_partition)?;
        if include_long_term {
            hits.extend(
                self.backend
                    .nearest(Partition::LongTerm, &embedding, per_partition)?,
            );
        }

        tracing::debug!("Memory query returned {} hits (k={})", hits.len(), k);
        Ok(hits
            .into_iter()
            .map(|scored| MemoryHit {
                content: scored.record.content,
                metadata: scored.record.metadata,
            })
            .collect())
    }

    pub fn len(&self, partition: Partition) -> Result<usize> {
        self.backend.count(partition)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len(Partition::Recent)? == 0 && self.len(Partition::LongTerm)? == 0)
    }
}
