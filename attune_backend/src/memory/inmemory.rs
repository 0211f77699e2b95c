use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{rank_by_similarity, MemoryBackend, MemoryRecord, Partition, ScoredRecord};

/// Volatile backend for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryBackend {
    partitions: RwLock<HashMap<Partition, HashMap<i64, MemoryRecord>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryBackend for InMemoryBackend {
    fn upsert(&self, partition: Partition, record: MemoryRecord) -> Result<()> {
        let mut partitions = self
            .partitions
            .write()
            .map_err(|e| anyhow::anyhow!("Memory lock poisoned: {}", e))?;
        for (other, records) in partitions.iter_mut() {
            if *other != partition {
                records.remove(&record.id);
            }
        }
        partitions
            .entry(partition)
            .or_default()
            .insert(record.id, record);
        Ok(())
    }

    fn nearest(&self, partition: Partition, query: &[f32], k: usize) -> Result<Vec<ScoredRecord>> {
        let partitions = self
            .partitions
            .read()
            .map_err(|e| anyhow::anyhow!("Memory lock poisoned: {}", e))?;
        let candidates = partitions
            .get(&partition)
            .map(|records| records.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(rank_by_similarity(candidates, query, k))
    }

    fn count(&self, partition: Partition) -> Result<usize> {
        let partitions = self
            .partitions
            .read()
            .map_err(|e| anyhow::anyhow!("Memory lock poisoned: {}", e))?;
        Ok(partitions.get(&partition).map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MessageRole;
    use crate::emotion::Emotion;
    use crate::memory::MemoryMetadata;

    fn record(id: i64, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord {
            id,
            embedding,
            content: format!("record {id}"),
            metadata: MemoryMetadata {
                role: MessageRole::User,
                emotion: Emotion::Joy,
                emotion_confidence: 0.9,
                conversation_id: 3,
            },
        }
    }

    #[test]
    fn an_id_lives_in_one_partition() {
        let backend = InMemoryBackend::new();
        backend.upsert(Partition::Recent, record(1, vec![1.0, 0.0])).unwrap();
        backend.upsert(Partition::LongTerm, record(1, vec![0.0, 1.0])).unwrap();
        assert_eq!(backend.count(Partition::Recent).unwrap(), 0);
        assert_eq!(backend.count(Partition::LongTerm).unwrap(), 1);

        backend.upsert(Partition::Recent, record(1, vec![0.5, 0.5])).unwrap();
        backend.upsert(Partition::Recent, record(2, vec![0.1, 0.9])).unwrap();
        assert_eq!(backend.count(Partition::Recent).unwrap(), 2);
        assert_eq!(backend.count(Partition::LongTerm).unwrap(), 0);

        let recent = backend.nearest(Partition::Recent, &[0.5, 0.5], 3).unwrap();
        assert_eq!(recent[0].record.embedding, vec![0.5, 0.5]);
    }

    #[test]
    fn nearest_orders_by_similarity() {
        let backend = InMemoryBackend::new();
        backend.upsert(Partition::Recent, record(1, vec![0.0, 1.0])).unwrap();
        backend.upsert(Partition::Recent, record(2, vec![1.0, 0.0])).unwrap();
        backend.upsert(Partition::Recent, record(3, vec![0.7, 0.7])).unwrap();

        let hits = backend.nearest(Partition::Recent, &[1.0, 0.0], 2).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.record.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(backend.nearest(Partition::LongTerm, &[1.0, 0.0], 2).unwrap().is_empty());
    }
}
