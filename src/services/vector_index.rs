use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::core::config::Settings;
use crate::services::llm::LlmService;

#[derive(Debug, Clone)]
pub(crate) struct IndexedChunk {
    pub(crate) chunk_id: String,
    pub(crate) text: String,
    pub(crate) embedding: Vec<f32>,
}

/// An in-memory similarity index over one grading request's chunks.
#[derive(Debug, Clone)]
pub(crate) struct IndexHandle {
    pub(crate) grading_id: String,
    chunks: Vec<IndexedChunk>,
    created_at: OffsetDateTime,
}

impl IndexHandle {
    pub(crate) fn from_embeddings(
        grading_id: &str,
        chunks: &[String],
        embeddings: Vec<Vec<f32>>,
    ) -> Self {
        let chunks = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| IndexedChunk {
                chunk_id: make_chunk_id(grading_id, index as u64, text),
                text: text.clone(),
                embedding,
            })
            .collect();

        Self {
            grading_id: grading_id.to_string(),
            chunks,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks ranked by cosine similarity to the query embedding, best first.
    pub(crate) fn query(&self, query_embedding: &[f32], k: usize) -> Vec<&IndexedChunk> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(&chunk.embedding, query_embedding), chunk))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(_, chunk)| chunk).collect()
    }

    fn is_expired(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// Embeds every chunk of one submission and assembles the request-scoped
/// index. The handle never touches durable storage; dropping it (or letting
/// the store expire it) discards the index entirely.
pub(crate) async fn build(
    llm: &LlmService,
    grading_id: &str,
    chunks: &[String],
) -> Result<IndexHandle> {
    if chunks.is_empty() {
        return Ok(IndexHandle::from_embeddings(grading_id, &[], Vec::new()));
    }

    let embeddings = llm.embed(chunks).await?;
    Ok(IndexHandle::from_embeddings(grading_id, chunks, embeddings))
}

/// Holds each request's index under its grading id until the TTL elapses,
/// replacing the shared on-disk snapshot the original design overwrote
/// across requests.
pub(crate) struct IndexStore {
    inner: Mutex<StoreInner>,
    ttl: Duration,
    max_entries: usize,
    top_k: usize,
}

struct StoreInner {
    order: VecDeque<String>,
    handles: HashMap<String, IndexHandle>,
}

impl IndexStore {
    pub(crate) fn new(ttl_seconds: u64, max_entries: usize, top_k: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner { order: VecDeque::new(), handles: HashMap::new() }),
            ttl: Duration::seconds(ttl_seconds as i64),
            max_entries: max_entries.max(1),
            top_k: top_k.max(1),
        }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.results().ttl_seconds,
            settings.results().max_entries,
            settings.pipeline().retrieval_top_k,
        )
    }

    pub(crate) fn insert(&self, handle: IndexHandle) {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        sweep(&mut inner, now, self.ttl);

        while inner.order.len() >= self.max_entries {
            if let Some(oldest) = inner.order.pop_front() {
                inner.handles.remove(&oldest);
            }
        }

        inner.order.push_back(handle.grading_id.clone());
        inner.handles.insert(handle.grading_id.clone(), handle);
    }

    pub(crate) fn get(&self, grading_id: &str) -> Option<IndexHandle> {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        sweep(&mut inner, now, self.ttl);
        inner.handles.get(grading_id).cloned()
    }

    /// Ranked chunk texts for a free-text query against one request's index.
    /// Returns `None` when the index expired or never existed. The grading
    /// call itself sends every chunk to the model; this lookup serves
    /// similarity inspection against the same grading id.
    #[allow(dead_code)]
    pub(crate) async fn query(
        &self,
        llm: &LlmService,
        grading_id: &str,
        text: &str,
    ) -> Result<Option<Vec<String>>> {
        let Some(handle) = self.get(grading_id) else {
            return Ok(None);
        };

        let embeddings = llm.embed(&[text.to_string()]).await?;
        let query_embedding = embeddings.into_iter().next().unwrap_or_default();
        let ranked = handle
            .query(&query_embedding, self.top_k)
            .into_iter()
            .map(|chunk| chunk.text.clone())
            .collect();

        Ok(Some(ranked))
    }
}

fn sweep(inner: &mut StoreInner, now: OffsetDateTime, ttl: Duration) {
    while let Some(front) = inner.order.front() {
        let expired = match inner.handles.get(front) {
            Some(handle) => handle.is_expired(now, ttl),
            None => true,
        };
        if !expired {
            break;
        }
        if let Some(front) = inner.order.pop_front() {
            inner.handles.remove(&front);
        }
    }
}

fn make_chunk_id(grading_id: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(grading_id.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(grading_id: &str) -> IndexHandle {
        let chunks = vec![
            "the essay opens with a thesis".to_string(),
            "grammar and style are strong".to_string(),
            "citations are missing".to_string(),
        ];
        let embeddings = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        IndexHandle::from_embeddings(grading_id, &chunks, embeddings)
    }

    #[test]
    fn query_ranks_by_cosine_similarity() {
        let handle = handle("g-1");
        let ranked = handle.query(&[0.1, 0.9, 0.0], 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "grammar and style are strong");
        assert_eq!(ranked[1].text, "the essay opens with a thesis");
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        let first = handle("g-1");
        let second = handle("g-1");
        assert_eq!(first.chunks[0].chunk_id, second.chunks[0].chunk_id);
        assert_ne!(first.chunks[0].chunk_id, first.chunks[1].chunk_id);
    }

    #[test]
    fn cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn store_is_keyed_by_grading_id() {
        let store = IndexStore::new(60, 8, 2);
        store.insert(handle("g-1"));
        store.insert(handle("g-2"));

        assert_eq!(store.get("g-1").map(|h| h.grading_id), Some("g-1".to_string()));
        assert_eq!(store.get("g-2").map(|h| h.grading_id), Some("g-2".to_string()));
        assert!(store.get("g-3").is_none());
    }

    #[test]
    fn store_expires_entries_after_ttl() {
        let store = IndexStore::new(0, 8, 2);
        store.insert(handle("g-1"));
        assert!(store.get("g-1").is_none());
    }

    #[test]
    fn store_capacity_evicts_oldest_index() {
        let store = IndexStore::new(60, 2, 2);
        store.insert(handle("g-1"));
        store.insert(handle("g-2"));
        store.insert(handle("g-3"));

        assert!(store.get("g-1").is_none());
        assert!(store.get("g-2").is_some());
        assert!(store.get("g-3").is_some());
    }
}
