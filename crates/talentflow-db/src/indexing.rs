//! Job posting indexing: chunk, embed, and store section text.
//!
//! Runs at the seeding boundary. The evaluation pipeline only reads the
//! chunk rows this writes.

use std::sync::Arc;
use std::time::Instant;

use pgvector::Vector;
use tracing::info;
use uuid::Uuid;

use talentflow_core::{ChunkRepository, EmbeddingBackend, JobPosting, NewChunk, Result};

use crate::chunking::{Chunker, ChunkerConfig, SentenceChunker};

/// Chunks and embeds job postings into the vector index.
pub struct JobPostingIndexer {
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    chunker: SentenceChunker,
}

impl JobPostingIndexer {
    /// Create a new indexer with the default chunker configuration.
    pub fn new(chunks: Arc<dyn ChunkRepository>, embedder: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            chunks,
            embedder,
            chunker: SentenceChunker::new(ChunkerConfig::default()),
        }
    }

    /// Chunk and embed one posting, replacing any previous chunk set.
    /// Returns the number of chunks stored.
    pub async fn index_posting(&self, posting: &JobPosting) -> Result<u64> {
        let start = Instant::now();

        // The title is indexed as its own section alongside the body
        // sections, since it carries the highest-signal role text.
        let mut sections: Vec<(&str, &str)> = vec![("title", posting.title.as_str())];
        sections.extend(posting.sections());

        let mut pending: Vec<(String, i32, String)> = Vec::new();
        for (tag, text) in sections {
            for chunk in self.chunker.chunk(text) {
                pending.push((tag.to_string(), chunk.index as i32, chunk.text));
            }
        }

        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|(_, _, text)| text.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;

        let new_chunks: Vec<NewChunk> = pending
            .into_iter()
            .zip(vectors)
            .map(|((section, chunk_index, content), vector)| NewChunk {
                section,
                chunk_index,
                content,
                embedding: Vector::from(vector),
            })
            .collect();

        let stored = self
            .chunks
            .store_for_posting(posting.id, new_chunks)
            .await?;

        info!(
            subsystem = "db",
            component = "indexing",
            op = "index_posting",
            job_posting_id = %posting.id,
            chunk_count = stored,
            duration_ms = start.elapsed().as_millis() as u64,
            "Indexed job posting"
        );

        Ok(stored)
    }

    /// Index a batch of postings. Returns (posting id, chunk count) pairs.
    pub async fn index_all(&self, postings: &[JobPosting]) -> Result<Vec<(Uuid, u64)>> {
        let mut results = Vec::with_capacity(postings.len());
        for posting in postings {
            let count = self.index_posting(posting).await?;
            results.push((posting.id, count));
        }
        Ok(results)
    }
}
