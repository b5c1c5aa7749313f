//! Flat vector index persisted as two files: a dense row-major f32 array
//! (`vectors.bin`) and a JSON sidecar describing each row (`meta.json`).
//! Retrieval is an exact cosine scan over every row.


use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backends::Embedder;
use crate::chunker::chunk_text;
use crate::config::{Config, IndexingConfig};
use crate::corpus::Document;
use crate::{RagError, Result};

const VECTORS_MAGIC: &[u8; 4] = b"RVEC";
const VECTORS_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8 + 4;

/// One indexed chunk, row-aligned with the vector array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub source: String,
    pub start: usize,
    pub end: usize,
    pub chunk_index: usize,
    pub text: String,
}

/// Sidecar stored next to the vector file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub model: String,
    pub dimension: usize,
    pub built_at: chrono::DateTime<chrono::Utc>,
    pub records: Vec<ChunkRecord>,
}

/// Summary returned after a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub num_documents: usize,
    pub num_chunks: usize,
    pub dimension: usize,
    pub model_name: String,
}

/// A retrieval result: the record plus its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: ChunkRecord,
    pub score: f32,
}

struct LoadedIndex {
    vectors: Vec<f32>,
    metadata: IndexMetadata,
}

/// On-disk index plus its in-memory copy once loaded.
pub struct IndexStore {
    vectors_path: PathBuf,
    metadata_path: PathBuf,
    loaded: Option<LoadedIndex>,
    generation: u64,
}

impl IndexStore {
    #[inline]
    pub fn new(config: &Config) -> Self {
        Self {
            vectors_path: config.vectors_path(),
            metadata_path: config.metadata_path(),
            loaded: None,
            generation: 0,
        }
    }

    /// Whether both index files exist on disk.
    #[inline]
    pub fn exists(&self) -> bool {
        self.vectors_path.is_file() && self.metadata_path.is_file()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Number of indexed chunks. `None` means no index is loaded into
    /// memory, distinct from a loaded index of zero chunks; call [`load`]
    /// or [`ensure_loaded`] first.
    ///
    /// [`load`]: IndexStore::load
    /// [`ensure_loaded`]: IndexStore::ensure_loaded
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.loaded.as_ref().map(|index| index.metadata.records.len())
    }

    /// Embedding model the loaded index was built with.
    #[inline]
    pub fn model_name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|index| index.metadata.model.as_str())
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.loaded.as_ref().map(|index| index.metadata.dimension)
    }

    /// Bumped every time the on-disk index is replaced or cleared.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Chunk and embed `documents`, then atomically replace the on-disk
    /// index. The previous index stays intact if any step fails.
    #[inline]
    pub fn build(
        &mut self,
        documents: &[Document],
        embedder: &dyn Embedder,
        indexing: &IndexingConfig,
    ) -> Result<IndexStats> {
        if documents.is_empty() {
            return Err(RagError::InvalidConfig(
                "no documents to index; add files to the data directory first".to_string(),
            ));
        }

        let mut records = Vec::new();
        for document in documents {
            if document.atomic {
                records.push(ChunkRecord {
                    source: document.source.clone(),
                    start: 0,
                    end: document.text.chars().count(),
                    chunk_index: 0,
                    text: document.text.clone(),
                });
                continue;
            }
            let chunks = chunk_text(&document.text, indexing.chunk_size, indexing.overlap)?;
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                records.push(ChunkRecord {
                    source: document.source.clone(),
                    start: chunk.start,
                    end: chunk.end,
                    chunk_index,
                    text: chunk.text,
                });
            }
        }
        debug!("Chunked {} documents into {} records", documents.len(), records.len());

        let texts: Vec<String> = records.iter().map(|record| record.text.clone()).collect();
        let vectors = embedder.embed(&texts)?;
        if vectors.len() != records.len() {
            return Err(RagError::EmbeddingBackend(format!(
                "embedding count mismatch: {} chunks but {} vectors",
                records.len(),
                vectors.len()
            )));
        }
        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(RagError::EmbeddingBackend(
                "embedding backend returned zero-dimensional vectors".to_string(),
            ));
        }
        if let Some(bad) = vectors.iter().find(|vector| vector.len() != dimension) {
            return Err(RagError::EmbeddingBackend(format!(
                "inconsistent embedding dimensions: expected {}, got {}",
                dimension,
                bad.len()
            )));
        }

        let metadata = IndexMetadata {
            model: embedder.model_name().to_string(),
            dimension,
            built_at: chrono::Utc::now(),
            records,
        };
        let mut flat = Vec::with_capacity(metadata.records.len() * dimension);
        for vector in &vectors {
            flat.extend_from_slice(vector);
        }

        self.write_atomically(&flat, &metadata)?;
        self.generation += 1;
        info!(
            "Built index: {} chunks, dimension {}, model {}",
            metadata.records.len(),
            dimension,
            metadata.model
        );

        let stats = IndexStats {
            num_documents: documents.len(),
            num_chunks: metadata.records.len(),
            dimension,
            model_name: metadata.model.clone(),
        };
        self.loaded = Some(LoadedIndex { vectors: flat, metadata });
        Ok(stats)
    }

    fn write_atomically(&self, flat: &[f32], metadata: &IndexMetadata) -> Result<()> {
        if let Some(parent) = self.vectors_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let vectors_tmp = self.vectors_path.with_extension("bin.tmp");
        let metadata_tmp = self.metadata_path.with_extension("json.tmp");

        let rows = metadata.records.len() as u64;
        let mut file = fs::File::create(&vectors_tmp)?;
        file.write_all(VECTORS_MAGIC)?;
        file.write_all(&VECTORS_VERSION.to_le_bytes())?;
        file.write_all(&rows.to_le_bytes())?;
        file.write_all(&(metadata.dimension as u32).to_le_bytes())?;
        for value in flat {
            file.write_all(&value.to_le_bytes())?;
        }
        file.sync_all()?;

        let json = serde_json::to_vec_pretty(metadata).map_err(anyhow::Error::from)?;
        fs::write(&metadata_tmp, json)?;

        fs::rename(&vectors_tmp, &self.vectors_path)?;
        fs::rename(&metadata_tmp, &self.metadata_path)?;
        Ok(())
    }

    /// Load the index from disk. Returns `Ok(false)` when no index exists
    /// yet; corrupt or mismatched files are an [`RagError::IndexCorrupt`].
    #[inline]
    pub fn load(&mut self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }

        let mut file = fs::File::open(&self.vectors_path)?;
        let mut header = [0u8; HEADER_LEN];
        file.read_exact(&mut header).map_err(|_| {
            RagError::IndexCorrupt("vector file is shorter than its header".to_string())
        })?;
        if &header[0..4] != VECTORS_MAGIC {
            return Err(RagError::IndexCorrupt(
                "vector file has wrong magic bytes".to_string(),
            ));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VECTORS_VERSION {
            return Err(RagError::IndexCorrupt(format!(
                "unsupported vector file version {version}"
            )));
        }
        let rows = u64::from_le_bytes([
            header[8], header[9], header[10], header[11], header[12], header[13], header[14],
            header[15],
        ]) as usize;
        let dimension =
            u32::from_le_bytes([header[16], header[17], header[18], header[19]]) as usize;

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;
        let expected_bytes = rows
            .checked_mul(dimension)
            .and_then(|cells| cells.checked_mul(4))
            .ok_or_else(|| {
                RagError::IndexCorrupt(format!(
                    "vector header declares an implausible shape ({rows} rows x {dimension} dims)"
                ))
            })?;
        if payload.len() != expected_bytes {
            return Err(RagError::IndexCorrupt(format!(
                "vector payload is {} bytes, expected {} ({} rows x {} dims)",
                payload.len(),
                expected_bytes,
                rows,
                dimension
            )));
        }
        let mut vectors = Vec::with_capacity(rows * dimension);
        for chunk in payload.chunks_exact(4) {
            vectors.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        let metadata_json = fs::read_to_string(&self.metadata_path)?;
        let metadata: IndexMetadata = serde_json::from_str(&metadata_json)
            .map_err(|e| RagError::IndexCorrupt(format!("metadata is not valid JSON: {e}")))?;

        if metadata.records.len() != rows {
            return Err(RagError::IndexCorrupt(format!(
                "metadata lists {} records but vector file has {} rows",
                metadata.records.len(),
                rows
            )));
        }
        if metadata.dimension != dimension {
            return Err(RagError::IndexCorrupt(format!(
                "metadata dimension {} does not match vector file dimension {}",
                metadata.dimension, dimension
            )));
        }

        debug!("Loaded index: {} chunks, dimension {}", rows, dimension);
        self.loaded = Some(LoadedIndex { vectors, metadata });
        Ok(true)
    }

    /// Load from disk if not already loaded; error when no index exists.
    #[inline]
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        if self.load()? { Ok(()) } else { Err(RagError::EmptyIndex) }
    }

    /// Delete the index files and drop the in-memory copy.
    #[inline]
    pub fn clear(&mut self) -> Result<()> {
        for path in [&self.vectors_path, &self.metadata_path] {
            if path.is_file() {
                fs::remove_file(path)?;
            }
        }
        self.loaded = None;
        self.generation += 1;
        Ok(())
    }

    /// Exact top-K retrieval by cosine similarity. Ties keep row order; the
    /// result is clamped to the index size.
    #[inline]
    pub fn retrieve(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(RagError::InvalidConfig(
                "top_k must be greater than zero".to_string(),
            ));
        }
        let Some(index) = self.loaded.as_ref() else {
            return Err(RagError::EmptyIndex);
        };
        if index.metadata.records.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        if query.len() != index.metadata.dimension {
            return Err(RagError::EmbeddingBackend(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                index.metadata.dimension
            )));
        }

        let dimension = index.metadata.dimension;
        let mut scored: Vec<(usize, f32)> = index
            .vectors
            .chunks_exact(dimension)
            .enumerate()
            .map(|(row, vector)| (row, cosine_similarity(query, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(row, score)| SearchHit {
                record: index.metadata.records[row].clone(),
                score,
            })
            .collect())
    }
}

/// Cosine similarity of two equal-length vectors. Zero vectors score 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}
