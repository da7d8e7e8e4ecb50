use std::collections::BTreeSet;

use anyhow::anyhow;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use helpdesk_core::config::{ChunkingConfig, Settings};
use helpdesk_core::data_processor::DataProcessor;
use helpdesk_core::error::{Error, Result};
use helpdesk_core::traits::Embedder;
use helpdesk_core::types::{Chunk, Document};

use crate::matrix::Matrix;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub chunking: ChunkingConfig,
    /// Chunks per `embed_batch` call; does not affect the result.
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { chunking: ChunkingConfig::default(), batch_size: 32, show_progress: false }
    }
}

impl BuildOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { chunking: settings.chunking, batch_size: settings.embedder.batch_size, show_progress: false }
    }
}

/// Embedding matrix plus the parallel chunk metadata.
///
/// Row `i` of the matrix is the embedding of `chunks[i]`; the two never differ
/// in length. An `Index` is never mutated after construction.
#[derive(Debug, Clone)]
pub struct Index {
    matrix: Matrix,
    chunks: Vec<Chunk>,
    embedder_id: String,
    chunking: ChunkingConfig,
}

impl Index {
    /// Chunk, embed and normalize `documents` in input order.
    pub fn build(documents: &[Document], embedder: &dyn Embedder, options: &BuildOptions) -> Result<Self> {
        if documents.is_empty() { return Err(Error::EmptyCorpus); }
        let chunks = DataProcessor::new(options.chunking).chunk_documents(documents);
        info!(documents = documents.len(), chunks = chunks.len(), embedder = embedder.id(), "building index");

        let pb = if options.show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        let mut rows = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(options.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embs = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
            if embs.len() != texts.len() {
                return Err(Error::Embedding(anyhow!("embedder returned {} vectors for {} texts", embs.len(), texts.len())));
            }
            rows.extend(embs);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");

        let mut matrix = Matrix::from_rows(rows, embedder.dim())?;
        matrix.normalize_rows();
        Ok(Self { matrix, chunks, embedder_id: embedder.id().to_string(), chunking: options.chunking })
    }

    pub fn from_parts(matrix: Matrix, chunks: Vec<Chunk>, embedder_id: String, chunking: ChunkingConfig) -> Result<Self> {
        matrix.validate()?;
        if matrix.rows() != chunks.len() {
            return Err(Error::Operation(format!(
                "index artifacts disagree: {} embedding rows vs {} metadata entries",
                matrix.rows(), chunks.len()
            )));
        }
        Ok(Self { matrix, chunks, embedder_id, chunking })
    }

    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
    pub fn dim(&self) -> usize { self.matrix.dim() }
    pub fn matrix(&self) -> &Matrix { &self.matrix }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }
    pub fn chunk(&self, row: usize) -> Option<&Chunk> { self.chunks.get(row) }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn chunking(&self) -> ChunkingConfig { self.chunking }

    /// Distinct source filenames, sorted.
    pub fn files(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.source_file.clone()).collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// blake3 over every `(file, text)` pair in row order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for c in &self.chunks {
            hasher.update(c.source_file.as_bytes());
            hasher.update(&[0]);
            hasher.update(c.text.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}
