//! Top-k inner-product search over a loaded index.
//!
//! A `Searcher` answers from the LanceDB table when one was persisted and
//! still matches the embedding matrix, and from an exhaustive scan of the
//! matrix otherwise. The table is never given an approximate index, so both
//! paths score with the exact dot product of the normalized query and the
//! stored rows and rank by descending score, ties broken by row order.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use arrow_array::{Array, Int32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use tracing::{debug, info, warn};

use helpdesk_core::error::{Error, Result};
use helpdesk_core::traits::Embedder;
use helpdesk_core::types::SearchHit;

use crate::index::Index;
use crate::matrix::{dot, l2_normalize, Matrix};
use crate::schema::{ROW_ID_COLUMN, VECTOR_COLUMN};
use crate::table::{open_db, open_vectors_table, VECTORS_TABLE};
use crate::writer::{read_artifacts, LANCE_DIR};

/// Persisted LanceDB table that mirrors the embedding matrix.
#[derive(Clone)]
pub struct AcceleratedIndex {
    table: Table,
}

impl fmt::Debug for AcceleratedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratedIndex").field("table", &self.table.name()).finish()
    }
}

#[derive(Debug, Clone)]
pub enum SearchBackend {
    Accelerated(AcceleratedIndex),
    BruteForce,
}

impl SearchBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SearchBackend::Accelerated(_) => "lancedb-flat",
            SearchBackend::BruteForce => "brute-force",
        }
    }

    pub fn is_accelerated(&self) -> bool { matches!(self, SearchBackend::Accelerated(_)) }
}

pub struct Searcher {
    index: Index,
    embedder: Arc<dyn Embedder>,
    backend: SearchBackend,
}

impl fmt::Debug for Searcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Searcher")
            .field("rows", &self.index.len())
            .field("dim", &self.index.dim())
            .field("embedder", &self.embedder.id())
            .field("backend", &self.backend)
            .finish()
    }
}

impl Searcher {
    /// Load a persisted index from `dir`.
    ///
    /// Fails with `IndexNotFound` when the embeddings or metadata are missing
    /// and with `DimensionMismatch` when `embedder` produces vectors of a
    /// different width than the stored rows. A missing or inconsistent
    /// LanceDB table only downgrades the searcher to brute force.
    pub async fn load(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let (index, manifest) = read_artifacts(dir)?;
        if index.dim() != embedder.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), actual: embedder.dim() });
        }
        if let Some(m) = &manifest {
            if m.embedder_id != embedder.id() {
                warn!(stored = %m.embedder_id, current = embedder.id(), "index was built with a different embedder");
            }
        }
        let backend = open_accelerated(dir, &index).await;
        info!(rows = index.len(), dim = index.dim(), backend = backend.name(), dir = %dir.display(), "index loaded");
        Ok(Self { index, embedder, backend })
    }

    /// Searcher over an in-memory index; always brute force.
    pub fn from_index(index: Index, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder, backend: SearchBackend::BruteForce }
    }

    pub fn index(&self) -> &Index { &self.index }
    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }
    pub fn backend(&self) -> &SearchBackend { &self.backend }
    pub fn files(&self) -> Vec<String> { self.index.files() }

    /// Embed `query` and return up to `k` hits, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        validate_k(k)?;
        if self.index.is_empty() { return Ok(Vec::new()); }
        let embedder = Arc::clone(&self.embedder);
        let texts = vec![query.to_string()];
        // Model inference is CPU bound; keep it off the async workers.
        let q = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Operation(format!("query embedding task failed: {}", e)))?
            .map_err(Error::Embedding)?
            .pop()
            .ok_or_else(|| Error::Embedding(anyhow!("embedder returned no vector for the query")))?;
        self.search_vector(&q, k).await
    }

    /// Search with a raw query vector; it is normalized before scoring.
    pub async fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        validate_k(k)?;
        if self.index.is_empty() { return Ok(Vec::new()); }
        let q = self.prepare_query(query)?;
        let k = k.min(self.index.len());
        let ranked = match &self.backend {
            SearchBackend::Accelerated(acc) => match self.accelerated_top_k(acc, &q, k).await {
                Ok(ranked) => ranked,
                Err(e) => {
                    let err = Error::AcceleratedStructureUnavailable(e.to_string());
                    warn!(error = %err, "scanning the matrix for this query");
                    brute_force_top_k(self.index.matrix(), &q, k)
                }
            },
            SearchBackend::BruteForce => brute_force_top_k(self.index.matrix(), &q, k),
        };
        Ok(self.to_hits(ranked))
    }

    /// Exhaustive scan regardless of the configured backend.
    pub fn search_brute_force(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        validate_k(k)?;
        if self.index.is_empty() { return Ok(Vec::new()); }
        let q = self.prepare_query(query)?;
        Ok(self.to_hits(brute_force_top_k(self.index.matrix(), &q, k)))
    }

    fn prepare_query(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.index.dim() {
            return Err(Error::DimensionMismatch { expected: self.index.dim(), actual: query.len() });
        }
        let mut q = query.to_vec();
        l2_normalize(&mut q);
        Ok(q)
    }

    async fn accelerated_top_k(&self, acc: &AcceleratedIndex, query: &[f32], k: usize) -> anyhow::Result<Vec<(usize, f32)>> {
        let mut stream = acc
            .table
            .vector_search(query.to_vec())?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::Dot)
            .bypass_vector_index()
            .limit(k)
            .select(Select::columns(&[ROW_ID_COLUMN]))
            .execute()
            .await?;

        let mut ranked = Vec::with_capacity(k);
        while let Some(batch) = stream.try_next().await? {
            let ids = batch
                .column_by_name(ROW_ID_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
                .ok_or_else(|| anyhow!("result batch has no {} column", ROW_ID_COLUMN))?;
            for i in 0..batch.num_rows() {
                let row = usize::try_from(ids.value(i))?;
                if row >= self.index.len() { bail!("row id {} out of range for {} rows", row, self.index.len()); }
                // Exact score from the matrix, as on the brute-force path.
                ranked.push((row, dot(self.index.matrix().row(row), query)));
            }
        }
        ranked.sort_by(rank_order);
        ranked.truncate(k);
        debug!(returned = ranked.len(), k, "accelerated search");
        Ok(ranked)
    }

    fn to_hits(&self, ranked: Vec<(usize, f32)>) -> Vec<SearchHit> {
        ranked
            .into_iter()
            .filter_map(|(row, score)| self.index.chunk(row).map(|c| (c, score)))
            .enumerate()
            .map(|(i, (c, score))| SearchHit { rank: i + 1, score, source_file: c.source_file.clone(), text: c.text.clone() })
            .collect()
    }
}

fn validate_k(k: usize) -> Result<()> {
    if k < 1 { return Err(Error::InvalidArgument(format!("k must be at least 1, got {}", k))); }
    Ok(())
}

/// Descending score, then ascending row.
pub fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// `(row, score)` for the `k` best rows of `matrix` against `query`.
pub fn brute_force_top_k(matrix: &Matrix, query: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = matrix.iter_rows().enumerate().map(|(i, row)| (i, dot(row, query))).collect();
    let k = k.min(scored.len());
    if k == 0 { return Vec::new(); }
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, rank_order);
        scored.truncate(k);
    }
    scored.sort_by(rank_order);
    scored
}

async fn open_accelerated(dir: &Path, index: &Index) -> SearchBackend {
    let lance_dir = dir.join(LANCE_DIR);
    if !lance_dir.is_dir() {
        info!(dir = %dir.display(), "no accelerated table; using brute force");
        return SearchBackend::BruteForce;
    }
    match try_open_accelerated(&lance_dir, index).await {
        Ok(acc) => SearchBackend::Accelerated(acc),
        Err(e) => {
            let err = Error::AcceleratedStructureUnavailable(e.to_string());
            warn!(error = %err, "using brute force");
            SearchBackend::BruteForce
        }
    }
}

async fn try_open_accelerated(lance_dir: &Path, index: &Index) -> anyhow::Result<AcceleratedIndex> {
    let conn = open_db(lance_dir).await?;
    let table = open_vectors_table(&conn, VECTORS_TABLE).await?;
    let rows = table.count_rows(None).await?;
    if rows != index.len() {
        bail!("table holds {} rows but the index has {}", rows, index.len());
    }
    Ok(AcceleratedIndex { table })
}
