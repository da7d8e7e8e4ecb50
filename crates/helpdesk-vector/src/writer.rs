//! On-disk index layout and atomic replacement.
//!
//! ```text
//! <index_dir>/meta.json        chunk metadata, one entry per matrix row
//! <index_dir>/embeddings.bin   bincode-encoded `Matrix`
//! <index_dir>/manifest.json    shape, embedder id, chunking, corpus fingerprint
//! <index_dir>/lance/           optional LanceDB table for accelerated search
//! ```
//!
//! Artifacts are written into a sibling staging directory that is renamed
//! over `<index_dir>` only once everything required is on disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use helpdesk_core::config::{ChunkingConfig, Settings};
use helpdesk_core::error::{Error, Result};
use helpdesk_core::types::Chunk;

use crate::index::Index;
use crate::matrix::Matrix;
use crate::table::{open_db, write_vectors_table, VECTORS_TABLE};

pub const META_FILE: &str = "meta.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const LANCE_DIR: &str = "lance";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub rows: usize,
    pub dim: usize,
    pub embedder_id: String,
    pub chunking: ChunkingConfig,
    pub corpus_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PersistOptions {
    pub accelerated: bool,
}

impl PersistOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { accelerated: settings.index.accelerated }
    }
}

#[derive(Debug, Clone)]
pub struct PersistReport {
    pub location: PathBuf,
    pub rows: usize,
    pub dim: usize,
    /// The LanceDB table was written and can serve searches.
    pub accelerated: bool,
}

/// Writes the accelerated table for a matrix into `lance_dir`.
#[async_trait]
pub trait TableWriter: Send + Sync {
    async fn write(&self, lance_dir: &Path, matrix: &Matrix) -> anyhow::Result<()>;
}

/// Flat LanceDB table, one `(row_id, vector)` record per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanceTableWriter;

#[async_trait]
impl TableWriter for LanceTableWriter {
    async fn write(&self, lance_dir: &Path, matrix: &Matrix) -> anyhow::Result<()> {
        fs::create_dir_all(lance_dir)?;
        let conn = open_db(lance_dir).await?;
        write_vectors_table(&conn, VECTORS_TABLE, matrix).await?;
        Ok(())
    }
}

pub async fn persist(index: &Index, dir: &Path, options: &PersistOptions) -> Result<PersistReport> {
    persist_with(index, dir, options, &LanceTableWriter).await
}

/// `persist` with a caller-supplied table writer.
pub async fn persist_with(index: &Index, dir: &Path, options: &PersistOptions, writer: &dyn TableWriter) -> Result<PersistReport> {
    let staging = sibling(dir, "staging")?;
    if staging.exists() { fs::remove_dir_all(&staging)?; }
    fs::create_dir_all(&staging)?;

    let accelerated = match write_artifacts(index, &staging, options, writer).await {
        Ok(accelerated) => accelerated,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };
    if let Err(e) = swap_into_place(&staging, dir) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }
    info!(rows = index.len(), dim = index.dim(), accelerated, dir = %dir.display(), "index persisted");
    Ok(PersistReport { location: dir.to_path_buf(), rows: index.len(), dim: index.dim(), accelerated })
}

async fn write_artifacts(index: &Index, dir: &Path, options: &PersistOptions, writer: &dyn TableWriter) -> Result<bool> {
    let mut meta = BufWriter::new(fs::File::create(dir.join(META_FILE))?);
    serde_json::to_writer(&mut meta, index.chunks())?;
    meta.flush()?;

    let mut emb = BufWriter::new(fs::File::create(dir.join(EMBEDDINGS_FILE))?);
    bincode::serialize_into(&mut emb, index.matrix()).map_err(|e| Error::Serialization(e.to_string()))?;
    emb.flush()?;

    let manifest = Manifest {
        rows: index.len(),
        dim: index.dim(),
        embedder_id: index.embedder_id().to_string(),
        chunking: index.chunking(),
        corpus_fingerprint: index.fingerprint(),
        created_at: Utc::now(),
    };
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

    if !options.accelerated { return Ok(false); }
    let lance_dir = dir.join(LANCE_DIR);
    match writer.write(&lance_dir, index.matrix()).await {
        Ok(()) => Ok(true),
        Err(e) => {
            let err = Error::AcceleratedStructureUnavailable(e.to_string());
            warn!(error = %err, "saved embeddings only; searches will use brute force");
            let _ = fs::remove_dir_all(&lance_dir);
            Ok(false)
        }
    }
}

/// Read `meta.json`, `embeddings.bin` and (if present) `manifest.json`.
pub fn read_artifacts(dir: &Path) -> Result<(Index, Option<Manifest>)> {
    let meta_path = dir.join(META_FILE);
    let emb_path = dir.join(EMBEDDINGS_FILE);
    if !meta_path.is_file() || !emb_path.is_file() {
        return Err(Error::IndexNotFound { path: dir.to_path_buf() });
    }
    let chunks: Vec<Chunk> = serde_json::from_reader(BufReader::new(fs::File::open(&meta_path)?))?;
    let matrix: Matrix = bincode::deserialize_from(BufReader::new(fs::File::open(&emb_path)?))
        .map_err(|e| Error::Serialization(format!("{}: {}", emb_path.display(), e)))?;
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest: Option<Manifest> = if manifest_path.is_file() {
        Some(serde_json::from_slice(&fs::read(&manifest_path)?)?)
    } else {
        None
    };
    let (embedder_id, chunking) = manifest
        .as_ref()
        .map(|m| (m.embedder_id.clone(), m.chunking))
        .unwrap_or_else(|| (String::new(), ChunkingConfig::default()));
    let index = Index::from_parts(matrix, chunks, embedder_id, chunking)?;
    Ok((index, manifest))
}

fn sibling(dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| Error::InvalidArgument(format!("index location {} has no directory name", dir.display())))?
        .to_string_lossy()
        .to_string();
    let parent = dir.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(parent.join(format!(".{}.{}", name, tag)))
}

fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent() {
        if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
    }
    if dir.exists() {
        let old = sibling(dir, "old")?;
        if old.exists() { fs::remove_dir_all(&old)?; }
        fs::rename(dir, &old)?;
        if let Err(e) = fs::rename(staging, dir) {
            // Put the previous index back before reporting.
            if let Err(restore) = fs::rename(&old, dir) {
                warn!(error = %restore, path = %old.display(), "could not restore previous index");
            }
            return Err(e.into());
        }
        if let Err(e) = fs::remove_dir_all(&old) {
            warn!(error = %e, path = %old.display(), "could not remove previous index");
        }
    } else {
        fs::rename(staging, dir)?;
    }
    Ok(())
}
