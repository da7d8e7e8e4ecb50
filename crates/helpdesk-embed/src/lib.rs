//! Embedding backends for the helpdesk index.
//!
//! `MiniLmEmbedder` runs a sentence-transformers MiniLM checkpoint through
//! candle. `HashEmbedder` is a deterministic stand-in for tests and offline
//! development, selected with `embedder.kind = "hash"` or
//! `APP_USE_FAKE_EMBEDDINGS=1`.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use helpdesk_core::config::{expand_path, EmbedderConfig, EmbedderKind};
use helpdesk_core::traits::Embedder;
use tracing::info;

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use model::MiniLmEmbedder;
pub use pool::masked_mean_l2;

pub fn get_default_embedder(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || config.kind == EmbedderKind::Hash {
        info!(dim = config.dim, "using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::new(config.dim)));
    }
    let model_dir = resolve_model_dir(config);
    Ok(Arc::new(MiniLmEmbedder::load(&model_dir, config.max_len)?))
}

fn resolve_model_dir(config: &EmbedderConfig) -> PathBuf {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { return p; } }
    expand_path(&config.model_dir)
}
