//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (nested keys separated by `__`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Same layering as [`Config::load`], with config files looked up under `base`.
    pub fn load_from(base: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub chunking: ChunkingConfig,
    pub search: SearchConfig,
    pub embedder: EmbedderConfig,
    pub index: IndexConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.chunking.size == 0 {
            return Err(Error::InvalidConfig("chunking.size must be at least 1".into()));
        }
        if self.search.default_k == 0 {
            return Err(Error::InvalidConfig("search.default_k must be at least 1".into()));
        }
        if self.search.max_k < self.search.default_k {
            return Err(Error::InvalidConfig(format!(
                "search.max_k ({}) is below search.default_k ({})",
                self.search.max_k, self.search.default_k
            )));
        }
        if self.embedder.dim == 0 {
            return Err(Error::InvalidConfig("embedder.dim must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: String,
    pub index_dir: String,
    pub feedback_path: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: "data/raw".to_string(),
            index_dir: "data/index".to_string(),
            feedback_path: "data/eval/feedback.jsonl".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn raw_dir(&self) -> PathBuf { expand_path(&self.raw_dir) }
    pub fn index_dir(&self) -> PathBuf { expand_path(&self.index_dir) }
    pub fn feedback_path(&self) -> PathBuf { expand_path(&self.feedback_path) }
}

/// Word-window chunking parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: 500, overlap: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_k: usize,
    pub max_k: usize,
    pub feedback_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_k: 3, max_k: 50, feedback_k: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    MiniLm,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    pub model_dir: String,
    pub dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::MiniLm,
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            dim: 384,
            max_len: 256,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Persist the LanceDB table used for accelerated search.
    pub accelerated: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { accelerated: true }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
