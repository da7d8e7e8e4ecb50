use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chunker::chunk_words;
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Read every `.txt` file directly under `data_dir`, ordered by file name.
    /// Symlinks are followed.
    pub fn load_documents(&self, data_dir: &Path) -> Result<Vec<Document>> {
        if !data_dir.is_dir() {
            return Err(Error::InvalidArgument(format!("{} is not a directory", data_dir.display())));
        }
        let files = self.list_txt_files(data_dir);
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Reading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let text = self.read_file_content(file_path)?;
            let filename = file_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            documents.push(Document { filename, text });
        }
        info!(documents = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    /// Flatten documents into chunks, preserving document order and chunk order.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all_chunks = Vec::new();
        for doc in documents {
            for text in chunk_words(&doc.text, self.chunking_config.size, self.chunking_config.overlap) {
                all_chunks.push(Chunk { source_file: doc.filename.clone(), text });
            }
        }
        all_chunks
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).max_depth(1).follow_links(true).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path(); if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort(); txt_files
    }
}
