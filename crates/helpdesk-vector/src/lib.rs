pub mod handle;
pub mod index;
pub mod matrix;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use handle::SearcherHandle;
pub use index::{BuildOptions, Index};
pub use search::{SearchBackend, Searcher};
pub use writer::{persist, persist_with, read_artifacts, LanceTableWriter, Manifest, PersistOptions, PersistReport, TableWriter};
