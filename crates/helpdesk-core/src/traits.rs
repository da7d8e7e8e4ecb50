/// Text-to-vector collaborator consumed by the index builder and the searcher.
///
/// Implementations must be deterministic for identical input and keep `dim()`
/// stable for the lifetime of the process.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (recorded in the index manifest).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
