/// Split `text` into windows of `size` whitespace-separated words.
///
/// Consecutive windows start `max(1, size - overlap)` words apart, so every
/// word lands in at least one window and the loop always advances. The last
/// window may be shorter than `size`.
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }
    chunks
}
