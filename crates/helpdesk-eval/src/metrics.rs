//! Ranking-quality metrics over observed ranks.
//!
//! Each entry is the 1-based rank at which the expected file appeared, or
//! `None` when it did not. A rank of zero or below is treated as `None`.
//! Every metric divides by the total number of entries, misses included, and
//! an empty input scores `0.0`.

fn found(rank: Option<i64>) -> Option<i64> {
    rank.filter(|r| *r > 0)
}

fn within(rank: Option<i64>, k: usize) -> Option<i64> {
    let k = i64::try_from(k).unwrap_or(i64::MAX);
    found(rank).filter(|r| *r <= k)
}

fn per_query(total: f64, n: usize) -> f64 {
    total / n.max(1) as f64
}

/// Fraction of queries whose expected file ranked within the top `k`.
pub fn hit_at_k(ranks: &[Option<i64>], k: usize) -> f64 {
    let hits = ranks.iter().filter(|r| within(**r, k).is_some()).count();
    per_query(hits as f64, ranks.len())
}

/// Mean reciprocal rank; misses contribute zero.
pub fn mrr(ranks: &[Option<i64>]) -> f64 {
    let total: f64 = ranks.iter().filter_map(|r| found(*r)).map(|r| 1.0 / r as f64).sum();
    per_query(total, ranks.len())
}

/// Binary-relevance nDCG@k against a fixed ideal of one relevant item at rank 1.
pub fn ndcg_at_k(ranks: &[Option<i64>], k: usize) -> f64 {
    let ideal = 1.0 / 2f64.log2();
    let dcg: f64 = ranks.iter().filter_map(|r| within(*r, k)).map(|r| 1.0 / ((r + 1) as f64).log2()).sum();
    per_query(dcg / ideal, ranks.len())
}
