use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackScan;
use crate::metrics::{hit_at_k, mrr, ndcg_at_k};

/// Aggregate quality over the feedback log; rates rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub count: usize,
    pub skipped: usize,
    pub k: usize,
    pub hit_at_k: f64,
    pub mrr: f64,
    pub ndcg_at_k: f64,
}

impl MetricsReport {
    pub fn from_scan(scan: &FeedbackScan, k: usize) -> Self {
        Self {
            count: scan.ranks.len(),
            skipped: scan.skipped,
            k,
            hit_at_k: round3(hit_at_k(&scan.ranks, k)),
            mrr: round3(mrr(&scan.ranks)),
            ndcg_at_k: round3(ndcg_at_k(&scan.ranks, k)),
        }
    }
}

pub fn round3(x: f64) -> f64 { (x * 1000.0).round() / 1000.0 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_rounds_each_rate() {
        let scan = FeedbackScan { ranks: vec![Some(1), Some(2), None], skipped: 1 };
        let r = MetricsReport::from_scan(&scan, 1);
        assert_eq!((r.count, r.skipped, r.k), (3, 1, 1));
        assert_eq!(r.hit_at_k, 0.333);
        assert_eq!(r.mrr, 0.5);
        assert_eq!(r.ndcg_at_k, 0.333);
    }
}
