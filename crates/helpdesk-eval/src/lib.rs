//! Retrieval-quality evaluation: the feedback log and the metrics computed from it.

pub mod feedback;
pub mod metrics;
pub mod report;

pub use feedback::{observed_rank, stamped_record, FeedbackScan, FeedbackStore};
pub use metrics::{hit_at_k, mrr, ndcg_at_k};
pub use report::MetricsReport;
