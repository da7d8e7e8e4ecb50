use std::path::Path;
use std::sync::Arc;

use helpdesk_core::config::{ChunkingConfig, EmbedderKind, Settings};
use helpdesk_core::error::Error;
use helpdesk_embed::HashEmbedder;
use helpdesk_service::{ingest, Helpdesk, MAX_ANSWER_CHARS};

fn settings_in(root: &Path, accelerated: bool) -> Settings {
    let mut s = Settings::default();
    s.paths.raw_dir = root.join("raw").to_string_lossy().into_owned();
    s.paths.index_dir = root.join("index").to_string_lossy().into_owned();
    s.paths.feedback_path = root.join("eval/feedback.jsonl").to_string_lossy().into_owned();
    s.chunking = ChunkingConfig { size: 8, overlap: 2 };
    s.embedder.kind = EmbedderKind::Hash;
    s.embedder.dim = 256;
    s.index.accelerated = accelerated;
    s
}

fn write_corpus(root: &Path) {
    let raw = root.join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(raw.join("cats.txt"), "cats purr when they are happy and cats sleep all day long in the sun").unwrap();
    std::fs::write(raw.join("dogs.txt"), "dogs bark at the mailman and dogs love to fetch sticks in the park").unwrap();
    std::fs::write(raw.join("fish.txt"), "goldfish swim in small bowls and need clean water every week").unwrap();
    std::fs::write(raw.join("notes.md"), "ignored because it is not a text file").unwrap();
}

async fn open_helpdesk(root: &Path, accelerated: bool) -> Helpdesk {
    write_corpus(root);
    let settings = settings_in(root, accelerated);
    let embedder = Arc::new(HashEmbedder::new(256));
    ingest(&settings, embedder.clone(), false).await.unwrap();
    Helpdesk::open(settings, embedder).await.unwrap()
}

#[tokio::test]
async fn opening_before_ingest_reports_missing_index() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Helpdesk::open(settings_in(tmp.path(), false), Arc::new(HashEmbedder::new(256))).await.err().expect("no index yet");
    assert!(matches!(err, Error::IndexNotFound { .. }));
}

#[tokio::test]
async fn ingest_reports_counts_and_lists_text_files() {
    let tmp = tempfile::tempdir().unwrap();
    write_corpus(tmp.path());
    let settings = settings_in(tmp.path(), true);
    let report = ingest(&settings, Arc::new(HashEmbedder::new(256)), false).await.unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.chunks, report.persisted.rows);
    assert!(report.persisted.location.join("manifest.json").is_file());

    let helpdesk = Helpdesk::open(settings, Arc::new(HashEmbedder::new(256))).await.unwrap();
    assert_eq!(helpdesk.files(), vec!["cats.txt", "dogs.txt", "fish.txt"]);
    assert!(helpdesk.searcher().backend().is_accelerated());
}

#[tokio::test]
async fn ask_returns_contexts_and_joined_answer() {
    let tmp = tempfile::tempdir().unwrap();
    let helpdesk = open_helpdesk(tmp.path(), false).await;
    let answer = helpdesk.ask("do dogs fetch sticks", 2).await.unwrap();
    assert_eq!(answer.contexts.len(), 2);
    assert_eq!(answer.contexts[0].source_file, "dogs.txt");
    assert_eq!(answer.answer, format!("{} {}", answer.contexts[0].text, answer.contexts[1].text));

    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["contexts"][0]["file"], "dogs.txt");
    assert_eq!(json["contexts"][0]["rank"], 1);
}

#[tokio::test]
async fn ask_validates_k_against_configured_bounds() {
    let tmp = tempfile::tempdir().unwrap();
    let helpdesk = open_helpdesk(tmp.path(), false).await;
    let max_k = helpdesk.settings().search.max_k;
    assert!(matches!(helpdesk.ask("cats", 0).await.unwrap_err(), Error::InvalidArgument(_)));
    assert!(matches!(helpdesk.ask("cats", max_k + 1).await.unwrap_err(), Error::InvalidArgument(_)));
    assert!(helpdesk.ask("cats", max_k).await.is_ok());
}

#[tokio::test]
async fn long_answers_are_truncated() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(raw.join("long.txt"), "printer ".repeat(2000)).unwrap();
    let mut settings = settings_in(tmp.path(), false);
    settings.chunking = ChunkingConfig { size: 500, overlap: 50 };
    let embedder = Arc::new(HashEmbedder::new(256));
    ingest(&settings, embedder.clone(), false).await.unwrap();
    let helpdesk = Helpdesk::open(settings, embedder).await.unwrap();

    let answer = helpdesk.ask("printer", 3).await.unwrap();
    assert_eq!(answer.answer.chars().count(), MAX_ANSWER_CHARS);
}

#[tokio::test]
async fn feedback_feeds_metrics() {
    let tmp = tempfile::tempdir().unwrap();
    let helpdesk = open_helpdesk(tmp.path(), false).await;
    assert!(matches!(helpdesk.metrics(5).unwrap_err(), Error::NoFeedback { .. }));

    let found = helpdesk.feedback("why do cats purr", "cats.txt", 5, true).await.unwrap();
    assert_eq!(found.rank, Some(1));
    assert!(found.hit_at_k);
    assert!(found.saved);

    let missed = helpdesk.feedback("why do cats purr", "missing.txt", 5, true).await.unwrap();
    assert_eq!(missed.rank, None);
    assert!(!missed.hit_at_k);

    let dry = helpdesk.feedback("dogs", "dogs.txt", 5, false).await.unwrap();
    assert!(!dry.saved);

    let report = helpdesk.metrics(5).unwrap();
    assert_eq!(report.count, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.hit_at_k, 0.5);
    assert_eq!(report.mrr, 0.5);
    assert_eq!(report.ndcg_at_k, 0.5);
}

#[tokio::test]
async fn reindex_swaps_in_new_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let helpdesk = open_helpdesk(tmp.path(), false).await;
    let before = helpdesk.searcher();

    std::fs::write(tmp.path().join("raw/birds.txt"), "parrots talk and sing in the morning").unwrap();
    let report = helpdesk.reindex().await.unwrap();
    assert_eq!(report.documents, 4);
    assert_eq!(helpdesk.files(), vec!["birds.txt", "cats.txt", "dogs.txt", "fish.txt"]);
    assert_eq!(before.files().len(), 3);

    let hits = helpdesk.ask("parrots sing", 1).await.unwrap();
    assert_eq!(hits.contexts[0].source_file, "birds.txt");
}

#[tokio::test]
async fn failed_reindex_keeps_serving_the_old_index() {
    let tmp = tempfile::tempdir().unwrap();
    let helpdesk = open_helpdesk(tmp.path(), false).await;
    for name in ["cats.txt", "dogs.txt", "fish.txt"] {
        std::fs::remove_file(tmp.path().join("raw").join(name)).unwrap();
    }
    assert!(matches!(helpdesk.reindex().await.unwrap_err(), Error::EmptyCorpus));
    assert_eq!(helpdesk.files().len(), 3);
    assert!(tmp.path().join("index/embeddings.bin").is_file());
}

#[test]
fn metrics_read_the_log_without_an_index() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("feedback.jsonl");
    std::fs::write(&path, "{\"rank\": 1}\n{\"rank\": 2}\n{\"rank\": null}\n").unwrap();
    let report = helpdesk_service::metrics_report(&path, 1).unwrap();
    assert_eq!((report.count, report.hit_at_k, report.mrr), (3, 0.333, 0.5));
    assert!(matches!(helpdesk_service::metrics_report(&path, 0).unwrap_err(), Error::InvalidArgument(_)));
}
