use std::fs;
use std::io::Write;
use tempfile::TempDir;

use helpdesk_core::config::{ChunkingConfig, Config, EmbedderKind};
use helpdesk_core::data_processor::DataProcessor;
use helpdesk_core::types::{Document, FeedbackRecord};
use helpdesk_core::Error;

#[test]
fn load_documents_reads_txt_files_in_name_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("notes.md"), "ignored").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/c.txt"), "not at top level").unwrap();

    let processor = DataProcessor::default();
    let docs = processor.load_documents(dir).expect("load");

    assert_eq!(docs, vec![Document::new("a.txt", "alpha"), Document::new("b.txt", "bravo")]);
}

#[test]
fn load_documents_decodes_invalid_utf8_lossily() {
    let tmp = TempDir::new().unwrap();
    let mut f = fs::File::create(tmp.path().join("bin.txt")).unwrap();
    f.write_all(&[b'o', b'k', b' ', 0xff, 0xfe]).unwrap();

    let docs = DataProcessor::default().load_documents(tmp.path()).expect("load");
    assert_eq!(docs.len(), 1);
    assert!(docs[0].text.starts_with("ok "));
}

#[cfg(unix)]
#[test]
fn load_documents_follows_symlinked_files() {
    let tmp = TempDir::new().unwrap();
    let outside = tmp.path().join("shared");
    fs::create_dir(&outside).unwrap();
    fs::write(outside.join("faq.txt"), "reset the router").unwrap();
    fs::create_dir(outside.join("more")).unwrap();

    let dir = tmp.path().join("raw");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    std::os::unix::fs::symlink(outside.join("faq.txt"), dir.join("linked.txt")).unwrap();
    std::os::unix::fs::symlink(outside.join("more"), dir.join("dir.txt")).unwrap();

    let docs = DataProcessor::default().load_documents(&dir).unwrap();
    let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "linked.txt"]);
    assert_eq!(docs[1].text, "reset the router");
}

#[test]
fn load_documents_rejects_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let err = DataProcessor::default().load_documents(&tmp.path().join("missing")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn chunk_documents_keeps_document_then_chunk_order() {
    let processor = DataProcessor::new(ChunkingConfig { size: 2, overlap: 0 });
    let docs = vec![Document::new("x.txt", "one two three"), Document::new("y.txt", "four")];
    let chunks = processor.chunk_documents(&docs);
    let flat: Vec<(&str, &str)> = chunks.iter().map(|c| (c.source_file.as_str(), c.text.as_str())).collect();
    assert_eq!(flat, vec![("x.txt", "one two"), ("x.txt", "three"), ("y.txt", "four")]);
}

#[test]
fn chunk_coverage_for_size_five_overlap_two() {
    let words: Vec<String> = (0..23).map(|i| format!("t{i}")).collect();
    let processor = DataProcessor::new(ChunkingConfig { size: 5, overlap: 2 });
    let chunks = processor.chunk_documents(&[Document::new("doc.txt", words.join(" "))]);

    for w in &words {
        assert!(chunks.iter().any(|c| c.text.split(' ').any(|t| t == w)), "{w} not covered");
    }
    for (i, c) in chunks.iter().enumerate() {
        let first = c.text.split(' ').next().unwrap();
        assert_eq!(first, format!("t{}", i * 3));
        if i + 1 < chunks.len() {
            assert_eq!(c.text.split(' ').count(), 5);
        }
    }
}

#[test]
fn config_layers_files_over_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[chunking]\nsize = 120\n\n[embedder]\nkind = \"hash\"\n",
    )
    .unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[search]\ndefault_k = 7\n").unwrap();

    let config = Config::load_from(tmp.path(), "test").expect("config");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.chunking.size, 120);
    assert_eq!(settings.chunking.overlap, 50);
    assert_eq!(settings.embedder.kind, EmbedderKind::Hash);
    assert_eq!(settings.search.default_k, 7);
    assert_eq!(settings.search.max_k, 50);
    assert_eq!(config.get::<usize>("chunking.size").unwrap(), 120);
}

#[test]
fn config_rejects_zero_chunk_size() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[chunking]\nsize = 0\n").unwrap();
    let err = Config::load_from(tmp.path(), "dev").err().expect("invalid config");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn feedback_record_uses_log_field_names() {
    let record = FeedbackRecord {
        question: "how do I reset my password?".into(),
        expected_file: "accounts.txt".into(),
        k: 5,
        observed_rank: None,
        timestamp: 1_700_000_000,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["answer_file"], "accounts.txt");
    assert!(json["rank"].is_null());

    let parsed: FeedbackRecord =
        serde_json::from_str(r#"{"question":"q","expected_file":"f.txt","k":3,"observed_rank":2}"#).unwrap();
    assert_eq!(parsed.observed_rank, Some(2));
    assert_eq!(parsed.timestamp, 0);
}
