use credirag_core::config::EmbeddingSettings;
use credirag_core::error::Error;
use credirag_core::traits::Embedder;
use credirag_embed::{get_default_embedder, BertEmbedder, FakeEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn default_embedder_honours_fake_switch() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let embedder = get_default_embedder(&EmbeddingSettings::default()).expect("embedder");
    assert!(embedder.model_id().starts_with("fake:"));

    let texts = vec!["charged a late fee".to_string(), "refund never arrived".to_string(), "charged a late fee".to_string()];
    let vectors = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(vectors.len(), 3);
    for v in &vectors {
        assert_eq!(v.len(), embedder.dim());
        let norm = cosine(v, v).sqrt();
        assert!((norm - 1.0).abs() <= 1e-3, "not unit length: {norm}");
    }
    assert_eq!(vectors[0], vectors[2], "same text, same vector");
    assert_ne!(vectors[0], vectors[1]);
    assert_eq!(embedder.embed("charged a late fee").expect("embed"), vectors[0]);
}

#[test]
fn fake_embedder_ranks_shared_words_closer() {
    let embedder = FakeEmbedder::default();
    let q = embedder.embed("late fee on my credit card").expect("q");
    let near = embedder.embed("credit card late fee dispute").expect("near");
    let far = embedder.embed("wrong mailing address").expect("far");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn fake_embedder_handles_text_without_words() {
    let embedder = FakeEmbedder::new(64);
    let v = embedder.embed("?!").expect("embed");
    assert_eq!(v.len(), 64);
    assert!(v.iter().all(|x| x.is_finite()));
    assert!(v.iter().any(|x| *x > 0.0));
}

#[test]
fn bert_without_model_files_is_unavailable() {
    let tmp = tempfile::tempdir().expect("tmp");
    let mut settings = EmbeddingSettings::default();

    settings.model_dir = tmp.path().join("not-downloaded");
    let missing = BertEmbedder::load(&settings).err().expect("missing dir");
    assert!(matches!(missing, Error::ModelUnavailable { ref model, .. } if model == &settings.model_id));

    settings.model_dir = tmp.path().to_path_buf();
    assert!(matches!(BertEmbedder::load(&settings), Err(Error::ModelUnavailable { .. })), "empty dir has no tokenizer");
}
