use credirag_core::metadata::{MetadataPolicy, MetadataValue, RawMetadata};
use credirag_core::traits::Embedder;
use credirag_core::types::{Chunk, EmbeddedChunk, META_COMPLAINT_ID};
use credirag_core::Error;
use credirag_embed::FakeEmbedder;
use credirag_vector::{into_core_error, VectorIndex};
use serde_json::json;
use tempfile::TempDir;

const EMBEDDER: &str = "test:manual:d3";

fn entry(record: &str, text: &str, vector: Vec<f32>) -> EmbeddedChunk {
    let mut metadata = RawMetadata::new();
    metadata.insert(META_COMPLAINT_ID.into(), json!(record));
    EmbeddedChunk { chunk: Chunk { text: text.into(), source_record_id: record.into(), chunk_index: 0 }, vector, metadata }
}

async fn open(dir: &TempDir) -> VectorIndex {
    VectorIndex::open(dir.path(), "complaints", EMBEDDER, 3, MetadataPolicy::Stringify).await.expect("open")
}

#[tokio::test]
async fn query_orders_by_distance_and_caps_at_k() {
    let tmp = TempDir::new().expect("tmp");
    let mut index = open(&tmp).await;
    let entries = vec![
        entry("a", "exact", vec![1.0, 0.0, 0.0]),
        entry("b", "orthogonal", vec![0.0, 1.0, 0.0]),
        entry("c", "between", vec![0.7, 0.7, 0.0]),
    ];
    assert_eq!(index.upsert(&entries, 2).await.expect("upsert"), 3);
    assert_eq!(index.len().await.expect("len"), 3);

    let all = index.query(&[1.0, 0.0, 0.0], 10).await.expect("query");
    let texts: Vec<_> = all.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts, vec!["exact", "between", "orthogonal"], "k >= size returns every entry");
    for pair in all.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    let top = index.query(&[1.0, 0.0, 0.0], 2).await.expect("query");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].meta_str(META_COMPLAINT_ID).as_deref(), Some("a"));
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let tmp = TempDir::new().expect("tmp");
    let mut index = open(&tmp).await;
    let entries: Vec<_> = ["first", "second", "third"].iter().enumerate()
        .map(|(i, t)| entry(&i.to_string(), t, vec![0.0, 0.0, 1.0]))
        .collect();
    index.upsert(&entries, 1).await.expect("upsert");
    let hits = index.query(&[0.0, 0.0, 1.0], 2).await.expect("query");
    let texts: Vec<_> = hits.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn empty_index_returns_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let index = open(&tmp).await;
    assert!(index.is_empty().await.expect("is_empty"));
    assert!(index.query(&[1.0, 0.0, 0.0], 5).await.expect("query").is_empty());
}

#[tokio::test]
async fn entries_survive_reopen_and_keep_sequence() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut index = open(&tmp).await;
        index.upsert(&[entry("1", "older", vec![0.0, 1.0, 0.0])], 10).await.expect("upsert");
    }
    let mut index = open(&tmp).await;
    assert_eq!(index.len().await.expect("len"), 1);
    index.upsert(&[entry("2", "newer", vec![0.0, 1.0, 0.0])], 10).await.expect("upsert");
    let hits = index.query(&[0.0, 1.0, 0.0], 2).await.expect("query");
    let texts: Vec<_> = hits.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts, vec!["older", "newer"]);
}

#[tokio::test]
async fn upserting_same_chunk_replaces_it() {
    let tmp = TempDir::new().expect("tmp");
    let mut index = open(&tmp).await;
    index.upsert(&[entry("1", "v1", vec![1.0, 0.0, 0.0])], 10).await.expect("upsert");
    index.upsert(&[entry("1", "v2", vec![1.0, 0.0, 0.0])], 10).await.expect("upsert");
    assert_eq!(index.len().await.expect("len"), 1);
    let hits = index.query(&[1.0, 0.0, 0.0], 5).await.expect("query");
    assert_eq!(hits[0].text, "v2");
}

#[tokio::test]
async fn structural_metadata_is_sanitized_on_write() {
    let tmp = TempDir::new().expect("tmp");
    let mut index = open(&tmp).await;
    let mut e = entry("7", "fees", vec![1.0, 0.0, 0.0]);
    e.metadata.insert("tags".into(), json!(["late", "fee"]));
    e.metadata.insert("chunk_id".into(), json!(0));
    index.upsert(&[e], 10).await.expect("upsert");

    let hit = &index.query(&[1.0, 0.0, 0.0], 1).await.expect("query")[0];
    assert_eq!(hit.metadata.get("tags"), Some(&MetadataValue::Str("[\"late\",\"fee\"]".into())));
    assert_eq!(hit.metadata.get("chunk_id"), Some(&MetadataValue::Int(0)));
}

#[tokio::test]
async fn reopening_with_another_embedder_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    drop(open(&tmp).await);

    let other = VectorIndex::open(tmp.path(), "complaints", "other-model", 3, MetadataPolicy::Stringify).await;
    assert!(matches!(other.map_err(into_core_error), Err(Error::Configuration(_))));

    let wider = VectorIndex::open(tmp.path(), "complaints", EMBEDDER, 4, MetadataPolicy::Stringify).await;
    assert!(matches!(wider.map_err(into_core_error), Err(Error::Configuration(_))));
}

#[tokio::test]
async fn wrong_width_vectors_are_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let mut index = open(&tmp).await;
    let err = index.upsert(&[entry("1", "x", vec![1.0, 0.0])], 10).await.expect_err("width");
    assert!(matches!(into_core_error(err), Error::Configuration(_)));
    assert!(index.query(&[1.0], 1).await.is_err());
}

#[tokio::test]
async fn reset_removes_index() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path().join("lancedb");
    {
        let mut index = VectorIndex::open(&dir, "complaints", EMBEDDER, 3, MetadataPolicy::Stringify).await.expect("open");
        index.upsert(&[entry("1", "x", vec![1.0, 0.0, 0.0])], 10).await.expect("upsert");
    }
    VectorIndex::reset(&dir).expect("reset");
    let index = VectorIndex::open(&dir, "complaints", "fresh-model", 3, MetadataPolicy::Stringify).await.expect("reopen");
    assert_eq!(index.len().await.expect("len"), 0);
}

#[tokio::test]
async fn fake_embeddings_rank_related_text_first() {
    let embedder = FakeEmbedder::default();
    let tmp = TempDir::new().expect("tmp");
    let mut index = VectorIndex::open(tmp.path(), "complaints", embedder.model_id(), embedder.dim(), MetadataPolicy::Stringify)
        .await
        .expect("open");
    let texts = ["late fee charged on my credit card", "bank closed my savings account", "money transfer never arrived"];
    let entries: Vec<_> = texts.iter().enumerate()
        .map(|(i, t)| entry(&i.to_string(), t, embedder.embed(t).expect("embed")))
        .collect();
    index.upsert(&entries, 2).await.expect("upsert");

    let q = embedder.embed("credit card late fee").expect("embed");
    let hits = index.query(&q, 1).await.expect("query");
    assert_eq!(hits[0].text, texts[0]);
}
