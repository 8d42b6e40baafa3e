//! Integration tests for magpie-store
//!
//! These tests verify the URL-keyed upsert cycle and the dual-store
//! consistency between the canonical records and the vector index.

use magpie_domain::{Attributes, Industry, PageDraft, PageMetadata, PageStore, RecordType};
use magpie_embedding::KeywordEmbedder;
use magpie_store::SqliteStore;
use std::sync::Arc;

fn test_embedder() -> Arc<KeywordEmbedder> {
    Arc::new(KeywordEmbedder::new(&[
        "credit card",
        "interest rate",
        "cashback",
        "policy",
        "premium",
        "shipping",
    ]))
}

fn banking_draft(url: &str) -> PageDraft {
    let mut attributes = Attributes::new();
    attributes.insert("type".into(), "FinancialProduct".into());
    attributes.insert("vocabulary".into(), "schema.org".into());
    attributes.insert("name".into(), "Platinum Card".into());

    PageDraft {
        url: url.to_string(),
        title: "Platinum Card".to_string(),
        description: "A rewards credit card".to_string(),
        industry: Industry::Banking,
        record_type: RecordType::FinancialProduct,
        attributes,
        raw_metadata: PageMetadata::default(),
        text_content: "Platinum credit card with cashback rewards and a low interest rate"
            .to_string(),
    }
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:", test_embedder());
    assert!(store.is_ok());
}

#[test]
fn test_store_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("magpie.db");

    let mut store = SqliteStore::new(&path, test_embedder()).unwrap();
    let page_id = store
        .save(banking_draft("https://example.com/card"))
        .unwrap();

    // A fresh store over the same file sees the canonical record
    drop(store);
    let store = SqliteStore::new(&path, test_embedder()).unwrap();
    let page = store.get_by_url("https://example.com/card").unwrap().unwrap();
    assert_eq!(page.id, page_id);
}

#[test]
fn test_save_and_get_round_trip() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    let draft = banking_draft("https://example.com/card");

    let page_id = store.save(draft.clone()).unwrap();
    let page = store.get_by_url(&draft.url).unwrap().unwrap();

    assert_eq!(page.id, page_id);
    assert_eq!(page.url, draft.url);
    assert_eq!(page.title, draft.title);
    assert_eq!(page.industry, Industry::Banking);
    assert_eq!(page.record_type, RecordType::FinancialProduct);
    assert_eq!(page.attributes["name"], "Platinum Card");
    assert!(page.created_at > 0);
    assert_eq!(page.created_at, page.updated_at);
}

#[test]
fn test_get_by_url_missing() {
    let store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    assert!(store.get_by_url("https://nowhere.example").unwrap().is_none());
}

#[test]
fn test_upsert_is_idempotent_on_page_id() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    let url = "https://example.com/card";

    let first = store.save(banking_draft(url)).unwrap();
    let second = store.save(banking_draft(url)).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_upsert_replaces_fields_and_advances_updated_at() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    let url = "https://example.com/card";

    store.save(banking_draft(url)).unwrap();
    let before = store.get_by_url(url).unwrap().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));

    let mut updated = banking_draft(url);
    updated.title = "Platinum Card v2".to_string();
    updated.industry = Industry::General;
    updated.record_type = RecordType::WebPage;
    updated
        .attributes
        .insert("name".into(), "Platinum Card v2".into());
    store.save(updated).unwrap();

    let after = store.get_by_url(url).unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.title, "Platinum Card v2");
    assert_eq!(after.industry, Industry::General);
    assert_eq!(after.record_type, RecordType::WebPage);
    assert_eq!(after.attributes["name"], "Platinum Card v2");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn test_search_similar_returns_scored_hit() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    store
        .save(banking_draft("https://example.com/card"))
        .unwrap();

    let hits = store.search_similar("cashback credit card", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page.url, "https://example.com/card");
    assert!(hits[0].similarity_score > 0.0);
}

#[test]
fn test_search_similar_empty_store() {
    let store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    assert!(store.search_similar("anything", 5).unwrap().is_empty());
}

#[test]
fn test_search_similar_unrelated_query() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    store
        .save(banking_draft("https://example.com/card"))
        .unwrap();

    // No vocabulary overlap embeds to a zero vector
    let hits = store.search_similar("gardening tips", 5).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_search_reflects_latest_upsert() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    let url = "https://example.com/page";

    store.save(banking_draft(url)).unwrap();

    let mut updated = banking_draft(url);
    updated.text_content = "Motor policy with a low premium".to_string();
    updated.industry = Industry::Insurance;
    store.save(updated).unwrap();

    let hits = store.search_similar("premium policy", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page.industry, Industry::Insurance);

    // The superseded banking vector must not resurface as a duplicate
    let hits = store.search_similar("cashback credit card", 5).unwrap();
    assert!(hits.len() <= 1);
}

#[test]
fn test_get_by_industry_ordering_and_limit() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();

    store.save(banking_draft("https://example.com/a")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    store.save(banking_draft("https://example.com/b")).unwrap();

    let mut other = banking_draft("https://example.com/c");
    other.industry = Industry::Insurance;
    store.save(other).unwrap();

    let pages = store.get_by_industry(Industry::Banking, 10).unwrap();
    assert_eq!(pages.len(), 2);
    // Most recently updated first
    assert_eq!(pages[0].url, "https://example.com/b");
    assert_eq!(pages[1].url, "https://example.com/a");

    let limited = store.get_by_industry(Industry::Banking, 1).unwrap();
    assert_eq!(limited.len(), 1);

    assert!(store
        .get_by_industry(Industry::Ecommerce, 10)
        .unwrap()
        .is_empty());
}

#[test]
fn test_empty_text_content_still_saves_canonically() {
    let mut store = SqliteStore::new(":memory:", test_embedder()).unwrap();
    let mut draft = banking_draft("https://example.com/empty");
    draft.text_content = String::new();

    // Vector write is skipped but the canonical save succeeds
    let page_id = store.save(draft).unwrap();
    let page = store.get_by_url("https://example.com/empty").unwrap().unwrap();
    assert_eq!(page.id, page_id);
    assert!(store.search_similar("credit card", 5).unwrap().is_empty());
}
