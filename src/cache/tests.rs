use super::*;
use std::sync::Arc;
use std::time::Duration;
use crate::config::Credentials;
use crate::flows::LessonRequest;
use mockito::{Matcher, Server};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Lesson {
    title: String,
}

fn lesson(title: &str) -> Lesson {
    Lesson {
        title: title.to_string(),
    }
}

#[tokio::test]
async fn memory_store_expires_entries() {
    let store = MemoryKv::new(4);
    store.put("live", "1", Duration::from_secs(60)).await.unwrap();
    store.put("stale", "2", Duration::ZERO).await.unwrap();

    assert_eq!(store.get("live").await.unwrap(), Some("1".to_string()));
    assert_eq!(store.get("stale").await.unwrap(), None);
    assert_eq!(store.get("missing").await.unwrap(), None);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn memory_store_evicts_least_recently_used() {
    let store = MemoryKv::new(2);
    let ttl = Duration::from_secs(60);
    store.put("a", "1", ttl).await.unwrap();
    store.put("b", "2", ttl).await.unwrap();
    store.get("a").await.unwrap();
    store.put("c", "3", ttl).await.unwrap();

    assert_eq!(store.get("b").await.unwrap(), None);
    assert!(store.get("a").await.unwrap().is_some());
    assert!(store.get("c").await.unwrap().is_some());
}

#[tokio::test]
async fn get_or_generate_stores_fresh_values_once() {
    let cache = ResponseCache::new(Arc::new(MemoryKv::new(8)));
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let value = cache
            .get_or_generate("lesson:greetings", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Generated::fresh(lesson("Greetings"))
            })
            .await;
        assert_eq!(value, lesson("Greetings"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fallback_values_are_not_cached() {
    let cache = ResponseCache::new(Arc::new(MemoryKv::new(8)));

    let first = cache
        .get_or_generate("story:market", || async {
            Generated {
                value: lesson("apology"),
                cacheable: false,
            }
        })
        .await;
    assert_eq!(first, lesson("apology"));
    assert_eq!(cache.get_json::<Lesson>("story:market").await, None);
}

#[tokio::test]
async fn undecodable_entry_is_a_miss() {
    let store = Arc::new(MemoryKv::new(8));
    store.put("k", "not json", Duration::from_secs(60)).await.unwrap();
    let cache = ResponseCache::new(store);

    assert_eq!(cache.get_json::<Lesson>("k").await, None);
}

#[test]
fn cache_key_is_flow_plus_digest() {
    let key = cache_key("image", &"a cat");
    assert!(key.starts_with("image:"));
    assert_eq!(key.len(), "image:".len() + 64);
    assert_eq!(key, cache_key("image", &"a cat"));
    assert_ne!(key, cache_key("image", &"a dog"));
    assert_ne!(key, cache_key("story", &"a cat"));
}

#[test]
fn cache_key_stays_short_for_long_lessons() {
    let request = LessonRequest {
        topic: "Reading".to_string(),
        level: Default::default(),
        lesson_text: "Once upon a time. ".repeat(600),
    };
    assert!(request.lesson_text.len() > 10_000);

    let key = cache_key("lesson", &request);

    assert_eq!(key.len(), "lesson:".len() + 64);
    assert!(key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b':'));
}

fn kv(server: &Server) -> HttpKv {
    HttpKv::new(Credentials {
        api_url: format!("{}/kv/", server.url()),
        api_key: "kv-secret".to_string(),
        model: None,
    })
}

#[tokio::test]
async fn http_store_reads_and_misses() {
    let mut server = Server::new_async().await;
    let hit = server
        .mock("GET", "/kv/values/greeting")
        .match_header("authorization", "Bearer kv-secret")
        .with_status(200)
        .with_body(r#"{"title":"Hello"}"#)
        .create_async()
        .await;
    let _miss = server
        .mock("GET", "/kv/values/unknown")
        .with_status(404)
        .create_async()
        .await;

    let store = kv(&server);

    assert_eq!(
        store.get("greeting").await.unwrap(),
        Some(r#"{"title":"Hello"}"#.to_string())
    );
    assert_eq!(store.get("unknown").await.unwrap(), None);
    hit.assert_async().await;
}

#[tokio::test]
async fn http_store_writes_with_one_year_expiry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/kv/values/greeting")
        .match_query(Matcher::UrlEncoded(
            "expiration_ttl".to_string(),
            ONE_YEAR_SECS.to_string(),
        ))
        .match_body(r#"{"title":"Hello"}"#)
        .with_status(200)
        .create_async()
        .await;

    let cache = ResponseCache::new(Arc::new(kv(&server)));
    cache.put_json("greeting", &lesson("Hello")).await;

    mock.assert_async().await;
}

#[tokio::test]
async fn http_store_surfaces_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/kv/values/greeting")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let err = kv(&server).get("greeting").await.unwrap_err();
    match err {
        CacheError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
