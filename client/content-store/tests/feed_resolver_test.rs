//! Integration Tests: feed resolution
//!
//! Coverage:
//! - Empty search stays strictly local, even with zero local posts
//! - A search with no local hits falls back to the global match set
//! - Global scope ignores the community label
//! - Results are newest first

use content_store::models::NewPost;
use content_store::{ContentStore, FeedQuery, FeedScope};
use kv_store::MemoryStore;
use std::sync::Arc;
use uuid_utils::ManualClock;

/// Store with posts in two communities, one millisecond apart
fn seeded() -> ContentStore {
    let clock = Arc::new(ManualClock::new(1_000));
    let store = ContentStore::new(Arc::new(MemoryStore::new())).with_clock(clock.clone());

    let posts = [
        ("Ama", "Denver, CO", "Hello Denver"),
        ("Kofi", "Austin, TX", "hello from Austin"),
        ("Esi", "Austin, TX", "Taco truck on 6th"),
        ("Yaw", "Denver, CO", "Lost dog near Wash Park"),
    ];
    for (author, label, text) in posts {
        store
            .create_post(NewPost::text(author, label, text))
            .unwrap();
        clock.advance(1);
    }
    store
}

fn texts(view: &content_store::FeedView) -> Vec<&str> {
    view.posts.iter().map(|p| p.text.as_str()).collect()
}

#[test]
fn test_empty_query_never_falls_back() {
    let store = seeded();
    let view = store.feed(&FeedQuery::local("Boulder, CO"));
    assert!(view.is_empty());
    assert!(!view.fell_back_to_global);

    let view = store.feed(&FeedQuery::local("Boulder, CO").search(""));
    assert!(view.is_empty());
}

#[test]
fn test_query_without_local_hits_uses_global_matches() {
    let store = seeded();

    let fallback = store.feed(&FeedQuery::local("Boulder, CO").search("hello"));
    let global = store.feed(&FeedQuery::global().search("hello"));

    assert!(fallback.fell_back_to_global);
    assert_eq!(fallback.posts, global.posts);
    assert_eq!(texts(&fallback), vec!["hello from Austin", "Hello Denver"]);
}

#[test]
fn test_local_hits_win_over_global() {
    let store = seeded();
    let view = store.feed(&FeedQuery::local("Denver, CO").search("HELLO"));
    assert!(!view.fell_back_to_global);
    assert_eq!(texts(&view), vec!["Hello Denver"]);
}

#[test]
fn test_local_feed_newest_first() {
    let store = seeded();
    let view = store.feed(&FeedQuery::local("denver, co"));
    assert_eq!(
        texts(&view),
        vec!["Lost dog near Wash Park", "Hello Denver"]
    );
}

#[test]
fn test_global_scope_ignores_label() {
    let store = seeded();
    let view = store.feed(&FeedQuery::local("Denver, CO").with_scope(FeedScope::Global));
    assert_eq!(view.len(), 4);
    assert!(view
        .posts
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
}

#[test]
fn test_search_matches_author_name() {
    let store = seeded();
    let view = store.feed(&FeedQuery::global().search("esi"));
    assert_eq!(texts(&view), vec!["Taco truck on 6th"]);
}
