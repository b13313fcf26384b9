//! Two-session lounge flows: one session mutates over the service layer, a
//! second one follows along through the notifier and its local cache.

use commonroom::{
    AppError, db,
    lounges::{self, cache::LoungeCache, membership, new::create_lounge},
    pages,
    realtime::Notifier,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

async fn pool_with_page(members: &[&str]) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_schema(&pool).await.unwrap();

    sqlx::query("INSERT INTO pages (id,name,page_type) VALUES ('p1','6.102','Class')")
        .execute(&pool)
        .await
        .unwrap();
    for user in members {
        sqlx::query("INSERT INTO users (id,name,email) VALUES (?,?,?)")
            .bind(user)
            .bind(*user)
            .bind(format!("{user}@example.edu"))
            .execute(&pool)
            .await
            .unwrap();
        pages::add_member(&pool, "p1", user, "").await.unwrap();
    }
    pool
}

#[tokio::test]
async fn a_second_session_follows_a_create_and_join() {
    let pool = pool_with_page(&["alice", "bob"]).await;
    let notifier = Notifier::new();

    // bob's session: hydrate (no lounges yet), then watch the page scope
    let mut bob_rx = notifier.subscribe("p1").await;
    let mut bob_cache = LoungeCache::hydrate(&lounges::list_for_page(&pool, "p1").await.unwrap());
    assert!(bob_cache.listing().is_empty());

    // alice creates a lounge and joins it
    let lounge = create_lounge(
        &pool,
        &notifier,
        Some("sess-alice".to_owned()),
        "alice",
        "p1",
        "night owls",
    )
    .await
    .unwrap();
    membership::add_self(&pool, &notifier, Some("sess-alice".to_owned()), "alice", &lounge.id)
        .await
        .unwrap();

    // bob replays the scope's stream in order
    let first = bob_rx.recv().await.unwrap();
    assert_eq!(first.origin.as_deref(), Some("sess-alice"));
    bob_cache.apply(&first.event);
    bob_cache.apply(&bob_rx.recv().await.unwrap().event);

    assert_eq!(bob_cache.members_of(&lounge.id).unwrap(), vec!["alice"]);
    assert_eq!(
        lounges::member_ids(&pool, &lounge.id).await.unwrap(),
        vec!["alice"]
    );
}

#[tokio::test]
async fn optimistic_apply_plus_echo_stays_consistent() {
    let pool = pool_with_page(&["alice"]).await;
    let notifier = Notifier::new();

    let mut alice_rx = notifier.subscribe("p1").await;
    let lounge = create_lounge(&pool, &notifier, None, "alice", "p1", "study hall")
        .await
        .unwrap();
    let mut alice_cache = LoungeCache::new();
    alice_cache.apply(&alice_rx.recv().await.unwrap().event);

    membership::add_self(&pool, &notifier, None, "alice", &lounge.id)
        .await
        .unwrap();

    // the initiating session patches itself from its own response first,
    // then sees its own broadcast anyway (no origin to filter on here)
    alice_cache.apply(&commonroom::realtime::RealtimeEvent::UserAddedToLounge {
        user_id: "alice".to_owned(),
        lounge_id: lounge.id.clone(),
    });
    alice_cache.apply(&alice_rx.recv().await.unwrap().event);

    assert_eq!(alice_cache.members_of(&lounge.id).unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn draining_a_lounge_hides_it_everywhere() {
    let pool = pool_with_page(&["alice", "bob"]).await;
    let notifier = Notifier::new();

    let mut watcher_rx = notifier.subscribe("p1").await;
    let lounge = create_lounge(&pool, &notifier, None, "alice", "p1", "exam cram")
        .await
        .unwrap();
    membership::add_self(&pool, &notifier, None, "alice", &lounge.id).await.unwrap();
    membership::add_self(&pool, &notifier, None, "bob", &lounge.id).await.unwrap();

    let mut watcher_cache = LoungeCache::new();
    for _ in 0..3 {
        watcher_cache.apply(&watcher_rx.recv().await.unwrap().event);
    }
    assert_eq!(
        watcher_cache.members_of(&lounge.id).unwrap(),
        vec!["alice", "bob"]
    );

    membership::remove_self(&pool, &notifier, None, "alice", &lounge.id).await.unwrap();
    watcher_cache.apply(&watcher_rx.recv().await.unwrap().event);

    let listed = lounges::list_for_page(&pool, "p1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_ids, vec!["bob"]);
    assert_eq!(watcher_cache.members_of(&lounge.id).unwrap(), vec!["bob"]);

    membership::remove_self(&pool, &notifier, None, "bob", &lounge.id).await.unwrap();
    watcher_cache.apply(&watcher_rx.recv().await.unwrap().event);

    assert!(lounges::list_for_page(&pool, "p1").await.unwrap().is_empty());
    assert!(watcher_cache.listing().is_empty());
}

#[tokio::test]
async fn outsiders_cannot_create_lounges() {
    let pool = pool_with_page(&["alice"]).await;
    let notifier = Notifier::new();

    sqlx::query("INSERT INTO users (id,name,email) VALUES ('mallory','mallory','m@example.edu')")
        .execute(&pool)
        .await
        .unwrap();

    let err = create_lounge(&pool, &notifier, None, "mallory", "p1", "sneaky")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lounges")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn empty_lounge_names_are_rejected() {
    let pool = pool_with_page(&["alice"]).await;
    let notifier = Notifier::new();

    let err = create_lounge(&pool, &notifier, None, "alice", "p1", "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lounges")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
