// tests/integration/leaderboard_test.rs

//! Integration tests for the leaderboard engine over the in-memory store
//! Tests: set, add, add_batch, set_if_better, get_score, get_ranking, get_list,
//!        get_top, get_members, get_score_by_ranking, contains, delete,
//!        delete_by_ranking, limit_if, clear, size, exists, set_ttl and the
//!        derived-handle constructors

use super::test_helpers::{TestContext, seed, snapshot};
use rankboard::core::encoder::{FirstInIsBigger, LastInIsBigger};
use rankboard::core::storage::SortedSetStore;
use rankboard::core::{Leaderboard, Ordering, RankEntry, RankError};
use std::sync::Arc;
use std::time::Duration;

fn entry(member: &str, score: i64) -> RankEntry {
    RankEntry {
        member: member.to_string(),
        score,
    }
}

// ===== Construction =====

#[tokio::test]
async fn test_builder_rejects_invalid_configuration() {
    let store = Arc::new(rankboard::core::MemoryStore::new());

    let err = Leaderboard::builder("").store(store.clone()).build().unwrap_err();
    assert_eq!(err, RankError::EmptyKey);

    let err = Leaderboard::builder("board")
        .store(store.clone())
        .ordering_name("sideways")
        .build()
        .unwrap_err();
    assert_eq!(err, RankError::InvalidOrdering("sideways".into()));

    let err = Leaderboard::builder("board").build().unwrap_err();
    assert_eq!(err, RankError::MissingStore);
}

#[tokio::test]
async fn test_builder_defaults() {
    let ctx = TestContext::new();
    assert_eq!(ctx.board.key().as_str(), "test:default");
    assert_eq!(ctx.board.key().data_key(), "test:default:data");
    assert_eq!(ctx.board.ordering(), Ordering::Descending);
    assert!(ctx.board.encoder().is_none());
    assert_eq!(ctx.board.max_members(), 0);

    let asc = Leaderboard::builder("test")
        .store(ctx.store.clone())
        .ordering_name("asc")
        .sub_id("season-2")
        .build()
        .unwrap();
    assert_eq!(asc.ordering(), Ordering::Ascending);
    assert_eq!(asc.key().as_str(), "test:season-2");
}

#[tokio::test]
async fn test_derived_handles_do_not_alias() {
    let ctx = TestContext::new();
    let bounded = ctx.board.with_max_members(10);
    let asc = bounded.with_ordering(Ordering::Ascending);
    let other = asc.with_id("weekly");

    assert_eq!(ctx.board.max_members(), 0);
    assert_eq!(bounded.ordering(), Ordering::Descending);
    assert_eq!(asc.max_members(), 10);
    assert_eq!(asc.key().as_str(), "test:default");
    assert_eq!(other.key().as_str(), "test:weekly");
    assert_eq!(other.key().base(), "test");

    let encoded = ctx.board.with_encoder(Arc::new(LastInIsBigger::new()));
    assert!(encoded.encoder().is_some());
    assert!(encoded.without_encoder().encoder().is_none());
    assert!(ctx.board.encoder().is_none());

    assert_eq!(
        ctx.board.with_ordering_name("up").unwrap_err(),
        RankError::InvalidOrdering("up".into())
    );
    assert_eq!(
        ctx.board.with_ordering_name("asc").unwrap().ordering(),
        Ordering::Ascending
    );
}

// ===== Writes and reads =====

#[tokio::test]
async fn test_set_and_get_score() {
    let ctx = TestContext::new();
    assert!(ctx.board.set("alice", 30, 0).await.unwrap());
    // Same score again changes nothing.
    assert!(!ctx.board.set("alice", 30, 0).await.unwrap());
    assert!(ctx.board.add("alice", 40, 0).await.unwrap());

    assert_eq!(ctx.board.get_score("alice").await.unwrap(), 40);
    assert_eq!(ctx.board.get_score("nobody").await.unwrap(), 0);
    assert!(ctx.board.contains("alice").await.unwrap());
    assert!(!ctx.board.contains("nobody").await.unwrap());
}

#[tokio::test]
async fn test_get_ranking_follows_ordering() {
    let ctx = TestContext::new();
    ctx.seed(5).await;

    assert_eq!(ctx.board.get_ranking("m5").await.unwrap(), 1);
    assert_eq!(ctx.board.get_ranking("m1").await.unwrap(), 5);
    assert_eq!(ctx.board.get_ranking("missing").await.unwrap(), 0);

    let asc = ctx.board.with_ordering(Ordering::Ascending);
    assert_eq!(asc.get_ranking("m1").await.unwrap(), 1);
    assert_eq!(asc.get_ranking("m5").await.unwrap(), 5);
}

#[tokio::test]
async fn test_get_list_windows() {
    let ctx = TestContext::new();
    ctx.seed(5).await;

    assert_eq!(
        ctx.board.get_list(0, 2).await.unwrap(),
        vec![entry("m5", 5), entry("m4", 4)]
    );
    assert_eq!(
        ctx.board.get_list(3, 10).await.unwrap(),
        vec![entry("m2", 2), entry("m1", 1)]
    );
    assert!(ctx.board.get_list(10, 3).await.unwrap().is_empty());

    let asc = ctx.board.with_ordering(Ordering::Ascending);
    assert_eq!(
        asc.get_list(1, 2).await.unwrap(),
        vec![entry("m2", 2), entry("m3", 3)]
    );
}

#[tokio::test]
async fn test_get_list_rejects_empty_window() {
    let ctx = TestContext::new();
    ctx.seed(3).await;

    assert_eq!(
        ctx.board.get_list(2, 0).await.unwrap_err(),
        RankError::InvalidRange { start: 2, end: 1 }
    );
    assert!(matches!(
        ctx.board.get_list(0, -4).await,
        Err(RankError::InvalidRange { .. })
    ));
}

#[tokio::test]
async fn test_get_top_and_members() {
    let ctx = TestContext::new();
    ctx.seed(4).await;

    assert_eq!(
        ctx.board.get_top(2).await.unwrap(),
        vec![entry("m4", 4), entry("m3", 3)]
    );
    assert!(ctx.board.get_top(0).await.unwrap().is_empty());
    assert!(ctx.board.get_top(-1).await.unwrap().is_empty());
    assert_eq!(
        ctx.board.get_members(1, 2).await.unwrap(),
        vec!["m3".to_string(), "m2".to_string()]
    );
}

#[tokio::test]
async fn test_get_score_by_ranking() {
    let ctx = TestContext::new();
    ctx.seed(3).await;

    assert_eq!(ctx.board.get_score_by_ranking(0).await.unwrap(), 3);
    assert_eq!(ctx.board.get_score_by_ranking(2).await.unwrap(), 1);
    assert_eq!(ctx.board.get_score_by_ranking(3).await.unwrap(), 0);
    assert_eq!(ctx.board.get_score_by_ranking(1000).await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_batch_single_write() {
    let ctx = TestContext::new();
    let written = ctx
        .board
        .add_batch(&[("a", 10, 0), ("b", 20, 0), ("c", 30, 0)])
        .await
        .unwrap();
    assert_eq!(written, 3);
    assert_eq!(ctx.board.size().await.unwrap(), 3);
    assert_eq!(ctx.board.add_batch(&[]).await.unwrap(), 0);

    // Re-sending one unchanged entry and one changed entry.
    let written = ctx
        .board
        .add_batch(&[("a", 10, 0), ("b", 25, 0)])
        .await
        .unwrap();
    assert_eq!(written, 1);
}

#[tokio::test]
async fn test_add_batch_trims_once() {
    let ctx = TestContext::new();
    let board = ctx.board.with_max_members(2);
    board
        .add_batch(&[("a", 1, 0), ("b", 2, 0), ("c", 3, 0), ("d", 4, 0)])
        .await
        .unwrap();
    assert_eq!(
        snapshot(&board).await,
        vec![("d".to_string(), 4), ("c".to_string(), 3)]
    );
}

#[tokio::test]
async fn test_set_if_better_descending() {
    let ctx = TestContext::new();
    assert!(ctx.board.set_if_better("p", 10, 0).await.unwrap());
    assert!(!ctx.board.set_if_better("p", 5, 0).await.unwrap());
    assert!(!ctx.board.set_if_better("p", 10, 0).await.unwrap());
    assert!(ctx.board.set_if_better("p", 12, 0).await.unwrap());
    assert!(!ctx.board.set_if_better("p", 0, 0).await.unwrap());
    assert!(!ctx.board.set_if_better("p", -3, 0).await.unwrap());
    assert_eq!(ctx.board.get_score("p").await.unwrap(), 12);
}

#[tokio::test]
async fn test_set_if_better_ascending() {
    let ctx = TestContext::with_ordering(Ordering::Ascending);
    assert!(ctx.board.set_if_better("lap", 90, 0).await.unwrap());
    assert!(!ctx.board.set_if_better("lap", 95, 0).await.unwrap());
    assert!(ctx.board.set_if_better("lap", 80, 0).await.unwrap());
    assert_eq!(ctx.board.get_score("lap").await.unwrap(), 80);
}

#[tokio::test]
async fn test_delete_member() {
    let ctx = TestContext::new();
    ctx.seed(2).await;
    assert!(ctx.board.delete("m1").await.unwrap());
    assert!(!ctx.board.delete("m1").await.unwrap());
    assert_eq!(ctx.board.size().await.unwrap(), 1);
}

// ===== Rank-window deletion =====

#[tokio::test]
async fn test_delete_by_ranking_validates_arguments() {
    let ctx = TestContext::new();
    ctx.seed(3).await;

    assert_eq!(
        ctx.board.delete_by_ranking(0, 1).await.unwrap_err(),
        RankError::InvalidRanking(0)
    );
    assert_eq!(
        ctx.board.delete_by_ranking(-2, 1).await.unwrap_err(),
        RankError::InvalidRanking(-2)
    );
    assert_eq!(ctx.board.delete_by_ranking(1, 0).await.unwrap(), 0);
    assert_eq!(ctx.board.size().await.unwrap(), 3);
}

#[tokio::test]
async fn test_delete_by_ranking_single_rank_both_orderings() {
    for ordering in [Ordering::Descending, Ordering::Ascending] {
        let ctx = TestContext::with_ordering(ordering);
        ctx.seed(100).await;

        let top = ctx.board.get_members(0, 100).await.unwrap();
        let victim = top[49].clone();

        assert_eq!(ctx.board.delete_by_ranking(50, 1).await.unwrap(), 1);
        assert!(!ctx.board.contains(&victim).await.unwrap());
        assert_eq!(ctx.board.size().await.unwrap(), 99);

        let mut expected = top.clone();
        expected.remove(49);
        assert_eq!(
            ctx.board.get_members(0, 100).await.unwrap(),
            expected,
            "ordering {ordering}"
        );
    }
}

#[tokio::test]
async fn test_delete_by_ranking_window_past_end() {
    let ctx = TestContext::new();
    ctx.seed(5).await;
    assert_eq!(ctx.board.delete_by_ranking(4, 10).await.unwrap(), 2);
    assert_eq!(ctx.board.get_members(0, 10).await.unwrap(), vec!["m5", "m4", "m3"]);
    assert_eq!(ctx.board.delete_by_ranking(10, 1).await.unwrap(), 0);
}

// ===== Size bound =====

#[tokio::test]
async fn test_limit_if_keeps_best_members() {
    let ctx = TestContext::new();
    ctx.seed(5).await;

    let desc = ctx.board.with_max_members(3);
    assert_eq!(desc.limit_if().await.unwrap(), 2);
    assert_eq!(desc.get_members(0, 10).await.unwrap(), vec!["m5", "m4", "m3"]);

    let ctx = TestContext::with_ordering(Ordering::Ascending);
    ctx.seed(5).await;
    let asc = ctx.board.with_max_members(3);
    assert_eq!(asc.limit_if().await.unwrap(), 2);
    assert_eq!(asc.get_members(0, 10).await.unwrap(), vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn test_limit_if_unbounded_is_noop() {
    let ctx = TestContext::new();
    ctx.seed(5).await;
    assert_eq!(ctx.board.limit_if().await.unwrap(), 0);
    assert_eq!(ctx.board.size().await.unwrap(), 5);
}

#[tokio::test]
async fn test_limit_if_evicts_in_fixed_batches() {
    let ctx = TestContext::new();
    ctx.seed(10).await;
    let bounded = ctx.board.with_max_members(2);

    assert_eq!(bounded.limit_if().await.unwrap(), 3);
    assert_eq!(bounded.size().await.unwrap(), 7);
    assert_eq!(bounded.limit_if().await.unwrap(), 3);
    assert_eq!(bounded.limit_if().await.unwrap(), 2);
    assert_eq!(bounded.limit_if().await.unwrap(), 0);
    assert_eq!(bounded.get_members(0, 10).await.unwrap(), vec!["m10", "m9"]);
}

#[tokio::test]
async fn test_set_enforces_size_bound() {
    let ctx = TestContext::new();
    let bounded = ctx.board.with_max_members(3);
    seed(&bounded, 6).await;
    assert_eq!(bounded.size().await.unwrap(), 3);
    assert_eq!(bounded.get_members(0, 10).await.unwrap(), vec!["m6", "m5", "m4"]);

    // A newcomer below the cut is written and then evicted.
    bounded.set("low", 1, 0).await.unwrap();
    assert!(!bounded.contains("low").await.unwrap());
}

// ===== Key lifecycle =====

#[tokio::test]
async fn test_clear_size_exists() {
    let ctx = TestContext::new();
    assert!(!ctx.board.exists().await.unwrap());
    assert_eq!(ctx.board.size().await.unwrap(), 0);

    ctx.board
        .set_with_payload("a", 1, 0, &serde_json::json!({"name": "A"}))
        .await
        .unwrap();
    assert!(ctx.board.exists().await.unwrap());
    assert!(ctx.store.exists("test:default:data").await.unwrap());

    ctx.board.clear().await.unwrap();
    assert!(!ctx.board.exists().await.unwrap());
    assert!(!ctx.store.exists("test:default:data").await.unwrap());
    // Clearing twice is fine.
    ctx.board.clear().await.unwrap();
}

#[tokio::test]
async fn test_set_ttl_expires_board() {
    let ctx = TestContext::new();
    assert!(!ctx.board.set_ttl(Duration::from_secs(1)).await.unwrap());

    ctx.seed(2).await;
    assert!(ctx.board.set_ttl(Duration::from_millis(30)).await.unwrap());
    assert_eq!(ctx.board.size().await.unwrap(), 2);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!ctx.board.exists().await.unwrap());
    assert_eq!(ctx.board.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_sub_ids_are_independent() {
    let ctx = TestContext::new();
    let daily = ctx.board.with_id("daily");
    let weekly = ctx.board.with_id("weekly");

    daily.set("a", 5, 0).await.unwrap();
    weekly.set("a", 9, 0).await.unwrap();

    assert_eq!(daily.get_score("a").await.unwrap(), 5);
    assert_eq!(weekly.get_score("a").await.unwrap(), 9);
    assert_eq!(ctx.board.size().await.unwrap(), 0);

    daily.clear().await.unwrap();
    assert_eq!(weekly.size().await.unwrap(), 1);
}

// ===== Encoded scores =====

#[tokio::test]
async fn test_encoded_tie_break_last_in() {
    let ctx = TestContext::new();
    let board = ctx.encoded(Arc::new(LastInIsBigger::new()));

    board.set("early", 100, 1_000).await.unwrap();
    board.set("late", 100, 2_000).await.unwrap();
    board.set("low", 99, i32::MAX as i64).await.unwrap();

    assert_eq!(
        board.get_list(0, 3).await.unwrap(),
        vec![entry("late", 100), entry("early", 100), entry("low", 99)]
    );
    assert_eq!(board.get_score("early").await.unwrap(), 100);
}

#[tokio::test]
async fn test_encoded_tie_break_first_in() {
    let ctx = TestContext::new();
    let board = ctx.encoded(Arc::new(FirstInIsBigger::new()));

    board.set("early", 100, 1_000).await.unwrap();
    board.set("late", 100, 2_000).await.unwrap();

    assert_eq!(board.get_members(0, 2).await.unwrap(), vec!["early", "late"]);
    assert_eq!(board.get_ranking("late").await.unwrap(), 2);
}

#[tokio::test]
async fn test_encoded_round_trip_across_sub_ids() {
    let ctx = TestContext::new();
    let encoder = Arc::new(LastInIsBigger::new());
    let a = ctx.board.with_encoder(encoder.clone()).with_id("a");
    let b = ctx.board.with_encoder(encoder).with_id("b");

    a.set("x", 7, 123).await.unwrap();
    b.set("x", 8, 456).await.unwrap();

    assert_eq!(a.get_score("x").await.unwrap(), 7);
    assert_eq!(b.get_score("x").await.unwrap(), 8);
    assert_eq!(a.get_top(5).await.unwrap(), vec![entry("x", 7)]);
}

#[tokio::test]
async fn test_encoded_reads_legacy_unencoded_scores() {
    let ctx = TestContext::new();
    ctx.board.set("legacy", 42, 0).await.unwrap();

    let encoded = ctx.encoded(Arc::new(LastInIsBigger::new()));
    encoded.set("new", 40, 5).await.unwrap();

    assert_eq!(encoded.get_score("legacy").await.unwrap(), 42);
    assert_eq!(encoded.get_score("new").await.unwrap(), 40);
    // Unencoded values are tiny next to encoded ones.
    assert_eq!(encoded.get_members(0, 2).await.unwrap(), vec!["new", "legacy"]);
}

#[tokio::test]
async fn test_encoded_set_rejects_out_of_range_inputs() {
    let ctx = TestContext::new();
    let board = ctx.encoded(Arc::new(LastInIsBigger::new()));

    let too_big = i64::from(i32::MAX) + 1;
    assert_eq!(
        board.set("x", too_big, 0).await.unwrap_err(),
        RankError::ScoreOverflow(too_big)
    );
    assert_eq!(
        board.set("x", 5, -too_big - 5).await.unwrap_err(),
        RankError::FactorOverflow(-too_big - 5)
    );
    assert!(!board.contains("x").await.unwrap());

    // Without an encoder the same primary is stored as is.
    ctx.board.set("x", too_big, 0).await.unwrap();
    assert_eq!(ctx.board.get_score("x").await.unwrap(), too_big);
}

#[tokio::test]
async fn test_encoded_non_positive_primary_is_unranked() {
    let ctx = TestContext::new();
    let board = ctx.encoded(Arc::new(LastInIsBigger::new()));
    board.set("zero", 0, 999).await.unwrap();
    board.set("neg", -4, 999).await.unwrap();
    assert_eq!(board.get_score("zero").await.unwrap(), 0);
    assert_eq!(board.get_score("neg").await.unwrap(), 0);
    assert!(board.contains("neg").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_writers_share_one_board() {
    let ctx = TestContext::new();
    let mut handles = Vec::new();
    for worker in 0..8 {
        let board = ctx.board.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                board
                    .set(&format!("w{worker}-{i}"), i64::from(worker * 100 + i), 0)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(ctx.board.size().await.unwrap(), 200);
    assert_eq!(ctx.board.get_list(0, 1).await.unwrap(), vec![entry("w7-24", 724)]);
}
