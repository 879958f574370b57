use std::sync::Arc;
use std::time::Duration;

use lumen_feed_core::{CursorPager, FeedError, FetchOutcome, PagerOptions, SkipReason};
use lumen_models::{ContentItem, FeedKind};
use lumen_test_support::fixtures::{ids, item_page};
use lumen_test_support::mocks::ScriptedPageSource;

fn options() -> PagerOptions {
    PagerOptions {
        stale_time: Duration::from_secs(30),
        retry: 0,
        retry_delay: Duration::ZERO,
    }
}

fn pager(source: &Arc<ScriptedPageSource<ContentItem>>) -> CursorPager<ContentItem> {
    CursorPager::new(FeedKind::ForYou, source.clone(), options())
}

#[tokio::test]
async fn pages_accumulate_until_the_cursor_runs_out() {
    let source = ScriptedPageSource::new();
    source.push_page(item_page(Some("c1"), &["A", "B"]));
    source.push_page(item_page(None, &["C"]));
    let pager = pager(&source);

    assert_eq!(
        pager.observe().await,
        FetchOutcome::Appended {
            page_index: 0,
            items: 2
        }
    );
    assert!(pager.snapshot().has_next_page());
    assert_eq!(
        pager.fetch_next_page().await,
        FetchOutcome::Appended {
            page_index: 1,
            items: 1
        }
    );

    let snapshot = pager.snapshot();
    assert_eq!(ids(snapshot.items()), ["A", "B", "C"]);
    assert!(!snapshot.has_next_page());
    assert_eq!(
        pager.fetch_next_page().await,
        FetchOutcome::Skipped(SkipReason::NoNextPage)
    );
    assert_eq!(source.requests(), vec![None, Some("c1".to_string())]);
}

#[tokio::test]
async fn concurrent_next_page_requests_issue_one_fetch() -> anyhow::Result<()> {
    let source = ScriptedPageSource::new();
    source.push_page(item_page(Some("c1"), &["A"]));
    let gate = source.push_gated();
    let pager = pager(&source);
    pager.observe().await;

    let running = tokio::spawn({
        let pager = pager.clone();
        async move { pager.fetch_next_page().await }
    });
    source.wait_for_requests(2).await?;

    assert!(pager.snapshot().is_fetching_next_page);
    assert!(!pager.snapshot().is_loading);
    assert_eq!(
        pager.fetch_next_page().await,
        FetchOutcome::Skipped(SkipReason::InFlight)
    );

    gate.release(item_page(Some("c2"), &["B"]));
    assert_eq!(
        running.await?,
        FetchOutcome::Appended {
            page_index: 1,
            items: 1
        }
    );
    assert_eq!(source.request_count(), 2);
    assert!(!pager.snapshot().is_fetching());
    Ok(())
}

#[tokio::test]
async fn duplicate_items_across_pages_are_kept() {
    let source = ScriptedPageSource::new();
    source.push_page(item_page(Some("c1"), &["A", "B"]));
    source.push_page(item_page(Some("c2"), &["B", "A"]));
    let pager = pager(&source);
    pager.observe().await;
    pager.fetch_next_page().await;

    assert_eq!(ids(pager.snapshot().items()), ["A", "B", "B", "A"]);
    assert_eq!(pager.snapshot().next_cursor(), Some("c2"));
}

#[tokio::test]
async fn failures_keep_pages_until_a_refetch_succeeds() {
    let source = ScriptedPageSource::new();
    source.push_page(item_page(Some("c1"), &["A"]));
    source.push_error("502 Bad Gateway");
    source.push_page(item_page(Some("c1"), &["A2"]));
    let pager = pager(&source);
    pager.observe().await;

    let outcome = pager.fetch_next_page().await;
    let err = match outcome {
        FetchOutcome::Failed(err) => err,
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(err.feed(), FeedKind::ForYou);
    assert!(err.to_string().contains("502 Bad Gateway"));

    let snapshot = pager.snapshot();
    assert!(snapshot.is_error());
    assert_eq!(ids(snapshot.items()), ["A"]);
    assert!(!snapshot.is_fetching());

    assert_eq!(pager.refetch().await, FetchOutcome::Refetched { pages: 1 });
    let snapshot = pager.snapshot();
    assert!(!snapshot.is_error());
    assert_eq!(ids(snapshot.items()), ["A2"]);
}

#[tokio::test]
async fn refetch_discards_a_running_next_page() -> anyhow::Result<()> {
    let source = ScriptedPageSource::new();
    source.push_page(item_page(Some("c1"), &["A"]));
    let gate = source.push_gated();
    source.push_page(item_page(Some("c1"), &["A-fresh"]));
    let pager = pager(&source);
    pager.observe().await;

    let next = tokio::spawn({
        let pager = pager.clone();
        async move { pager.fetch_next_page().await }
    });
    source.wait_for_requests(2).await?;

    assert_eq!(pager.refetch().await, FetchOutcome::Refetched { pages: 1 });
    gate.release(item_page(Some("c2"), &["B-old"]));
    assert!(matches!(next.await?, FetchOutcome::Discarded { .. }));

    assert_eq!(ids(pager.snapshot().items()), ["A-fresh"]);
    assert!(!pager.snapshot().is_fetching());
    Ok(())
}

#[tokio::test]
async fn reset_discards_the_initial_load() -> anyhow::Result<()> {
    let source = ScriptedPageSource::new();
    let gate = source.push_gated();
    let pager = pager(&source);

    let first = tokio::spawn({
        let pager = pager.clone();
        async move { pager.observe().await }
    });
    source.wait_for_requests(1).await?;
    assert!(pager.snapshot().is_loading);

    pager.reset();
    gate.release(item_page(Some("c1"), &["A"]));
    assert!(matches!(first.await?, FetchOutcome::Discarded { .. }));
    assert_eq!(pager.snapshot().item_count(), 0);
    assert!(!pager.is_observed());
    Ok(())
}

#[tokio::test]
async fn later_observations_refresh_only_when_stale() {
    let source = ScriptedPageSource::new();
    source.push_page(item_page(Some("c1"), &["A"]));
    source.push_page(item_page(None, &["B"]));
    source.push_page(item_page(Some("c1"), &["A"]));
    source.push_page(item_page(None, &["B"]));
    let pager = pager(&source);

    assert_eq!(
        pager.on_focus().await,
        FetchOutcome::Skipped(SkipReason::NotObserved)
    );
    pager.observe().await;
    assert_eq!(
        pager.observe().await,
        FetchOutcome::Skipped(SkipReason::Fresh)
    );

    pager.fetch_next_page().await;
    pager.invalidate();
    assert!(pager.is_stale());
    assert_eq!(pager.on_focus().await, FetchOutcome::Refetched { pages: 2 });
    assert_eq!(
        source.requests(),
        vec![
            None,
            Some("c1".to_string()),
            None,
            Some("c1".to_string())
        ]
    );
}

#[tokio::test]
async fn retries_before_reporting_failure() {
    let source = ScriptedPageSource::new();
    source.push_error("timeout");
    source.push_page(item_page(None, &["A"]));
    let pager: CursorPager<ContentItem> = CursorPager::new(
        FeedKind::News,
        source.clone(),
        PagerOptions {
            retry: 1,
            ..options()
        },
    );

    assert_eq!(
        pager.observe().await,
        FetchOutcome::Appended {
            page_index: 0,
            items: 1
        }
    );
    assert_eq!(source.request_count(), 2);

    source.push_error("timeout");
    source.push_error("timeout");
    let outcome = pager.refetch().await;
    assert_eq!(
        outcome,
        FetchOutcome::Failed(FeedError::FetchFailed {
            feed: FeedKind::News,
            message: "timeout".to_string(),
        })
    );
    assert_eq!(ids(pager.snapshot().items()), ["A"]);
}
