use std::sync::Arc;
use std::time::Duration;

use lumen_config::LumenConfig;
use lumen_events::FeedEvent;
use lumen_feed_core::{
    FeedEngine, FeedMode, FeedSession, FetchOutcome, IntersectionEntry, ScrollGeometry,
    SimulatedBackend,
};
use lumen_models::{FeedKind, InteractionKind};
use lumen_test_support::mocks::FakePlayer;
use tokio_stream::StreamExt;

const VIEWPORT: f64 = 800.0;

fn engine(config: &LumenConfig) -> (FeedEngine, SimulatedBackend) {
    let backend = SimulatedBackend::with_latency(Duration::ZERO, Duration::ZERO);
    let engine = FeedEngine::new(
        config,
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    );
    (engine, backend)
}

fn recorded(backend: &SimulatedBackend, kind: InteractionKind) -> usize {
    backend
        .interactions()
        .iter()
        .filter(|interaction| interaction.interaction_type == kind)
        .count()
}

#[tokio::test]
async fn scrolling_moves_the_active_item_and_loads_more() -> anyhow::Result<()> {
    let (engine, backend) = engine(&LumenConfig::default());
    let mut session = FeedSession::new(engine.clone());

    assert_eq!(
        session.switch_to(FeedKind::ForYou).await,
        FetchOutcome::Appended {
            page_index: 0,
            items: 5
        }
    );
    engine.store().set_progress(40.0);

    let response = session.on_scroll(&ScrollGeometry::at_item(1, 5, VIEWPORT));
    assert_eq!(response.decision.index_change, Some(1));
    assert!(response.load.is_none());
    assert_eq!(engine.store().active_index(), 1);
    assert!(engine.store().progress().abs() < f64::EPSILON);

    let response = session.on_scroll(&ScrollGeometry::at_item(2, 5, VIEWPORT));
    assert!(response.decision.load_more);
    let Some(load) = response.load else {
        panic!("expected a next-page load");
    };
    assert_eq!(
        load.await?,
        FetchOutcome::Appended {
            page_index: 1,
            items: 5
        }
    );

    let status = engine.status(FeedKind::ForYou);
    assert_eq!(status.pages, 2);
    assert_eq!(status.items, 10);
    assert!(status.has_next_page);
    assert_eq!(backend.page_requests(), 2);
    Ok(())
}

#[tokio::test]
async fn switching_feeds_resets_the_view() {
    let (engine, _backend) = engine(&LumenConfig::default());
    let mut session = FeedSession::new(engine.clone());

    session.switch_to(FeedKind::ForYou).await;
    session.on_scroll(&ScrollGeometry::at_item(1, 5, VIEWPORT));
    assert_eq!(engine.store().active_index(), 1);

    session.switch_to(FeedKind::News).await;
    assert_eq!(session.current(), Some(FeedKind::News));
    assert_eq!(engine.store().active_index(), 0);
    assert_eq!(engine.status(FeedKind::News).items, 2);

    let switches: Vec<_> = engine
        .events()
        .backlog_since(0)
        .into_iter()
        .filter_map(|envelope| match envelope.event {
            FeedEvent::FeedSwitched { from, to } => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        switches,
        vec![
            (None, FeedKind::ForYou),
            (Some(FeedKind::ForYou), FeedKind::News)
        ]
    );

    assert_eq!(
        session.remount().await,
        Some(FetchOutcome::Skipped(lumen_feed_core::SkipReason::Fresh))
    );
}

#[tokio::test]
async fn static_mode_never_requests_more() {
    let mut config = LumenConfig::default();
    config.api.use_mock_data = true;
    let (engine, backend) = engine(&config);
    assert_eq!(engine.mode(), FeedMode::Static);
    let mut session = FeedSession::new(engine);

    session.switch_to(FeedKind::ForYou).await;
    let response = session.on_scroll(&ScrollGeometry::at_item(4, 5, VIEWPORT));
    assert_eq!(response.decision.index_change, Some(4));
    assert!(!response.decision.load_more);
    assert!(response.load.is_none());
    assert_eq!(backend.page_requests(), 1);
}

#[tokio::test]
async fn settled_like_refetches_only_observed_feeds() -> anyhow::Result<()> {
    let (engine, backend) = engine(&LumenConfig::default());
    let mut session = FeedSession::new(engine.clone());
    session.switch_to(FeedKind::ForYou).await;
    let mut events = engine.events().subscribe(None);

    let outcome = session.like("1").await;
    assert!(outcome.flag);
    assert!(engine.store().is_liked("1"));

    let refetched = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(envelope) = events.next().await {
            if let FeedEvent::FeedRefetched { feed, .. } = envelope.event {
                return Some(feed);
            }
        }
        None
    })
    .await?;
    assert_eq!(refetched, Some(FeedKind::ForYou));
    assert!(!engine.news().is_observed());
    assert_eq!(backend.page_requests(), 2);
    assert_eq!(recorded(&backend, InteractionKind::Like), 1);

    let outcome = session.like("1").await;
    assert!(!outcome.flag);
    assert_eq!(recorded(&backend, InteractionKind::Like), 0);
    Ok(())
}

#[tokio::test]
async fn rejected_bookmark_is_rolled_back() {
    let (engine, backend) = engine(&LumenConfig::default());
    let session = FeedSession::new(engine.clone());
    backend.fail_interactions(true);

    let outcome = session.bookmark("3").await;
    assert!(!outcome.flag);
    assert!(outcome.failure.is_some());
    assert!(!engine.store().is_bookmarked("3"));
}

#[tokio::test]
async fn mounted_items_track_views_and_completion() -> anyhow::Result<()> {
    let (engine, backend) = engine(&LumenConfig::default());
    let session = FeedSession::new(engine.clone());

    let mut item = session.track("1");
    assert_eq!(engine.tracker().active_registrations(), 1);
    assert!(item.observe(IntersectionEntry::visible(0.3)).is_none());
    let Some(view) = item.observe(IntersectionEntry::visible(0.8)) else {
        panic!("view should fire above the threshold");
    };
    view.await?;
    assert!(item.observe(IntersectionEntry::visible(1.0)).is_none());
    drop(item);
    assert_eq!(engine.tracker().active_registrations(), 0);
    assert_eq!(recorded(&backend, InteractionKind::View), 1);

    let player = FakePlayer::new();
    let mut driver = session.playback("1", player.clone());
    driver.on_active_changed(true).await;
    assert!(engine.store().is_playing());
    if let Some(complete) = driver.on_time_update(60.0, 60.0) {
        complete.await?;
    }
    assert_eq!(recorded(&backend, InteractionKind::Complete), 1);
    assert_eq!(player.calls(), ["play"]);
    Ok(())
}
