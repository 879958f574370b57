//! Scroll simulation: mounts a feed, walks the viewport down one item per
//! step and reports active-item changes and page loads.

use clap::Args;
use lumen_feed_core::{FeedMode, FeedSession, FeedStatus, ScrollGeometry};
use lumen_models::FeedKind;
use serde::Serialize;
use tracing::info;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::{OutputFormat, format_outcome, render_simulation};

#[derive(Args, Debug, Clone)]
pub(crate) struct SimulateArgs {
    #[arg(long, value_parser = parse_feed, default_value = "foryou")]
    pub(crate) feed: FeedKind,
    #[arg(long, default_value_t = 8, help = "Number of one-item scroll steps")]
    pub(crate) steps: usize,
    #[arg(long, default_value_t = 800.0, help = "Viewport height in pixels")]
    pub(crate) viewport: f64,
    #[arg(long, default_value_t = 0, help = "Simulated backend latency")]
    pub(crate) latency_ms: u64,
    #[arg(long = "static", help = "Use built-in data with infinite scroll disabled")]
    pub(crate) static_data: bool,
    #[arg(long, help = "Make every page request fail")]
    pub(crate) fail_pages: bool,
}

fn parse_feed(input: &str) -> Result<FeedKind, String> {
    input.parse().map_err(|err| format!("{err}"))
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrollStep {
    pub(crate) step: usize,
    pub(crate) offset: f64,
    pub(crate) active_index: usize,
    pub(crate) load_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) load: Option<String>,
    pub(crate) items: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct SimulationReport {
    pub(crate) feed: FeedKind,
    pub(crate) mode: FeedMode,
    pub(crate) initial: String,
    pub(crate) steps: Vec<ScrollStep>,
    pub(crate) status: FeedStatus,
    pub(crate) page_requests: usize,
}

pub(crate) async fn handle_simulate(
    ctx: &AppContext,
    args: &SimulateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let report = simulate(ctx, args).await?;
    render_simulation(&report, format)
}

pub(crate) async fn simulate(ctx: &AppContext, args: &SimulateArgs) -> CliResult<SimulationReport> {
    if !args.viewport.is_finite() || args.viewport <= 0.0 {
        return Err(CliError::validation(
            "--viewport must be a positive number of pixels",
        ));
    }

    let backend = AppContext::backend(args.latency_ms);
    backend.fail_pages(args.fail_pages);
    let engine = ctx.engine(&backend, args.static_data);
    let mut session = FeedSession::new(engine.clone());

    let initial = session.switch_to(args.feed).await;
    info!(feed = %args.feed, outcome = ?initial, "feed mounted");

    let mut steps = Vec::with_capacity(args.steps);
    for step in 1..=args.steps {
        let items = engine.status(args.feed).items;
        if items == 0 {
            break;
        }
        let geometry = ScrollGeometry::at_item(step.min(items - 1), items, args.viewport);
        let response = session.on_scroll(&geometry);
        let load = match response.load {
            Some(handle) => Some(format_outcome(&handle.await.map_err(CliError::failure)?)),
            None => None,
        };
        steps.push(ScrollStep {
            step,
            offset: geometry.offset,
            active_index: engine.store().active_index(),
            load_more: response.decision.load_more,
            load,
            items: engine.status(args.feed).items,
        });
    }

    Ok(SimulationReport {
        feed: args.feed,
        mode: engine.mode(),
        initial: format_outcome(&initial),
        steps,
        status: engine.status(args.feed),
        page_requests: backend.page_requests(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_config::LumenConfig;

    fn args(feed: FeedKind) -> SimulateArgs {
        SimulateArgs {
            feed,
            steps: 4,
            viewport: 800.0,
            latency_ms: 0,
            static_data: false,
            fail_pages: false,
        }
    }

    fn context() -> AppContext {
        let mut config = LumenConfig::default();
        config.feeds.retry = 0;
        AppContext::with_config(config)
    }

    #[tokio::test]
    async fn scrolling_to_the_end_loads_another_page() -> anyhow::Result<()> {
        let report = simulate(&context(), &args(FeedKind::ForYou))
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(report.initial, "appended page 0 (5 items)");
        assert_eq!(report.steps[0].active_index, 1);
        assert!(!report.steps[0].load_more);
        assert!(report.steps[1].load_more);
        assert_eq!(
            report.steps[1].load.as_deref(),
            Some("appended page 1 (5 items)")
        );
        assert_eq!(report.status.items, 10);
        assert_eq!(report.page_requests, 2);
        Ok(())
    }

    #[tokio::test]
    async fn static_mode_stops_at_the_built_in_items() -> anyhow::Result<()> {
        let mut args = args(FeedKind::ForYou);
        args.static_data = true;
        args.steps = 6;
        let report = simulate(&context(), &args)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(report.mode, FeedMode::Static);
        assert!(report.steps.iter().all(|step| !step.load_more));
        assert_eq!(report.steps.last().map(|step| step.active_index), Some(4));
        assert_eq!(report.page_requests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_initial_load_reports_the_error() -> anyhow::Result<()> {
        let mut args = args(FeedKind::News);
        args.fail_pages = true;
        let report = simulate(&context(), &args)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert!(report.initial.starts_with("failed:"));
        assert!(report.steps.is_empty());
        assert!(report.status.error.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn rejects_degenerate_viewports() {
        let mut args = args(FeedKind::ForYou);
        args.viewport = 0.0;
        let result = simulate(&context(), &args).await;
        assert!(matches!(result, Err(CliError::Validation(_))));
    }

    #[test]
    fn feed_names_parse() {
        assert_eq!(parse_feed("for-you"), Ok(FeedKind::ForYou));
        assert!(parse_feed("trending").is_err());
    }
}
