//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use clap::ValueEnum;
use lumen_config::LumenConfig;
use lumen_feed_core::{FetchOutcome, SkipReason};
use lumen_models::ContentItem;
use serde::Serialize;

use crate::client::{CliError, CliResult};
use crate::commands::interact::ToggleReport;
use crate::commands::simulate::SimulationReport;

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_simulation(report: &SimulationReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("feed: {} ({:?})", report.feed, report.mode);
            println!("initial: {}", report.initial);
            println!(
                "{:>4} {:>9} {:>6} {:>5} {:>6} LOAD",
                "STEP", "OFFSET", "ACTIVE", "MORE", "ITEMS"
            );
            for step in &report.steps {
                println!(
                    "{:>4} {:>9.0} {:>6} {:>5} {:>6} {}",
                    step.step,
                    step.offset,
                    step.active_index,
                    yes_no(step.load_more),
                    step.items,
                    step.load.as_deref().unwrap_or("-")
                );
            }
            let status = &report.status;
            println!(
                "pages: {} / items: {} / next page: {}",
                status.pages,
                status.items,
                yes_no(status.has_next_page)
            );
            if let Some(error) = &status.error {
                println!("error: {error}");
            }
            println!("page requests: {}", report.page_requests);
        }
    }
    Ok(())
}

pub(crate) fn render_toggle(report: &ToggleReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("content: {}", report.content_id);
            println!("interaction: {}", report.kind);
            println!("resolution: {:?}", report.resolution);
            println!("flag: {}", report.flag);
            if let Some(error) = &report.error {
                println!("error: {error}");
            }
            println!("events: {}", report.events.join(", "));
        }
    }
    Ok(())
}

pub(crate) fn render_item(item: &ContentItem, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(item)?,
        OutputFormat::Table => {
            println!("id: {}", item.id);
            println!("type: {:?}", item.kind);
            if let Some(title) = &item.title {
                println!("title: {title}");
            }
            if let Some(author) = &item.author {
                println!("author: {author}");
            }
            if let Some(duration) = item.duration_sec {
                println!("duration: {duration}s");
            }
            println!(
                "likes: {} / comments: {} / shares: {}",
                item.like_count, item.comment_count, item.share_count
            );
            println!("published: {}", item.published_at);
        }
    }
    Ok(())
}

pub(crate) fn render_config(config: &LumenConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            println!("api url: {}", config.api.base_url);
            println!("mock data: {}", yes_no(config.api.use_mock_data));
            println!(
                "page sizes: for you {} / news {} / bookmarks {}",
                config.feeds.for_you_page_size,
                config.feeds.news_page_size,
                config.feeds.bookmarks_page_size
            );
            println!(
                "stale after: {}s / retries: {} (base delay {}ms)",
                config.feeds.stale_time_secs, config.feeds.retry, config.feeds.retry_delay_ms
            );
            println!(
                "view threshold: {} / track once: {}",
                config.tracking.view_threshold,
                yes_no(config.tracking.track_once)
            );
            println!(
                "rewind: {}s / default speed: {}x",
                config.playback.rewind_secs, config.playback.default_speed
            );
            println!(
                "log level: {} ({:?})",
                config.logging.level, config.logging.format
            );
        }
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_outcome(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Appended { page_index, items } => {
            format!("appended page {page_index} ({items} items)")
        }
        FetchOutcome::Refetched { pages } => format!("refetched {pages} page(s)"),
        FetchOutcome::Skipped(reason) => format!("skipped: {}", skip_reason(*reason)),
        FetchOutcome::Discarded { epoch } => format!("discarded stale result (epoch {epoch})"),
        FetchOutcome::Failed(err) => format!("failed: {err}"),
    }
}

const fn skip_reason(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::InFlight => "fetch already in flight",
        SkipReason::NoNextPage => "no next page",
        SkipReason::Fresh => "data still fresh",
        SkipReason::NotObserved => "feed not observed",
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
