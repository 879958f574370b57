//! Optimistic like/bookmark toggles and item lookup.

use clap::Args;
use lumen_events::MutationResolution;
use lumen_feed_core::{FeedClient, FeedSession, ToggleKind};
use serde::Serialize;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::{OutputFormat, render_item, render_toggle};

#[derive(Args, Debug, Clone)]
pub(crate) struct ToggleArgs {
    #[arg(help = "Content item identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Make the remote interaction call fail")]
    pub(crate) fail: bool,
    #[arg(long, default_value_t = 0, help = "Simulated backend latency")]
    pub(crate) latency_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ShowArgs {
    #[arg(help = "Content item identifier")]
    pub(crate) id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToggleReport {
    pub(crate) content_id: String,
    pub(crate) kind: String,
    pub(crate) sequence: u64,
    pub(crate) resolution: MutationResolution,
    pub(crate) flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) events: Vec<&'static str>,
}

pub(crate) async fn handle_toggle(
    ctx: &AppContext,
    kind: ToggleKind,
    args: &ToggleArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let report = toggle(ctx, kind, args).await?;
    render_toggle(&report, format)?;
    match report.resolution {
        MutationResolution::Committed => Ok(()),
        MutationResolution::RolledBack | MutationResolution::Superseded => {
            Err(CliError::failure(anyhow::anyhow!(
                report
                    .error
                    .unwrap_or_else(|| format!("{kind} was not applied"))
            )))
        }
    }
}

pub(crate) async fn toggle(
    ctx: &AppContext,
    kind: ToggleKind,
    args: &ToggleArgs,
) -> CliResult<ToggleReport> {
    if args.id.trim().is_empty() {
        return Err(CliError::validation("content id cannot be empty"));
    }
    let backend = AppContext::backend(args.latency_ms);
    backend.fail_interactions(args.fail);
    let engine = ctx.engine(&backend, false);
    let session = FeedSession::new(engine.clone());
    let mark = engine.events().last_event_id().unwrap_or(0);

    let outcome = match kind {
        ToggleKind::Like => session.like(&args.id).await,
        ToggleKind::Bookmark => session.bookmark(&args.id).await,
    };
    Ok(ToggleReport {
        content_id: outcome.content_id,
        kind: kind.to_string(),
        sequence: outcome.sequence,
        resolution: outcome.resolution,
        flag: outcome.flag,
        error: outcome.failure.map(|err| err.to_string()),
        events: engine
            .events()
            .backlog_since(mark)
            .into_iter()
            .map(|envelope| envelope.event.kind())
            .collect(),
    })
}

pub(crate) async fn handle_show(args: &ShowArgs, format: OutputFormat) -> CliResult<()> {
    let backend = AppContext::backend(0);
    let item = backend
        .fetch_content_item(&args.id)
        .await
        .map_err(CliError::failure)?;
    render_item(&item, format)
}
