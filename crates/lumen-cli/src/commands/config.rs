use crate::client::{AppContext, CliResult};
use crate::output::{OutputFormat, render_config};

pub(crate) fn handle_config(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    render_config(&ctx.config, format)
}
