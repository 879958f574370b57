//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lumen_feed_core::ToggleKind;
use lumen_telemetry::{LoggingConfig, init_logging};

use crate::client::{AppContext, CliResult};
use crate::commands::config::handle_config;
use crate::commands::interact::{ShowArgs, ToggleArgs, handle_show, handle_toggle};
use crate::commands::simulate::{SimulateArgs, handle_simulate};
use crate::output::OutputFormat;

/// Parses CLI arguments and executes the requested command. Returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = AppContext::load(cli.config.as_deref())?;
    if cli.verbose {
        install_logging(&ctx);
    }

    match cli.command {
        Command::Simulate(args) => handle_simulate(&ctx, &args, cli.output).await,
        Command::Like(args) => handle_toggle(&ctx, ToggleKind::Like, &args, cli.output).await,
        Command::Bookmark(args) => {
            handle_toggle(&ctx, ToggleKind::Bookmark, &args, cli.output).await
        }
        Command::Show(args) => handle_show(&args, cli.output).await,
        Command::Config => handle_config(&ctx, cli.output),
    }
}

fn install_logging(ctx: &AppContext) {
    let logging = &ctx.config.logging;
    let config = LoggingConfig {
        level: &logging.level,
        format: logging.format,
        build_sha: option_env!("LUMEN_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: {err}");
    }
}

#[derive(Parser)]
#[command(
    name = "lumen",
    about = "Drive the Lumen feed engine against a simulated backend"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "LUMEN_CONFIG_FILE",
        help = "JSON configuration file; LUMEN_* variables still override it"
    )]
    config: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        short,
        global = true,
        help = "Emit engine logs using the configured level and format"
    )]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mount a feed and scroll through it one item at a time.
    Simulate(SimulateArgs),
    /// Toggle like on an item.
    Like(ToggleArgs),
    /// Toggle bookmark on an item.
    Bookmark(ToggleArgs),
    /// Look up a single item.
    Show(ShowArgs),
    /// Print the effective configuration.
    Config,
}
