//! `otbscribe` binary entry point: parse flags, dispatch to `analyze`/`watch`.

use clap::Parser;
use tracing::{error, info};

use otbscribe_cli::cli::{Cli, Cmd};
use otbscribe_cli::pipeline;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let exit_code = match cli.cmd {
        Cmd::Analyze { opts, input, outdir } => run_analyze(&input, &outdir, &opts).await,
        Cmd::Watch {
            opts,
            inbox,
            outroot,
            poll_interval_secs,
        } => run_watch(&inbox, &outroot, &opts, poll_interval_secs).await,
    };
    std::process::exit(exit_code);
}

async fn run_analyze(
    input: &std::path::Path,
    outdir: &std::path::Path,
    opts: &otbscribe_cli::cli::PipelineOpts,
) -> i32 {
    match pipeline::run(input, outdir, opts).await {
        Ok(game) => {
            info!(
                plies = game.moves.len(),
                key_plies = game.key_plies.len(),
                "analyze complete"
            );
            println!("{}", game.to_pgn());
            0
        }
        Err(e) => {
            error!(error = %e, kind = e.type_name(), "analyze failed");
            1
        }
    }
}

async fn run_watch(
    inbox: &std::path::Path,
    outroot: &std::path::Path,
    opts: &otbscribe_cli::cli::PipelineOpts,
    poll_interval_secs: u64,
) -> i32 {
    let poll_interval = std::time::Duration::from_secs(poll_interval_secs);
    match pipeline::watch(inbox, outroot, opts, poll_interval).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, kind = e.type_name(), "watch failed");
            1
        }
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
