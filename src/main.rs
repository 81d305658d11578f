mod analysis;
mod api;
mod app;
mod cache;
mod config;
mod display;
mod error;
mod shell;

use anyhow::Context;
use app::App;
use clap::Parser;
use config::Config;
use display::output::{display_error, display_info, display_success, spawn_event_printer};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "League Draft")]
#[command(about = "Live champion pick suggestions during champion select", long_about = None)]
struct Args {
    /// Number of suggestions per list (default: RECOMMEND_COUNT or 5)
    #[arg(short, long)]
    count: Option<usize>,

    /// Path to the League client lockfile
    #[arg(short, long)]
    lockfile: Option<PathBuf>,

    /// Ignore the cached champion statistics
    #[arg(long)]
    refresh: bool,

    /// Never contact the remote statistics endpoint
    #[arg(long)]
    offline: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(count) = args.count.filter(|c| *c > 0) {
        config.recommend_count = count;
    }
    if args.lockfile.is_some() {
        config.lockfile = args.lockfile;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_message("Loading champion statistics");
    pb.enable_steady_tick(Duration::from_millis(100));
    let started = App::new(config, args.offline, args.refresh);
    pb.finish_and_clear();
    let (mut app, events) = started.context("starting advisor")?;

    match app.warm_up() {
        Ok(count) => display_success(&format!("Loaded statistics for {} champions", count)),
        Err(e) => display_error(&format!("Champion statistics unavailable: {}", e)),
    }

    spawn_event_printer(events, app.tracker());

    match app.connect() {
        Ok(port) => display_success(&format!("Listening for champion select on port {}", port)),
        Err(e) => {
            display_error(&e.to_string());
            display_info("Start the League client, then type 'connect'.");
        }
    }
    display_info("Type 'help' for commands.");

    shell::run(&mut app).context("reading commands")?;
    Ok(())
}
