use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use pagedoc_core::{
    BrowserRenderer, Coordinator, CoordinatorOptions, DefaultIngestor, FetchConfig, JsonStateStore, MemoryStateStore,
    Mode, PackRegistryBuilder, StateStore,
};
use tracing_subscriber::EnvFilter;

mod echo;
mod outline;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extraction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModeArg(Mode);

impl FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self(Mode::Auto)),
            "thread" => Ok(Self(Mode::Thread)),
            "article" => Ok(Self(Mode::Article)),
            _ => Err(format!("Invalid mode: {}. Valid options: auto, thread, article", s)),
        }
    }
}

/// Extract a deterministic document tree from a web page, file, or JSON API
#[derive(Parser, Debug)]
#[command(name = "pagedoc")]
#[command(author = "PageDoc Contributors")]
#[command(version)]
#[command(about = "Extract deterministic document trees from web pages and APIs", long_about = None)]
struct Args {
    /// URL to fetch, local file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Extraction mode (auto, thread, article)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    mode: ModeArg,

    /// Print the PageDoc as JSON
    #[arg(long)]
    json: bool,

    /// Print the decision trace (to stderr, or alongside the doc with --json)
    #[arg(long)]
    explain: bool,

    /// Render with the browser before extracting
    #[arg(long)]
    rendered: bool,

    /// Never escalate thin pages to the browser
    #[arg(long)]
    no_fallback: bool,

    /// Drop thread items deeper than this
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Truncate text longer than this many characters
    #[arg(long, value_name = "N")]
    max_length: Option<usize>,

    /// Timeout for the whole run in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Extra pattern pack directory (overrides bundled packs)
    #[arg(long, value_name = "DIR")]
    patterns_dir: Option<PathBuf>,

    /// Domain state file (default: ~/.pagedoc/site-state.json)
    #[arg(long, value_name = "FILE")]
    state_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn state_store(path: Option<PathBuf>) -> Arc<dyn StateStore> {
    match path.or_else(JsonStateStore::default_path) {
        Some(path) => Arc::new(JsonStateStore::open(path)),
        None => Arc::new(MemoryStateStore::new()),
    }
}

#[cfg(feature = "browser")]
fn renderer() -> Arc<dyn BrowserRenderer> {
    Arc::new(pagedoc_core::ChromiumRenderer::new())
}

#[cfg(not(feature = "browser"))]
fn renderer() -> Arc<dyn BrowserRenderer> {
    Arc::new(pagedoc_core::NoopRenderer)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
        echo::print_step(1, 3, "Loading pattern packs");
    }

    let mut builder = PackRegistryBuilder::default().state_store(state_store(args.state_file.clone()));
    if let Some(dir) = &args.patterns_dir {
        builder = builder.custom_dir(dir);
    }
    let mut registry = builder.build();
    let loaded = registry.load_packs().context("Failed to load pattern packs")?;

    if args.verbose {
        eprintln!("  {} {}", "Packs:".dimmed(), loaded.to_string().bright_white());
        eprintln!();
        echo::print_step(2, 3, &format!("Extracting {}", args.input.bright_white()));
    }

    let ingestor = DefaultIngestor::new(FetchConfig { timeout: args.timeout, ..Default::default() });
    let coordinator = Coordinator::new(registry, renderer(), Arc::new(ingestor));

    let options = CoordinatorOptions::new()
        .mode(args.mode.0)
        .rendered(args.rendered)
        .json(args.json)
        .no_fallback(args.no_fallback)
        .max_depth(args.max_depth)
        .max_length(args.max_length)
        .timeout(args.timeout);

    let outcome = coordinator.process(&args.input, &options).await;
    if let Err(e) = coordinator.close().await {
        tracing::warn!("failed to close browser: {}", e);
    }
    let result = outcome.with_context(|| format!("Failed to extract {}", args.input))?;

    if args.verbose {
        eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(result.payload.raw_content.len()).bright_white());
        echo::print_run_details(&result.doc, &result.trace);
        echo::print_step(3, 3, "Writing output");
    }

    if args.json {
        let output = if args.explain {
            serde_json::to_string_pretty(&serde_json::json!({ "doc": result.doc, "trace": result.trace }))
        } else {
            serde_json::to_string_pretty(&result.doc)
        }
        .context("Failed to serialize PageDoc")?;
        println!("{}", output);
    } else {
        print!("{}", outline::render(&result.doc));
        if args.explain {
            let trace = serde_json::to_string_pretty(&result.trace).context("Failed to serialize trace")?;
            eprintln!("{}", trace);
        }
    }

    if args.verbose {
        echo::print_success("Done");
    }

    Ok(())
}
