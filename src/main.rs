// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Build the crawl settings, HTTP fetcher and link extractor
// 4. Run the crawl and print the tree
// 5. Exit with proper code (0 = all pages fetched, 1 = some failed or cut short, 2 = error)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - Arc<dyn Trait>: Choosing an implementation at runtime
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;    // src/cli.rs - command-line parsing
mod crawl;  // src/crawl/ - the crawl engine and result tree
mod fetch;  // src/fetch/ - HTTP fetching and link extraction

use std::sync::Arc;
use std::time::Duration;

use clap::Parser; // Parser trait enables the parse() method
use cli::{Cli, ExtractorKind};
use crawl::{CrawlEntry, CrawlReport, CrawlSettings, CrawlSummary, Crawler, QueueOutcome};
use fetch::{HtmlLinkExtractor, HttpFetcher, LinkExtractor, PatternLinkExtractor};

// anyhow::Result is like std::result::Result but simpler for applications
// It lets us return any error type with the ? operator
use anyhow::{Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // Parse command-line arguments into our Cli struct
    // This will automatically handle --help, --version, etc.
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Run our application logic and capture the exit code
    // std::process::exit() terminates the program with the given code
    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so they never mix with the tree (or JSON) on stdout
//
// RUST_LOG wins if it is set, e.g. RUST_LOG=crawl_tree=debug
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// This is the main application logic
// Returns:
//   Ok(0) = every page was fetched
//   Ok(1) = at least one page failed, or the deadline stopped the crawl
//   Err = bad settings or unexpected error
async fn run(cli: &Cli) -> Result<i32> {
    let mut settings =
        CrawlSettings::new(cli.depth, cli.wait_ms, cli.max_concurrent, cli.queue_capacity)?;
    if let Some(secs) = cli.deadline_secs {
        settings = settings.with_deadline(Duration::from_secs(secs));
    }

    let fetcher = HttpFetcher::new(Duration::from_secs(cli.timeout_secs), &cli.user_agent)
        .context("failed to create HTTP client")?;

    let extractor: Arc<dyn LinkExtractor> = match cli.extractor {
        ExtractorKind::Pattern => Arc::new(PatternLinkExtractor::new()),
        ExtractorKind::Html => Arc::new(HtmlLinkExtractor::new()),
    };

    if !cli.json {
        println!("🔍 Crawling: {}", cli.url);
        println!("📊 Max crawl depth: {}", cli.depth);
    }

    let crawler = Crawler::new(settings, Arc::new(fetcher), extractor);
    let report = crawler.run(&cli.url).await;

    let summary = report.root.as_ref().map(CrawlEntry::summary).unwrap_or_default();

    if cli.json {
        print_json(&report, &summary)?;
    } else {
        print_tree(&report, &summary, cli.show_types)?;
    }

    Ok(exit_code(&report, &summary))
}

// 0 only when the crawl ran to completion and every page was fetched
//
// A run cut short by the deadline left pages unfetched, so it is a 1 even
// if everything it did reach succeeded.
fn exit_code(report: &CrawlReport, summary: &CrawlSummary) -> i32 {
    if report.root.is_none() || !report.completed() || summary.failures > 0 {
        1 // Exit code 1 = some pages could not be crawled
    } else {
        0 // Exit code 0 = all good
    }
}

// The JSON document printed with --json
#[derive(Serialize)]
struct JsonReport<'a> {
    completed: bool,
    admitted: usize,
    elapsed_ms: u128,
    summary: &'a CrawlSummary,
    tree: Option<&'a CrawlEntry>,
}

fn print_json(report: &CrawlReport, summary: &CrawlSummary) -> Result<()> {
    let output = JsonReport {
        completed: report.completed(),
        admitted: report.admitted,
        elapsed_ms: report.elapsed.as_millis(),
        summary,
        tree: report.root.as_ref(),
    };
    let json_output = serde_json::to_string_pretty(&output)?;
    println!("{}", json_output);
    Ok(())
}

// Prints the tree as indented text, then a summary
fn print_tree(report: &CrawlReport, summary: &CrawlSummary, show_types: bool) -> Result<()> {
    println!("✅ Done in {:.2?}! Here are your results:\n", report.elapsed);

    match &report.root {
        Some(root) => {
            let mut text = String::new();
            root.write_tree(&mut text, show_types)?;
            print!("{}", text);
        }
        None => println!("⚠️  The starting page was never fetched"),
    }

    println!();
    println!("📊 Summary:");
    println!("   📄 Pages: {}", summary.pages);
    println!("   ❌ Failed: {}", summary.failures);
    println!("   🌳 Deepest level: {}", summary.max_depth);
    if report.outcome == QueueOutcome::DeadlineReached {
        println!("   ⏱️  Stopped at deadline ({} page(s) never finished)", summary.missing);
    }
    Ok(())
}
