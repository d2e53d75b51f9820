// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Enums: Types that can be one of several variants
// - Derive macros: Automatically generate code for our types
// =============================================================================

use clap::{Parser, ValueEnum};

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "crawl-tree",
    version = "0.1.0",
    about = "Recursively crawl a website and print the tree of pages it links to",
    long_about = "crawl-tree fetches a page, follows every link it finds, and keeps going \
                  down to a maximum depth. Each URL is visited once. The result is printed \
                  as a tree that shows where every page (and every failure) was found."
)]
pub struct Cli {
    /// URL to start crawling from (e.g., https://example.com)
    ///
    /// This is a positional argument (required, no flag needed)
    pub url: String,

    /// Maximum crawl depth (default: 1)
    ///
    /// Depth 0 = just the starting page
    /// Depth 1 = starting page + all pages it links to
    /// etc.
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Milliseconds to pause after each request (politeness delay)
    #[arg(long, default_value_t = 0)]
    pub wait_ms: u64,

    /// How many requests may be in progress at the same time
    #[arg(long, default_value_t = 8)]
    pub max_concurrent: usize,

    /// How many discovered pages may wait in the queue before discovery slows down
    #[arg(long, default_value_t = 64)]
    pub queue_capacity: usize,

    /// Timeout for a single request, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Stop the whole crawl after this many seconds and print what was found
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long, default_value = concat!("crawl-tree/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// How links are found in a page
    #[arg(long, value_enum, default_value_t = ExtractorKind::Pattern)]
    pub extractor: ExtractorKind,

    /// Output the tree in JSON format instead of indented text
    #[arg(long)]
    pub json: bool,

    /// Show each page's content type next to its URL
    #[arg(long)]
    pub show_types: bool,

    /// Print debug logs to stderr (RUST_LOG overrides this)
    #[arg(short, long)]
    pub verbose: bool,
}

// The two ways of finding links
//
// #[derive(ValueEnum)] lets clap accept "pattern" or "html" for --extractor
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractorKind {
    /// Match href="...", src="..." and action="..." with a regular expression
    Pattern,
    /// Parse the page as HTML and read link attributes from the DOM
    Html,
}
