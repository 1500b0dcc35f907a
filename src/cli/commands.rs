//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keyset pagination over JSON documents and DuckDB tables
#[derive(Parser, Debug)]
#[command(name = "cursor-paginate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pagination defaults file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a single page
    Page(QueryArgs),

    /// Follow the cursor until the last page
    Walk {
        #[command(flatten)]
        query: QueryArgs,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },
}

/// Data source and page options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// JSON file holding an array of documents
    #[arg(short, long, conflicts_with = "duckdb", required_unless_present = "duckdb")]
    pub data: Option<PathBuf>,

    /// DuckDB database file
    #[arg(long, requires = "table")]
    pub duckdb: Option<PathBuf>,

    /// Table to page through (with --duckdb)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Relation as `field=source`: a JSON file with --data, a table with --duckdb
    #[arg(long = "relation", value_name = "FIELD=SOURCE")]
    pub relations: Vec<String>,

    /// Filter as Mongo-style JSON, e.g. '{"age": {"$gte": 18}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort/cursor field
    #[arg(short, long)]
    pub key: Option<String>,

    /// Page size (anything that is not a positive whole number uses the default)
    #[arg(short, long)]
    pub limit: Option<String>,

    /// Sort as `field:asc|desc` (repeatable)
    #[arg(short, long = "sort", value_name = "FIELD:DIR")]
    pub sort: Vec<String>,

    /// Return records after this key value (JSON, or a bare string)
    #[arg(long)]
    pub after: Option<String>,

    /// Return records before this key value (JSON, or a bare string)
    #[arg(long)]
    pub before: Option<String>,

    /// Fields to return, e.g. "name value -_id"
    #[arg(long)]
    pub select: Option<String>,

    /// Relations to expand (repeatable)
    #[arg(long)]
    pub populate: Vec<String>,

    /// Return plain records without the `id` virtual
    #[arg(long)]
    pub lean: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one page per line)
    Json,
    /// Human-readable output
    Pretty,
}
