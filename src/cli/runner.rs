//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, QueryArgs};
use crate::config::{PageOptions, PaginationConfig};
use crate::error::{Error, Result, ResultExt};
use crate::pagination::{PageResult, Paginator};
use crate::query::{Filter, Projection, QueryEngine, Sort};
use crate::store::{DuckDbStore, MemoryStore};
use crate::types::{positive_integer, JsonValue};
use futures::StreamExt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Query engine behind the CLI, whichever store was selected
type DynEngine = Arc<dyn QueryEngine<Record = JsonValue>>;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Page(query) => self.page(query, config).await,
            Commands::Walk { query, max_pages } => self.walk(query, config, *max_pages).await,
        }
    }

    /// Load pagination defaults
    fn load_config(&self) -> Result<PaginationConfig> {
        match &self.cli.config {
            Some(path) => PaginationConfig::from_file(path),
            None => Ok(PaginationConfig::default()),
        }
    }

    /// Fetch one page
    async fn page(&self, args: &QueryArgs, config: PaginationConfig) -> Result<()> {
        let engine = open_engine(args).await?;
        let filter = parse_filter(args.filter.as_deref())?;
        let options = build_options(args)?;

        let paginator = Paginator::new(engine, config);
        let page = paginator.paginate(&filter, options).await?;
        self.output_page(&page)
    }

    /// Follow the cursor page by page
    async fn walk(
        &self,
        args: &QueryArgs,
        config: PaginationConfig,
        max_pages: Option<usize>,
    ) -> Result<()> {
        let engine = open_engine(args).await?;
        let filter = parse_filter(args.filter.as_deref())?;
        let options = build_options(args)?;

        let paginator = Paginator::new(engine, config);
        let mut pages = std::pin::pin!(paginator.pages(&filter, options));
        let mut count = 0usize;
        let mut records = 0usize;

        while let Some(page) = pages.next().await {
            let page = page?;
            count += 1;
            records += page.len();
            self.output_page(&page)?;

            if max_pages.is_some_and(|max| count >= max) {
                tracing::info!("Stopped after {} pages", count);
                break;
            }
        }

        tracing::info!("Walked {} pages, {} records", count, records);
        Ok(())
    }

    /// Output a page
    fn output_page(&self, page: &PageResult<JsonValue>) -> Result<()> {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(page)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(page)?,
        };
        println!("{rendered}");
        Ok(())
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Open the store selected by `--data` or `--duckdb`
async fn open_engine(args: &QueryArgs) -> Result<DynEngine> {
    if let Some(path) = &args.data {
        let mut store = load_documents(path).await?;
        for (field, source) in parse_relations(&args.relations)? {
            let target = load_documents(Path::new(&source)).await?;
            store = store.with_relation(field, target);
        }
        return Ok(Arc::new(store));
    }

    if let Some(path) = &args.duckdb {
        let table = args
            .table
            .as_deref()
            .ok_or_else(|| Error::config("--duckdb requires --table"))?;
        let mut store = DuckDbStore::open(path, table)?;
        for (field, target) in parse_relations(&args.relations)? {
            store = store.with_relation(field, target);
        }
        return Ok(Arc::new(store));
    }

    Err(Error::config("No data source (use --data or --duckdb)"))
}

/// Load a JSON array of documents into a new memory store
async fn load_documents(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path)?;
    let value: JsonValue = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let JsonValue::Array(documents) = value else {
        return Err(Error::config(format!(
            "{} must contain a JSON array of documents",
            path.display()
        )));
    };

    let store = MemoryStore::new();
    let count = store.insert_many(documents).await?;
    tracing::debug!("Loaded {} documents from {}", count, path.display());
    Ok(store)
}

/// Split `field=source` pairs
fn parse_relations(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((field, source)) if !field.is_empty() && !source.is_empty() => {
                Ok((field.to_string(), source.to_string()))
            }
            _ => Err(Error::config(format!(
                "Invalid relation '{pair}', expected FIELD=SOURCE"
            ))),
        })
        .collect()
}

// ============================================================================
// Options
// ============================================================================

/// Parse the `--filter` argument
fn parse_filter(raw: Option<&str>) -> Result<Filter> {
    let Some(raw) = raw else {
        return Ok(Filter::new());
    };
    let value: JsonValue = serde_json::from_str(raw).context("Invalid filter JSON")?;
    Filter::from_json(&value)
}

/// Build page options from command-line flags
fn build_options(args: &QueryArgs) -> Result<PageOptions> {
    let mut options = PageOptions::new();

    if let Some(key) = &args.key {
        options = options.with_key(key.clone());
    }

    options.limit = args
        .limit
        .as_deref()
        .and_then(|raw| positive_integer(&JsonValue::String(raw.to_string())));

    let sort = args
        .sort
        .iter()
        .map(|pair| Sort::parse_pair(pair))
        .collect::<Result<Sort>>()?;
    options = options.with_sort(sort);

    options.starting_after = args.after.as_deref().map(parse_cursor);
    options.ending_before = args.before.as_deref().map(parse_cursor);
    options.select = args.select.as_deref().map(Projection::parse);
    options.populate.clone_from(&args.populate);

    if args.lean {
        options = options.lean(true);
    }

    Ok(options)
}

/// Read a cursor value as JSON, falling back to a plain string
fn parse_cursor(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}
