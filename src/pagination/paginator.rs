//! The paginator
//!
//! Binds a [`QueryEngine`] to a [`PaginationConfig`] and runs one query per
//! page.

use super::types::{CursorSource, PagePlan, PageResult};
use crate::config::{PageOptions, PaginationConfig};
use crate::error::{Error, Result};
use crate::query::{Filter, QueryEngine};
use crate::types::SortDirection;
use futures::Stream;

/// Cursor paginator over a query engine
///
/// Holds no mutable state; concurrent calls are independent.
#[derive(Debug, Clone)]
pub struct Paginator<E> {
    engine: E,
    config: PaginationConfig,
}

impl<E: QueryEngine> Paginator<E> {
    /// Create a paginator with the given defaults
    pub fn new(engine: E, config: PaginationConfig) -> Self {
        Self { engine, config }
    }

    /// Create a paginator with the built-in defaults
    pub fn with_defaults(engine: E) -> Self {
        Self::new(engine, PaginationConfig::default())
    }

    /// Collection defaults
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Resolve options and plan the query without running it
    pub fn plan(&self, filter: &Filter, options: PageOptions) -> PagePlan {
        self.config.resolve(filter, options).plan()
    }

    /// Fetch one page
    ///
    /// `filter` is only borrowed; range constraints go into a copy.
    pub async fn paginate(
        &self,
        filter: &Filter,
        options: PageOptions,
    ) -> Result<PageResult<E::Record>> {
        let plan = self.plan(filter, options);
        self.execute(&plan).await
    }

    /// Fetch one page and also hand the outcome to a callback
    ///
    /// `handler` runs exactly once, before the result is returned, and sees
    /// the same payload the caller gets back.
    pub async fn paginate_with<F>(
        &self,
        filter: &Filter,
        options: PageOptions,
        handler: F,
    ) -> Result<PageResult<E::Record>>
    where
        F: FnOnce(std::result::Result<&PageResult<E::Record>, &Error>) + Send,
    {
        let result = self.paginate(filter, options).await;
        handler(result.as_ref());
        result
    }

    /// Run a planned query and reconcile the records into a page
    pub async fn execute(&self, plan: &PagePlan) -> Result<PageResult<E::Record>> {
        tracing::debug!(
            "Fetching page: key={} limit={} reverse={}",
            plan.key,
            plan.limit,
            plan.reverse
        );

        let records = self.engine.find(&plan.query).await.map_err(|e| {
            tracing::warn!("Page query failed: {}", e);
            match e {
                Error::QueryFailure { .. } => e,
                other => Error::query(other.to_string()),
            }
        })?;

        tracing::trace!("Fetched {} records for a page of {}", records.len(), plan.limit);

        Ok(plan.finish(records))
    }

    /// Follow the cursor page after page until no more records remain
    ///
    /// Each page continues from the last record in fetch order: forward
    /// walks use `startingAfter`, backward walks use `endingBefore`. When
    /// the caller does not sort on the key, the walk sorts ascending on it.
    /// A projection always keeps the key. A page that has more records
    /// after it but ends on a record without the key fails the walk.
    pub fn pages<'a>(
        &'a self,
        filter: &'a Filter,
        options: PageOptions,
    ) -> impl Stream<Item = Result<PageResult<E::Record>>> + 'a
    where
        E::Record: CursorSource,
    {
        let mut options = options;
        let key = options
            .key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.config.key.clone());
        if options.sort.get(&key).is_none() {
            options.sort.set(&key, SortDirection::Ascending);
        }
        options.select = options.select.map(|select| select.keeping(&key));

        futures::stream::unfold(Walk::Next(options), move |state| async move {
            let options = match state {
                Walk::Next(options) => options,
                Walk::Failed(e) => return Some((Err(e), Walk::Done)),
                Walk::Done => return None,
            };
            let plan = self.plan(filter, options.clone());

            match self.execute(&plan).await {
                Err(e) => Some((Err(e), Walk::Done)),
                Ok(page) if !page.has_more => Some((Ok(page), Walk::Done)),
                Ok(page) => {
                    let next = match next_options(&plan, &page, options) {
                        Ok(next) => Walk::Next(next),
                        Err(e) => Walk::Failed(e),
                    };
                    Some((Ok(page), next))
                }
            }
        })
    }
}

/// State of a page walk between pages
enum Walk {
    Next(PageOptions),
    Failed(Error),
    Done,
}

/// Options for the page that follows `page` in the direction `plan` fetched
fn next_options<T: CursorSource>(
    plan: &PagePlan,
    page: &PageResult<T>,
    mut options: PageOptions,
) -> Result<PageOptions> {
    let boundary = if plan.reverse {
        page.items.first()
    } else {
        page.items.last()
    };
    let value = boundary
        .and_then(|record| record.cursor_value(&plan.key))
        .ok_or_else(|| {
            Error::query(format!(
                "page walk needs key '{}' in every record",
                plan.key
            ))
        })?;

    if plan.fetch_direction() == Some(SortDirection::Descending) {
        options.starting_after = None;
        options.ending_before = Some(value);
    } else {
        options.starting_after = Some(value);
        options.ending_before = None;
    }

    Ok(options)
}
