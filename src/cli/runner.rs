//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_dotenv, PagerConfig};
use crate::error::Result;
use crate::fetch::{Page, PageFetcher, PageSource, FIND_OPERATION};
use crate::observe::{Observer, TracingHook};
use crate::pagination::{PaginationDriver, PaginationState};
use crate::policy::{RateLimited, Retrying};
use crate::state::CheckpointManager;
use crate::store::{DocumentStore, MongoStore};
use crate::types::{document_to_json, Key, KeyType};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
#[derive(Debug)]
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command against the configured MongoDB collection
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let observer = Self::build_observer(&config);

        let wire_observer = config.observability.wire_events.then(|| {
            // Page queries are already reported by the fetcher
            let mut excluded = config.observability.excluded_operations.clone();
            excluded.push(FIND_OPERATION.to_string());
            observer.clone().with_excluded(excluded)
        });

        let store = Arc::new(MongoStore::connect_observed(&config.store, wire_observer).await?);
        let result = self.execute(&config, store.clone(), observer).await;
        store.shutdown().await;
        result
    }

    /// Run the CLI command against an already connected store
    pub async fn execute(
        &self,
        config: &PagerConfig,
        store: Arc<dyn DocumentStore>,
        observer: Observer,
    ) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check(config, store.as_ref()).await,
            Commands::Fetch {
                after,
                key_type,
                limit,
            } => {
                let fetcher = PageFetcher::from_settings(store, &config.pagination, observer);
                let limit = limit.unwrap_or(config.pagination.page_size);
                self.fetch(&fetcher, after.as_deref(), *key_type, limit).await
            }
            Commands::Walk {
                limit,
                max_pages,
                resume,
            } => {
                let fetcher = PageFetcher::from_settings(store, &config.pagination, observer);
                let limit = limit.unwrap_or(config.pagination.page_size);
                self.walk(config, fetcher, limit, *max_pages, *resume).await
            }
        }
    }

    /// Load the config file (if any), overlay the environment and validate
    ///
    /// A `.env` file found from the working directory is loaded into the
    /// environment before the overlay.
    pub fn load_config(&self) -> Result<PagerConfig> {
        if let Some(path) = load_dotenv(None)? {
            debug!("Loaded environment from {}", path.display());
        }

        let mut config = match &self.cli.config {
            Some(path) => PagerConfig::from_file(path)?,
            None => PagerConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Observer that logs queries through tracing when enabled
    pub fn build_observer(config: &PagerConfig) -> Observer {
        Observer::from_config(&config.observability, Arc::new(TracingHook::new()))
    }

    /// Ping the store
    async fn check(&self, config: &PagerConfig, store: &dyn DocumentStore) -> Result<()> {
        let namespace = store.namespace();
        info!("Checking connection to {}", config.store.masked_uri());

        match store.ping().await {
            Ok(()) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "status": "SUCCEEDED",
                    "namespace": namespace,
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "status": "FAILED",
                    "namespace": namespace,
                    "kind": e.kind().as_str(),
                    "message": e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// Fetch a single page
    async fn fetch(
        &self,
        fetcher: &PageFetcher,
        after: Option<&str>,
        key_type: KeyType,
        limit: u32,
    ) -> Result<()> {
        let cursor = after
            .map(|input| Key::parse_as(input, key_type))
            .transpose()?;
        let page = fetcher.fetch(cursor.as_ref(), limit).await?;
        self.output_message(&page_message(&fetcher.namespace(), cursor.as_ref(), &page));
        Ok(())
    }

    /// Walk the collection, checkpointing after every page
    async fn walk(
        &self,
        config: &PagerConfig,
        fetcher: PageFetcher,
        limit: u32,
        max_pages: Option<u64>,
        resume: bool,
    ) -> Result<()> {
        let namespace = fetcher.namespace();
        let checkpoints = match &self.cli.state {
            Some(path) => CheckpointManager::from_file(path)?,
            None => CheckpointManager::in_memory(),
        };

        let source = Self::build_source(config, fetcher);
        let mut driver = PaginationDriver::new(source, limit);
        if resume {
            if let Some(state) = checkpoints.resume_state(&namespace).await {
                debug!("Resuming {} after {:?}", namespace, state.cursor);
                driver = driver.resume(state);
            }
        }

        let mut walked = 0u64;
        while max_pages.map_or(true, |max| walked < max) {
            let cursor = driver.cursor().cloned();
            let next = driver.next_page().await;
            checkpoints.record(&namespace, driver.state()).await?;

            let Some(page) = next? else {
                break;
            };
            self.output_message(&page_message(&namespace, cursor.as_ref(), &page));
            walked += 1;
        }

        self.output_message(&summary_message(&namespace, driver.state()));
        Ok(())
    }

    /// Layer the configured retry and rate limit policies over the fetcher
    fn build_source(config: &PagerConfig, fetcher: PageFetcher) -> Arc<dyn PageSource> {
        match &config.rate_limit {
            Some(rate_limit) => Arc::new(Retrying::new(
                RateLimited::new(fetcher, rate_limit),
                &config.retry,
            )),
            None => Arc::new(Retrying::new(fetcher, &config.retry)),
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// One page as an output message
pub fn page_message(namespace: &str, after: Option<&Key>, page: &Page) -> Value {
    let documents: Vec<Value> = page.iter().map(document_to_json).collect();
    json!({
        "type": "PAGE",
        "namespace": namespace,
        "after": after.map(ToString::to_string),
        "count": page.len(),
        "last_key": page.last_key().map(ToString::to_string),
        "documents": documents,
    })
}

/// Walk totals as an output message
pub fn summary_message(namespace: &str, state: &PaginationState) -> Value {
    json!({
        "type": "SUMMARY",
        "namespace": namespace,
        "pages": state.pages,
        "documents": state.documents,
        "cursor": state.cursor.as_ref().map(ToString::to_string),
        "exhausted": state.is_exhausted(),
    })
}
