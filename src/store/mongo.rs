//! MongoDB document store
//!
//! Runs each page query as a single `find` round trip. The batch size is
//! set to the page limit so the server exhausts and closes its cursor with
//! the first reply; nothing stays open between pages.

use super::types::{DocumentStore, FindQuery};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::observe::{Observer, QueryEvent};
use crate::types::{doc, document_to_json, Document, JsonValue};
use futures::TryStreamExt;
use mongodb::event::command::CommandEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use std::time::Duration;
use tracing::debug;

/// Document store backed by a MongoDB collection
pub struct MongoStore {
    /// Driver client (cheap to clone, safe to share)
    client: Client,
    /// Collection the pager reads
    collection: Collection<Document>,
    /// Database name (for ping)
    database: String,
    /// `database.collection`
    namespace: String,
    /// Server-side time limit per query
    max_time: Option<Duration>,
}

impl MongoStore {
    /// Connect using `config`
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        Self::connect_observed(config, None).await
    }

    /// Connect and forward driver command events to `observer`
    ///
    /// Driver events include session and heartbeat housekeeping commands;
    /// the observer's exclusion set decides which of them reach hooks.
    pub async fn connect_observed(config: &StoreConfig, observer: Option<Observer>) -> Result<Self> {
        config.validate()?;

        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| Error::connection(format!("Invalid connection URI: {e}")))?;

        options.app_name = Some(config.app_name.clone());
        let connect_timeout = Duration::from_secs(config.connect_timeout_seconds);
        options.connect_timeout = Some(connect_timeout);
        options.server_selection_timeout = Some(connect_timeout);

        let namespace = config.namespace();
        if let Some(observer) = observer {
            options.command_event_handler = Some(command_bridge(observer, namespace.clone()));
        }

        let client = Client::with_options(options)?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        debug!(
            "Connected to {} as '{}' ({})",
            config.masked_uri(),
            config.app_name,
            namespace
        );

        Ok(Self {
            client,
            collection,
            database: config.database.clone(),
            namespace,
            max_time: config.max_time_ms.map(Duration::from_millis),
        })
    }

    /// Close all pooled connections
    ///
    /// Clones of the client share the pool, so this also ends any fetches
    /// still holding the store.
    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>> {
        let mut action = self
            .collection
            .find(query.filter.to_document())
            .sort(query.sort.to_document())
            .limit(i64::from(query.limit))
            .batch_size(query.limit);

        if let Some(max_time) = self.max_time {
            action = action.max_time(max_time);
        }

        let cursor = action.await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    fn namespace(&self) -> String {
        self.namespace.clone()
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("namespace", &self.namespace)
            .field("max_time", &self.max_time)
            .finish_non_exhaustive()
    }
}

/// Translate driver command events into query events
fn command_bridge(observer: Observer, namespace: String) -> EventHandler<CommandEvent> {
    EventHandler::callback(move |event: CommandEvent| match event {
        CommandEvent::Started(e) => {
            let event = QueryEvent::started(
                e.request_id as u64,
                e.command_name,
                namespace.clone(),
                document_to_json(&e.command),
            );
            observer.query_started(&event);
        }
        CommandEvent::Succeeded(e) => {
            let event = QueryEvent::started(
                e.request_id as u64,
                e.command_name,
                namespace.clone(),
                JsonValue::Null,
            )
            .succeeded(document_to_json(&e.reply), e.duration);
            observer.query_succeeded(&event);
        }
        CommandEvent::Failed(e) => {
            let message = e.failure.to_string();
            let kind = Error::from(e.failure).kind();
            let event = QueryEvent::started(
                e.request_id as u64,
                e.command_name,
                namespace.clone(),
                JsonValue::Null,
            )
            .failed_with(kind, message, e.duration);
            observer.query_failed(&event);
        }
        _ => {}
    })
}
