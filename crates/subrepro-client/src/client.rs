use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::cache::{NormalizationPolicy, NormalizedCache};
use crate::documents::Operation;
use crate::error::ClientError;
use crate::transport::{GraphQlRequest, Transport};

/// What a watcher currently sees for its query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryState {
    Loading,
    Ready(Value),
}

impl QueryState {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            QueryState::Loading => None,
            QueryState::Ready(data) => Some(data),
        }
    }
}

pub type QueryWatch = watch::Receiver<QueryState>;

/// The spawned network fetch behind a watch.
pub type FetchHandle = JoinHandle<Result<Value, ClientError>>;

struct Watcher {
    operation: Operation,
    tx: watch::Sender<QueryState>,
}

/// GraphQL client with a normalized cache and live query watchers.
///
/// Every result the client hands out is read back from the cache, so what
/// callers see is exactly what normalization kept.
pub struct CacheClient {
    transport: Arc<dyn Transport>,
    cache: Mutex<NormalizedCache>,
    watchers: Mutex<Vec<Watcher>>,
}

impl CacheClient {
    pub fn new(transport: Arc<dyn Transport>, policy: NormalizationPolicy) -> Self {
        Self {
            transport,
            cache: Mutex::new(NormalizedCache::new(policy)),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Cache-first query.
    #[instrument(skip_all, fields(operation = operation.name))]
    pub async fn query(&self, operation: &Operation) -> Result<Value, ClientError> {
        if let Some(cached) = self.read_query(operation) {
            debug!("cache hit");
            return Ok(cached);
        }
        self.fetch_query(operation).await
    }

    /// Network-only query. The result is written to the cache and returned as
    /// the cache reads it back.
    #[instrument(skip_all, fields(operation = operation.name))]
    pub async fn fetch_query(&self, operation: &Operation) -> Result<Value, ClientError> {
        let data = self
            .transport
            .execute(GraphQlRequest::new(operation, Value::Object(Default::default())))
            .await?;
        self.write_query(operation, &data);
        Ok(self.read_query(operation).unwrap_or(data))
    }

    /// Subscribe to a query's cached result. Starts `Loading` and the fetch
    /// runs on a spawned task, unless the cache can already answer. A failed
    /// fetch is logged and leaves the watcher `Loading`.
    pub fn watch_query(self: &Arc<Self>, operation: Operation) -> QueryWatch {
        self.watch_query_with_fetch(operation).0
    }

    /// [`CacheClient::watch_query`], also handing back the spawned fetch so
    /// the caller can see it fail. No handle when the cache answered.
    pub fn watch_query_with_fetch(
        self: &Arc<Self>,
        operation: Operation,
    ) -> (QueryWatch, Option<FetchHandle>) {
        let cached = self.read_query(&operation);
        let needs_fetch = cached.is_none();
        let initial = cached.map_or(QueryState::Loading, QueryState::Ready);

        let (tx, rx) = watch::channel(initial);
        self.watchers.lock().push(Watcher { operation, tx });

        if !needs_fetch {
            return (rx, None);
        }

        let client = Arc::clone(self);
        let fetch = tokio::spawn(async move {
            let result = client.fetch_query(&operation).await;
            if let Err(e) = &result {
                warn!(operation = operation.name, error = %e, "watched query failed");
            }
            result
        });
        (rx, Some(fetch))
    }

    /// Execute a mutation and normalize its result into the cache.
    #[instrument(skip_all, fields(operation = operation.name))]
    pub async fn mutate(
        &self,
        operation: &Operation,
        variables: Value,
    ) -> Result<Value, ClientError> {
        let data = self
            .transport
            .execute(GraphQlRequest::new(operation, variables))
            .await?;
        self.write_query(operation, &data);
        Ok(data)
    }

    pub fn read_query(&self, operation: &Operation) -> Option<Value> {
        self.cache.lock().read_query(operation)
    }

    /// Write a result into the cache and republish every watcher that can
    /// be answered from it.
    pub fn write_query(&self, operation: &Operation, data: &Value) {
        self.cache.lock().write_query(operation, data);
        self.broadcast();
    }

    /// Cache ids currently stored.
    pub fn entity_ids(&self) -> Vec<String> {
        self.cache.lock().entity_ids()
    }

    fn broadcast(&self) {
        let mut watchers = self.watchers.lock();
        watchers.retain(|w| !w.tx.is_closed());
        for watcher in watchers.iter() {
            if let Some(data) = self.read_query(&watcher.operation) {
                watcher.tx.send_replace(QueryState::Ready(data));
            }
        }
    }
}
