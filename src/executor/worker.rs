//! Background query worker
//!
//! Runs queries off the async runtime on blocking threads. Submitting a new
//! query cancels the one in flight, so only the latest request of a view
//! ever delivers rows.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::request::QueryRequest;
use crate::store::TableStore;

use super::errors::{QueryError, QueryResult};
use super::executor::QueryExecutor;
use super::result::QueryResponse;

/// Handle to a submitted query
#[derive(Debug)]
pub struct QueryHandle {
    handle: JoinHandle<QueryResult<QueryResponse>>,
    token: CancellationToken,
}

impl QueryHandle {
    /// Requests cancellation of this query
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for the query to finish
    pub async fn result(self) -> QueryResult<QueryResponse> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(QueryError::Worker(err.to_string())),
        }
    }
}

/// Runs queries against one table, latest request wins
#[derive(Debug)]
pub struct QueryWorker<S> {
    store: Arc<S>,
    config: Arc<EngineConfig>,
    current: Mutex<Option<CancellationToken>>,
}

impl<S> QueryWorker<S>
where
    S: TableStore + Send + Sync + 'static,
{
    /// Creates a worker over a shared store
    pub fn new(store: Arc<S>, config: Arc<EngineConfig>) -> Self {
        Self {
            store,
            config,
            current: Mutex::new(None),
        }
    }

    /// Starts a query, cancelling the previous one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: QueryRequest) -> QueryHandle {
        let token = CancellationToken::new();
        {
            let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(previous) = current.replace(token.clone()) {
                if !previous.is_cancelled() {
                    debug!(table = %request.tablename, "superseding running query");
                }
                previous.cancel();
            }
        }

        let store = Arc::clone(&self.store);
        let config = Arc::clone(&self.config);
        let worker_token = token.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let executor = QueryExecutor::new(store.as_ref(), config.as_ref())?;
            executor.execute(&request, &worker_token)
        });

        QueryHandle { handle, token }
    }

    /// Runs a query to completion
    pub async fn run(&self, request: QueryRequest) -> QueryResult<QueryResponse> {
        self.submit(request).result().await
    }

    /// Cancels the query in flight, if any
    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(token) = current.as_ref() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;
    use crate::store::{Collection, MemoryTable, Record, StoreError, StoreResult};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Blocks every read until released or cancelled
    #[derive(Debug)]
    struct GatedStore {
        schema: TableSchema,
        released: AtomicBool,
    }

    impl GatedStore {
        fn wait(&self, cancel: &CancellationToken) -> StoreResult<()> {
            loop {
                if cancel.is_cancelled() {
                    return Err(StoreError::cancelled());
                }
                if self.released.load(Ordering::Acquire) {
                    return Ok(());
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    impl TableStore for GatedStore {
        fn name(&self) -> &str {
            "gated"
        }
        fn schema(&self) -> &TableSchema {
            &self.schema
        }
        fn count_all(&self) -> StoreResult<usize> {
            Ok(0)
        }
        fn fetch(&self, _: &Collection, cancel: &CancellationToken) -> StoreResult<Vec<Record>> {
            self.wait(cancel)?;
            Ok(Vec::new())
        }
        fn count(&self, _: &Collection, cancel: &CancellationToken) -> StoreResult<usize> {
            self.wait(cancel)?;
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_new_query_supersedes_running_one() {
        let store = Arc::new(GatedStore {
            schema: TableSchema::named("id"),
            released: AtomicBool::new(false),
        });
        let worker = QueryWorker::new(Arc::clone(&store), Arc::new(EngineConfig::default()));

        let first = worker.submit(QueryRequest::new("gated"));
        let second = worker.submit(QueryRequest::new("gated"));

        let err = first.result().await.unwrap_err();
        assert!(err.is_cancelled());

        store.released.store(true, Ordering::Release);
        let response = second.result().await.unwrap();
        assert_eq!(response, QueryResponse::empty());
    }

    #[tokio::test]
    async fn test_explicit_cancel() {
        let store = Arc::new(GatedStore {
            schema: TableSchema::named("id"),
            released: AtomicBool::new(false),
        });
        let worker = QueryWorker::new(store, Arc::new(EngineConfig::default()));

        let handle = worker.submit(QueryRequest::new("gated"));
        worker.cancel();
        assert!(handle.result().await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_run_against_memory_table() {
        let mut table = MemoryTable::new("items", TableSchema::named("id")).unwrap();
        for id in 1..=3 {
            table.insert(json!({"id": id})).unwrap();
        }
        let worker = QueryWorker::new(Arc::new(table), Arc::new(EngineConfig::default()));

        let response = worker.run(QueryRequest::new("items").page(2, 1)).await.unwrap();
        assert_eq!(response.total, 3);
        assert_eq!(response.data, vec![json!({"id": 2})]);
    }
}
