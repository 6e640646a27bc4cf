//! Query executor
//!
//! Runs a plan against a `TableStore`.
//!
//! Execution flow:
//! 1. Plan the request (anchor, chained predicates, sort, page)
//! 2. Native sort: count the lazy collection, then fetch the page window
//!    from the store
//! 3. In-memory sort: materialize the filtered rows, sort, count by length,
//!    slice the page
//! 4. Shape rows (inject `*key*` for unnamed-key tables on request)
//!
//! The cancellation token is checked at the lookup, on every scanned row,
//! before the in-memory sort and before the page fetch.

use serde_json::Value;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::planner::{ExplainPlan, PlannerError, QueryPlan, QueryPlanner, SortStrategy};
use crate::request::QueryRequest;
use crate::selection::{RowSelector, Selection};
use crate::store::{IndexKey, IndexTarget, TableStore, WhereClause};

use super::errors::{QueryError, QueryResult};
use super::result::{shape_row, QueryResponse};
use super::sorter::ResultSorter;

fn check(cancel: &CancellationToken) -> QueryResult<()> {
    if cancel.is_cancelled() {
        return Err(QueryError::Cancelled);
    }
    Ok(())
}

/// Query executor over one table
pub struct QueryExecutor<'a, S: TableStore + ?Sized> {
    store: &'a S,
    config: &'a EngineConfig,
}

impl<'a, S: TableStore + ?Sized> QueryExecutor<'a, S> {
    /// Creates a new executor, validating the table schema
    pub fn new(store: &'a S, config: &'a EngineConfig) -> QueryResult<Self> {
        store.schema().validate()?;
        Ok(Self { store, config })
    }

    /// Plans a request against this table
    pub fn plan(&self, request: &QueryRequest) -> QueryResult<QueryPlan> {
        if !request.tablename.is_empty() && request.tablename != self.store.name() {
            return Err(QueryError::UnknownTable(request.tablename.clone()));
        }
        Ok(QueryPlanner::new(self.store.schema(), self.config).plan(request)?)
    }

    /// Explains a request without running it
    pub fn explain(&self, request: &QueryRequest) -> ExplainPlan {
        match self.plan(request) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(QueryError::Planner(err)) => ExplainPlan::from_error(&err),
            Err(other) => ExplainPlan::from_error(&PlannerError::query_invalid(other.to_string())),
        }
    }

    /// Executes a request and returns one page plus the total match count.
    ///
    /// Same request and same data give the same response.
    pub fn execute(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> QueryResult<QueryResponse> {
        let plan = self.plan(request)?;
        check(cancel)?;

        let (records, total) = match &plan.sort {
            SortStrategy::Native(_) => {
                let total = if plan.anchor.is_empty() {
                    0
                } else {
                    self.store.count(plan.collection(), cancel)?
                };
                check(cancel)?;
                let page = plan
                    .collection()
                    .clone()
                    .offset(plan.page.skip)
                    .limit(plan.page.limit);
                (self.store.fetch(&page, cancel)?, total)
            }
            SortStrategy::InMemory(key) => {
                let mut records = self.store.fetch(plan.collection(), cancel)?;
                check(cancel)?;
                ResultSorter::sort(&mut records, key, plan.direction);
                let total = records.len();
                check(cancel)?;
                let page = records
                    .into_iter()
                    .skip(plan.page.skip)
                    .take(plan.page.limit)
                    .collect();
                (page, total)
            }
        };

        let inject = self.injects_key(request.add_unnamed_pk);
        let data: Vec<Value> = records.into_iter().map(|r| shape_row(r, inject)).collect();

        info!(
            table = %plan.table,
            total,
            returned = data.len(),
            native_sort = plan.sort.is_native(),
            "query executed"
        );
        Ok(QueryResponse::new(data, total))
    }

    /// Loads rows by primary key with a single `anyOf` lookup, in key order
    pub fn fetch_by_keys(
        &self,
        keys: Vec<IndexKey>,
        add_unnamed_pk: bool,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<Value>> {
        check(cancel)?;
        let collection = WhereClause::new(IndexTarget::PrimaryKey).any_of(keys);
        let records = self.store.fetch(&collection, cancel)?;
        let inject = self.injects_key(add_unnamed_pk);
        debug!(table = %self.store.name(), rows = records.len(), "rows fetched by key");
        Ok(records.into_iter().map(|r| shape_row(r, inject)).collect())
    }

    /// Loads the rows selected in a page previously returned for this table
    pub fn fetch_selected(
        &self,
        selection: &Selection,
        page: &[Value],
        add_unnamed_pk: bool,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<Value>> {
        let selector = RowSelector::for_schema(self.store.schema());
        let keys = selection.keys(&selector, page)?;
        self.fetch_by_keys(keys, add_unnamed_pk, cancel)
    }

    fn injects_key(&self, requested: bool) -> bool {
        requested && self.store.schema().primary_key.is_unnamed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterMethod};
    use crate::request::SortDirection;
    use crate::schema::{IndexSpec, TableSchema};
    use crate::store::{Collection, MemoryTable, Record, StoreError, StoreResult};
    use serde_json::json;

    fn people() -> MemoryTable {
        let schema = TableSchema::named("id")
            .with_index(IndexSpec::single("age"))
            .with_index(IndexSpec::single("name"));
        let mut table = MemoryTable::new("people", schema).unwrap();
        let rows = [
            json!({"id": 1, "name": "dora", "age": 30}),
            json!({"id": 2, "name": "al", "age": 25}),
            json!({"id": 3, "name": "cy", "age": 30}),
            json!({"id": 4, "name": "bo", "age": 41}),
            json!({"id": 5, "name": "ed"}),
        ];
        for row in rows {
            table.insert(row).unwrap();
        }
        table
    }

    fn ids(response: &QueryResponse) -> Vec<i64> {
        response
            .data
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    }

    fn run(table: &MemoryTable, request: &QueryRequest) -> QueryResult<QueryResponse> {
        let config = EngineConfig::default();
        QueryExecutor::new(table, &config)?.execute(request, &CancellationToken::new())
    }

    #[test]
    fn test_no_filters_returns_everything() {
        let table = people();
        let response = run(&table, &QueryRequest::new("people")).unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(ids(&response), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_index_anchor_with_chained_predicate() {
        let table = people();
        let request = QueryRequest::new("people")
            .with_filter(Filter::new("name", FilterMethod::Contains, "y"))
            .with_filter(Filter::new("age", FilterMethod::Equal, "30").indexed());
        let response = run(&table, &request).unwrap();
        assert_eq!(ids(&response), vec![3]);
        assert_eq!(response.total, 1);
    }

    #[test]
    fn test_native_sort_desc_with_paging() {
        let table = people();
        let request = QueryRequest::new("people")
            .order_by("name", SortDirection::Desc)
            .page(2, 2);
        let response = run(&table, &request).unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(ids(&response), vec![1, 3]);
    }

    #[test]
    fn test_in_memory_sort_when_anchor_differs() {
        let table = people();
        let request = QueryRequest::new("people")
            .with_filter(Filter::new("age", FilterMethod::Above, "20").indexed())
            .order_by("name", SortDirection::Desc)
            .page(1, 3);
        let response = run(&table, &request).unwrap();
        assert_eq!(response.total, 4);
        assert_eq!(ids(&response), vec![1, 3, 4]);
    }

    #[test]
    fn test_native_order_keeps_rows_without_value() {
        let table = people();
        let request = QueryRequest::new("people")
            .with_filter(Filter::new("name", FilterMethod::Contains, "D").case_insensitive())
            .order_by("age", SortDirection::Desc);
        let response = run(&table, &request).unwrap();
        assert_eq!(ids(&response), vec![1, 5]);
        assert_eq!(response.total, 2);
    }

    #[test]
    fn test_native_and_in_memory_order_agree_on_missing_values() {
        let table = people();
        let native = QueryRequest::new("people").order_by("age", SortDirection::Asc);
        let in_memory = QueryRequest::new("people")
            .with_filter(Filter::on_key(FilterMethod::Above, "0"))
            .order_by("age", SortDirection::Asc);

        let config = EngineConfig::default();
        let executor = QueryExecutor::new(&table, &config).unwrap();
        assert!(executor.plan(&native).unwrap().sort.is_native());
        assert!(!executor.plan(&in_memory).unwrap().sort.is_native());

        let native = run(&table, &native).unwrap();
        let in_memory = run(&table, &in_memory).unwrap();
        assert_eq!(native.total, table.count_all().unwrap());
        assert_eq!(ids(&native), vec![2, 1, 3, 4, 5]);
        assert_eq!(ids(&in_memory), ids(&native));
    }

    #[test]
    fn test_contradiction_is_empty_not_error() {
        let table = people();
        let request = QueryRequest::new("people")
            .with_filter(Filter::on_key(FilterMethod::Equal, "1"))
            .with_filter(Filter::on_key(FilterMethod::Equal, "2"));
        let response = run(&table, &request).unwrap();
        assert_eq!(response, QueryResponse::empty());
    }

    #[test]
    fn test_unknown_table() {
        let table = people();
        let err = run(&table, &QueryRequest::new("pets")).unwrap_err();
        assert!(matches!(err, QueryError::UnknownTable(_)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let table = people();
        let config = EngineConfig::default();
        let token = CancellationToken::new();
        token.cancel();
        let err = QueryExecutor::new(&table, &config)
            .unwrap()
            .execute(&QueryRequest::new("people"), &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_unnamed_pk_injection() {
        let mut table = MemoryTable::new("notes", TableSchema::unnamed()).unwrap();
        table.add(json!({"text": "a"})).unwrap();
        table.add(json!("plain")).unwrap();

        let request = QueryRequest::new("notes").with_unnamed_pk();
        let response = run(&table, &request).unwrap();
        assert_eq!(
            response.data,
            vec![
                json!({"text": "a", "*key*": 1}),
                json!({"*key*": 2, "*value*": "plain"}),
            ]
        );

        let plain = run(&table, &QueryRequest::new("notes")).unwrap();
        assert_eq!(plain.data[1], json!("plain"));
    }

    #[test]
    fn test_fetch_selected() {
        let table = people();
        let config = EngineConfig::default();
        let executor = QueryExecutor::new(&table, &config).unwrap();
        let token = CancellationToken::new();
        let page = executor
            .execute(&QueryRequest::new("people").page(1, 3), &token)
            .unwrap()
            .data;

        let selected = executor
            .fetch_selected(&Selection::AllExcept([1].into()), &page, false, &token)
            .unwrap();
        let selected_ids: Vec<i64> = selected.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(selected_ids, vec![1, 3]);
    }

    #[test]
    fn test_explain_unknown_table() {
        let table = people();
        let config = EngineConfig::default();
        let explain = QueryExecutor::new(&table, &config)
            .unwrap()
            .explain(&QueryRequest::new("pets"));
        assert!(!explain.accepted);
    }

    #[derive(Debug)]
    struct FailingStore(TableSchema);

    impl TableStore for FailingStore {
        fn name(&self) -> &str {
            "broken"
        }
        fn schema(&self) -> &TableSchema {
            &self.0
        }
        fn count_all(&self) -> StoreResult<usize> {
            Err(StoreError::read_failed("connection lost"))
        }
        fn fetch(&self, _: &Collection, _: &CancellationToken) -> StoreResult<Vec<Record>> {
            Err(StoreError::read_failed("connection lost"))
        }
        fn count(&self, _: &Collection, _: &CancellationToken) -> StoreResult<usize> {
            Err(StoreError::read_failed("connection lost"))
        }
    }

    #[test]
    fn test_store_errors_propagate() {
        let store = FailingStore(TableSchema::named("id"));
        let config = EngineConfig::default();
        let err = QueryExecutor::new(&store, &config)
            .unwrap()
            .execute(&QueryRequest::new("broken"), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.code(), "SCOPE_STORE_READ_FAILED");
    }
}
