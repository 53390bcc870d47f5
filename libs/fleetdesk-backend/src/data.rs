use async_trait::async_trait;
use fleetdesk_query::ast::{CompareOperator, Expr, Value};
use fleetdesk_query::{CountMode, RowRange, SelectQuery};
use fleetdesk_security::SecurityContext;
use uuid::Uuid;

use crate::error::BackendError;
use crate::realtime::ChangeSubscription;

/// A raw backend row.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectResult {
    pub rows: Vec<Row>,
    /// Present when the query asked for an exact count.
    pub total_count: Option<u64>,
}

/// Tables and views of the hosted database.
///
/// Row-level authorization is enforced by the backend itself; callers still
/// add their own scope filters so that a misconfigured backend cannot widen
/// what a restricted identity sees.
#[async_trait]
pub trait DataBackend: Send + Sync {
    async fn select(
        &self,
        ctx: &SecurityContext,
        view: &str,
        query: &SelectQuery,
    ) -> Result<SelectResult, BackendError>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, ctx: &SecurityContext, table: &str, row: Row)
    -> Result<Row, BackendError>;

    /// Delete one row by primary key.
    ///
    /// # Errors
    /// `BackendError::NotFound` when no row was deleted.
    async fn delete(&self, ctx: &SecurityContext, table: &str, id: Uuid)
    -> Result<(), BackendError>;

    /// Subscribe to row changes on `table`.
    fn subscribe(&self, table: &str) -> ChangeSubscription;

    /// Single-row fetch: `id` equality plus any extra predicates, limit 1.
    async fn select_by_id(
        &self,
        ctx: &SecurityContext,
        view: &str,
        id: Uuid,
        extra: Vec<Expr>,
    ) -> Result<Option<Row>, BackendError> {
        let mut query = SelectQuery::new()
            .with_range(RowRange {
                offset: 0,
                limit: 1,
            })
            .with_count(CountMode::None);
        query.filters = extra;
        query
            .filters
            .push(Expr::Compare("id".to_owned(), CompareOperator::Eq, Value::Uuid(id)));
        let result = self.select(ctx, view, &query).await?;
        Ok(result.rows.into_iter().next())
    }
}
