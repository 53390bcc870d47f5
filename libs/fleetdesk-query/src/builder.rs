//! Typed query builder
//!
//! Produces a [`SelectQuery`] from typed field references.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetdesk_query::{QueryBuilder, PageRequest, SortDir};
//!
//! let query = QueryBuilder::<LicenseSchema>::new()
//!     .filter(CLIENT_ID.eq(client_id))
//!     .filter(NAME.contains("office"))
//!     .order_by(EXPIRY_DATE, SortDir::Asc)
//!     .page(PageRequest::new(2, 10))
//!     .count_exact()
//!     .build();
//! ```

use crate::page::PageRequest;
use crate::schema::{AsFieldName, Schema};
use crate::{CountMode, NullsOrder, OrderBy, OrderKey, SelectQuery, SortDir, ast::Expr};
use std::marker::PhantomData;

/// Fluent builder for [`SelectQuery`].
///
/// Filters accumulate as a conjunction in the order they are added.
pub struct QueryBuilder<S: Schema> {
    filters: Vec<Expr>,
    order: Vec<OrderKey>,
    page: Option<PageRequest>,
    count: CountMode,
    _phantom: PhantomData<S>,
}

impl<S: Schema> QueryBuilder<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order: Vec::new(),
            page: None,
            count: CountMode::None,
            _phantom: PhantomData,
        }
    }

    /// Append a predicate to the conjunction.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filters.extend(expr.into_conjuncts());
        self
    }

    /// Append a predicate only when one is given.
    #[must_use]
    pub fn filter_opt(self, expr: Option<Expr>) -> Self {
        match expr {
            Some(expr) => self.filter(expr),
            None => self,
        }
    }

    /// Add an order-by clause. Can be called multiple times.
    #[must_use]
    pub fn order_by<F>(self, field: F, dir: SortDir) -> Self
    where
        F: AsFieldName,
    {
        self.order_by_nulls(field, dir, NullsOrder::Default)
    }

    #[must_use]
    pub fn order_by_nulls<F>(mut self, field: F, dir: SortDir, nulls: NullsOrder) -> Self
    where
        F: AsFieldName,
    {
        self.order.push(OrderKey {
            field: field.as_field_name().to_owned(),
            dir,
            nulls,
        });
        self
    }

    #[must_use]
    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn count_exact(mut self) -> Self {
        self.count = CountMode::Exact;
        self
    }

    #[must_use]
    pub fn build(self) -> SelectQuery {
        let mut query = SelectQuery::new().with_count(self.count);
        query.filters = self.filters;
        if !self.order.is_empty() {
            query = query.with_order(OrderBy(self.order));
        }
        if let Some(page) = self.page {
            query = query.with_range(page.range());
        }
        query
    }
}

impl<S: Schema> Default for QueryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::RowRange;
    use crate::schema::FieldRef;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum TicketField {
        Id,
        Owner,
        Title,
        DueOn,
    }

    struct TicketSchema;

    impl Schema for TicketSchema {
        type Field = TicketField;

        fn field_name(field: Self::Field) -> &'static str {
            match field {
                TicketField::Id => "id",
                TicketField::Owner => "owner_id",
                TicketField::Title => "title",
                TicketField::DueOn => "due_on",
            }
        }
    }

    const ID: FieldRef<TicketSchema, uuid::Uuid> = FieldRef::new(TicketField::Id);
    const OWNER: FieldRef<TicketSchema, uuid::Uuid> = FieldRef::new(TicketField::Owner);
    const TITLE: FieldRef<TicketSchema, String> = FieldRef::new(TicketField::Title);
    const DUE_ON: FieldRef<TicketSchema, chrono::NaiveDate> = FieldRef::new(TicketField::DueOn);

    #[test]
    fn empty_builder_has_no_filters_or_range() {
        let q = QueryBuilder::<TicketSchema>::new().build();
        assert!(!q.has_filters());
        assert!(q.order.is_empty());
        assert_eq!(q.range, None);
        assert_eq!(q.count, CountMode::None);
    }

    #[test]
    fn filters_keep_insertion_order() {
        let owner = uuid::Uuid::new_v4();
        let q = QueryBuilder::<TicketSchema>::new()
            .filter(OWNER.eq(owner))
            .filter_opt(None)
            .filter_opt(Some(TITLE.contains("disk")))
            .build();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0].field(), Some("owner_id"));
        assert_eq!(q.filters[1].field(), Some("title"));
    }

    #[test]
    fn page_sets_inclusive_range_and_count() {
        let q = QueryBuilder::<TicketSchema>::new()
            .order_by_nulls(DUE_ON, SortDir::Asc, NullsOrder::Last)
            .order_by(ID, SortDir::Asc)
            .page(PageRequest::new(3, 10))
            .count_exact()
            .build();
        assert_eq!(
            q.range,
            Some(RowRange {
                offset: 20,
                limit: 10
            })
        );
        assert_eq!(q.range.map(|r| r.last()), Some(29));
        assert_eq!(q.count, CountMode::Exact);
        assert_eq!(q.order.to_string(), "due_on asc nulls last, id asc");
    }
}
