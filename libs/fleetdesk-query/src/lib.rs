#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Query model shared by the Fleetdesk data layer.
//!
//! A [`SelectQuery`] describes one read against a backend view: a conjunction of
//! filter expressions, a deterministic ordering, an optional row range and the
//! count mode. Backends translate it into their own wire format.
pub mod builder;
pub mod limits;
pub mod page;
pub mod schema;

pub use builder::QueryBuilder;
pub use limits::QueryLimits;
pub use page::{Page, PageRequest, total_pages};
pub use schema::{FieldRef, Schema};

pub mod ast {
    use chrono::{DateTime, NaiveDate, Utc};
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Expr {
        /// All inner expressions must hold.
        And(Vec<Expr>),
        Compare(String, CompareOperator, Value),
        /// Case-insensitive substring match.
        Contains(String, String),
        IsNotNull(String),
    }

    impl Expr {
        /// Combine two expressions with AND, flattening nested conjunctions.
        ///
        /// # Example
        ///
        /// ```rust,ignore
        /// let filter = STATUS.eq("active").and(NAME.contains("office"));
        /// ```
        #[must_use]
        pub fn and(self, other: Expr) -> Expr {
            let mut parts = match self {
                Expr::And(parts) => parts,
                single => vec![single],
            };
            match other {
                Expr::And(more) => parts.extend(more),
                single => parts.push(single),
            }
            Expr::And(parts)
        }

        /// Flatten into the list of leaf predicates of this conjunction.
        #[must_use]
        pub fn into_conjuncts(self) -> Vec<Expr> {
            match self {
                Expr::And(parts) => parts.into_iter().flat_map(Expr::into_conjuncts).collect(),
                leaf => vec![leaf],
            }
        }

        /// Field the predicate applies to, `None` for conjunctions.
        #[must_use]
        pub fn field(&self) -> Option<&str> {
            match self {
                Expr::And(_) => None,
                Expr::Compare(field, _, _) | Expr::Contains(field, _) | Expr::IsNotNull(field) => {
                    Some(field)
                }
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum CompareOperator {
        Eq,
        Ne,
        Gt,
        Ge,
        Lt,
        Le,
    }

    impl CompareOperator {
        /// PostgREST operator token.
        #[must_use]
        pub fn as_str(self) -> &'static str {
            match self {
                CompareOperator::Eq => "eq",
                CompareOperator::Ne => "neq",
                CompareOperator::Gt => "gt",
                CompareOperator::Ge => "gte",
                CompareOperator::Lt => "lt",
                CompareOperator::Le => "lte",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    pub enum Value {
        Null,
        Bool(bool),
        Number(i64),
        Uuid(Uuid),
        DateTime(DateTime<Utc>),
        Date(NaiveDate),
        String(String),
    }

    impl Value {
        /// Render the value the way it appears in a filter parameter.
        #[must_use]
        pub fn to_wire_string(&self) -> String {
            match self {
                Value::Null => "null".to_owned(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Uuid(u) => u.to_string(),
                Value::DateTime(dt) => dt.to_rfc3339(),
                Value::Date(d) => d.format("%Y-%m-%d").to_string(),
                Value::String(s) => s.clone(),
            }
        }

        /// JSON representation, used when evaluating filters against raw rows.
        #[must_use]
        pub fn to_json(&self) -> serde_json::Value {
            match self {
                Value::Null => serde_json::Value::Null,
                Value::Bool(b) => serde_json::Value::Bool(*b),
                Value::Number(n) => serde_json::Value::from(*n),
                other => serde_json::Value::String(other.to_wire_string()),
            }
        }
    }

    impl std::fmt::Display for Value {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Value::Null => write!(f, "null"),
                Value::Bool(_) => write!(f, "bool"),
                Value::Number(_) => write!(f, "number"),
                Value::Uuid(_) => write!(f, "uuid"),
                Value::DateTime(_) => write!(f, "datetime"),
                Value::Date(_) => write!(f, "date"),
                Value::String(_) => write!(f, "string"),
            }
        }
    }
}

// Ordering primitives
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDir {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// Placement of NULL values in an ordered column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsOrder {
    /// Backend default (PostgreSQL: last for ASC, first for DESC).
    #[default]
    Default,
    First,
    Last,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub dir: SortDir,
    pub nulls: NullsOrder,
}

impl OrderKey {
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            dir: SortDir::Asc,
            nulls: NullsOrder::Default,
        }
    }

    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            dir: SortDir::Desc,
            nulls: NullsOrder::Default,
        }
    }

    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullsOrder::Last;
        self
    }

    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullsOrder::First;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct OrderBy(pub Vec<OrderKey>);

impl OrderBy {
    pub fn empty() -> Self {
        Self(vec![])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn then(mut self, key: OrderKey) -> Self {
        self.0.push(key);
        self
    }

    /// Append tiebreaker if missing
    pub fn ensure_tiebreaker(mut self, tiebreaker: &str, dir: SortDir) -> Self {
        if !self.0.iter().any(|k| k.field == tiebreaker) {
            self.0.push(OrderKey {
                field: tiebreaker.to_owned(),
                dir,
                nulls: NullsOrder::Default,
            });
        }
        self
    }
}

impl std::fmt::Display for OrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(none)");
        }

        let formatted: Vec<String> = self
            .0
            .iter()
            .map(|key| match key.nulls {
                NullsOrder::Default => format!("{} {}", key.field, key.dir.as_str()),
                NullsOrder::First => format!("{} {} nulls first", key.field, key.dir.as_str()),
                NullsOrder::Last => format!("{} {} nulls last", key.field, key.dir.as_str()),
            })
            .collect();

        write!(f, "{}", formatted.join(", "))
    }
}

/// Unified error type for query construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("page must be >= 1, got {0}")]
    InvalidPage(u64),

    #[error("limit must be between 1 and {max}, got {got}")]
    InvalidLimit { got: u64, max: u64 },

    #[error("too many order keys: {got} (max {max})")]
    TooManyOrderKeys { got: usize, max: usize },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

/// Inclusive row range `[offset, offset + limit - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowRange {
    pub offset: u64,
    pub limit: u64,
}

impl RowRange {
    /// Last row index covered by this range (inclusive).
    #[must_use]
    pub fn last(&self) -> u64 {
        (self.offset + self.limit).saturating_sub(1)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CountMode {
    #[default]
    None,
    /// Ask the backend for the exact number of matching rows.
    Exact,
}

/// Single read against a backend view.
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct SelectQuery {
    /// Conjunction of predicates, applied in order.
    pub filters: Vec<ast::Expr>,
    pub order: OrderBy,
    pub range: Option<RowRange>,
    pub count: CountMode,
    pub select: Option<Vec<String>>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, expr: ast::Expr) -> Self {
        self.filters.extend(expr.into_conjuncts());
        self
    }

    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    pub fn with_range(mut self, range: RowRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_count(mut self, count: CountMode) -> Self {
        self.count = count;
        self
    }

    pub fn with_select(mut self, fields: Vec<String>) -> Self {
        self.select = Some(fields);
        self
    }

    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::ast::{CompareOperator, Expr, Value};
    use super::*;

    fn eq(field: &str, v: &str) -> Expr {
        Expr::Compare(field.to_owned(), CompareOperator::Eq, Value::String(v.to_owned()))
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let e = eq("a", "1").and(eq("b", "2")).and(eq("c", "3").and(eq("d", "4")));
        let Expr::And(parts) = e else {
            panic!("expected conjunction");
        };
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[3].field(), Some("d"));
    }

    #[test]
    fn with_filter_preserves_order() {
        let q = SelectQuery::new()
            .with_filter(eq("client_id", "x"))
            .with_filter(eq("status", "active").and(Expr::Contains("name".into(), "off".into())));
        let fields: Vec<_> = q.filters.iter().filter_map(Expr::field).collect();
        assert_eq!(fields, vec!["client_id", "status", "name"]);
    }

    #[test]
    fn row_range_is_inclusive() {
        let r = RowRange {
            offset: 10,
            limit: 10,
        };
        assert_eq!(r.last(), 19);
    }

    #[test]
    fn ensure_tiebreaker_is_idempotent() {
        let order = OrderBy::empty()
            .then(OrderKey::asc("name"))
            .ensure_tiebreaker("id", SortDir::Asc)
            .ensure_tiebreaker("id", SortDir::Asc);
        assert_eq!(order.0.len(), 2);
        assert_eq!(order.to_string(), "name asc, id asc");
    }

    #[test]
    fn order_display_includes_null_placement() {
        let order = OrderBy::empty().then(OrderKey::asc("end_of_life_date").nulls_last());
        assert_eq!(order.to_string(), "end_of_life_date asc nulls last");
    }

    #[test]
    fn value_wire_strings() {
        let d = chrono::NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        assert_eq!(Value::Date(d).to_wire_string(), "2026-03-04");
        assert_eq!(Value::Number(7).to_json(), serde_json::json!(7));
        assert_eq!(Value::Null.to_wire_string(), "null");
    }
}
