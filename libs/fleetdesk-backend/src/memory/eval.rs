//! Row-level evaluation of a `SelectQuery` over JSON rows.

use std::cmp::Ordering;

use fleetdesk_query::ast::{CompareOperator, Expr, Value};
use fleetdesk_query::{NullsOrder, OrderBy, SortDir};
use serde_json::Value as Json;

use crate::data::Row;

pub(super) fn matches_all(row: &Row, filters: &[Expr]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

fn matches(row: &Row, expr: &Expr) -> bool {
    match expr {
        Expr::And(parts) => parts.iter().all(|p| matches(row, p)),
        Expr::IsNotNull(field) => !field_value(row, field).is_null(),
        Expr::Contains(field, needle) => field_value(row, field)
            .as_str()
            .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
        Expr::Compare(field, op, operand) => compare(field_value(row, field), *op, operand),
    }
}

fn field_value<'a>(row: &'a Row, field: &str) -> &'a Json {
    row.get(field).unwrap_or(&Json::Null)
}

fn compare(actual: &Json, op: CompareOperator, operand: &Value) -> bool {
    if matches!(operand, Value::Null) {
        return match op {
            CompareOperator::Eq => actual.is_null(),
            CompareOperator::Ne => !actual.is_null(),
            _ => false,
        };
    }
    // SQL semantics: NULL never compares.
    if actual.is_null() {
        return false;
    }
    let Some(ord) = cmp_json(actual, &operand.to_json()) else {
        return false;
    };
    match op {
        CompareOperator::Eq => ord == Ordering::Equal,
        CompareOperator::Ne => ord != Ordering::Equal,
        CompareOperator::Gt => ord == Ordering::Greater,
        CompareOperator::Ge => ord != Ordering::Less,
        CompareOperator::Lt => ord == Ordering::Less,
        CompareOperator::Le => ord != Ordering::Greater,
    }
}

/// Compare two non-null JSON scalars of the same kind.
fn cmp_json(a: &Json, b: &Json) -> Option<Ordering> {
    match (a, b) {
        (Json::String(x), Json::String(y)) => Some(x.cmp(y)),
        (Json::Bool(x), Json::Bool(y)) => Some(x.cmp(y)),
        (Json::Number(x), Json::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        _ => None,
    }
}

/// Sort rows in place; PostgreSQL places NULLs last for ASC and first for DESC
/// unless told otherwise.
pub(super) fn sort_rows(rows: &mut [Row], order: &OrderBy) {
    rows.sort_by(|a, b| {
        for key in &order.0 {
            let (x, y) = (field_value(a, &key.field), field_value(b, &key.field));
            let nulls_last = match key.nulls {
                NullsOrder::Last => true,
                NullsOrder::First => false,
                NullsOrder::Default => key.dir == SortDir::Asc,
            };
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) if nulls_last => Ordering::Greater,
                (true, false) => Ordering::Less,
                (false, true) if nulls_last => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => {
                    let ord = cmp_json(x, y).unwrap_or(Ordering::Equal);
                    match key.dir {
                        SortDir::Asc => ord,
                        SortDir::Desc => ord.reverse(),
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
