//! Rendering of `SelectQuery` into PostgREST query parameters.

use fleetdesk_query::ast::{CompareOperator, Expr, Value};
use fleetdesk_query::{NullsOrder, OrderBy, SelectQuery};

/// Query-string pairs for a select: `select`, one pair per filter, `order`,
/// `offset` and `limit`.
pub(crate) fn query_pairs(query: &SelectQuery) -> Vec<(String, String)> {
    let select = query
        .select
        .as_ref()
        .map_or_else(|| "*".to_owned(), |fields| fields.join(","));
    let mut pairs = vec![("select".to_owned(), select)];

    for expr in &query.filters {
        render_filter(expr, &mut pairs);
    }
    if let Some(order) = render_order(&query.order) {
        pairs.push(("order".to_owned(), order));
    }
    if let Some(range) = query.range {
        pairs.push(("offset".to_owned(), range.offset.to_string()));
        pairs.push(("limit".to_owned(), range.limit.to_string()));
    }
    pairs
}

fn render_filter(expr: &Expr, out: &mut Vec<(String, String)>) {
    match expr {
        Expr::And(parts) => {
            for part in parts {
                render_filter(part, out);
            }
        }
        Expr::Compare(field, op, Value::Null) => {
            let value = match op {
                CompareOperator::Ne => "not.is.null",
                _ => "is.null",
            };
            out.push((field.clone(), value.to_owned()));
        }
        Expr::Compare(field, op, value) => {
            out.push((field.clone(), format!("{}.{}", op.as_str(), value.to_wire_string())));
        }
        Expr::Contains(field, needle) => {
            out.push((field.clone(), format!("ilike.*{}*", escape_like(needle))));
        }
        Expr::IsNotNull(field) => {
            out.push((field.clone(), "not.is.null".to_owned()));
        }
    }
}

/// Backslash-escape `LIKE` metacharacters so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `col.asc,col2.desc.nullslast`
pub(crate) fn render_order(order: &OrderBy) -> Option<String> {
    if order.is_empty() {
        return None;
    }
    let keys: Vec<String> = order
        .0
        .iter()
        .map(|k| match k.nulls {
            NullsOrder::Default => format!("{}.{}", k.field, k.dir.as_str()),
            NullsOrder::First => format!("{}.{}.nullsfirst", k.field, k.dir.as_str()),
            NullsOrder::Last => format!("{}.{}.nullslast", k.field, k.dir.as_str()),
        })
        .collect();
    Some(keys.join(","))
}

/// Total row count from a `Content-Range` header (`0-9/25`, `*/0`).
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use fleetdesk_query::{OrderKey, RowRange};
    use uuid::Uuid;

    #[test]
    fn renders_filters_order_and_range() {
        let client = Uuid::nil();
        let query = SelectQuery::new()
            .with_filter(Expr::Compare(
                "client_id".into(),
                CompareOperator::Eq,
                Value::Uuid(client),
            ))
            .with_filter(Expr::Contains("name".into(), "office".into()))
            .with_filter(Expr::IsNotNull("id".into()))
            .with_order(
                OrderBy::empty()
                    .then(OrderKey::asc("end_of_life_date").nulls_last())
                    .then(OrderKey::asc("id")),
            )
            .with_range(RowRange {
                offset: 10,
                limit: 10,
            });

        let pairs = query_pairs(&query);
        let expect = |k: &str, v: &str| (k.to_owned(), v.to_owned());
        assert_eq!(
            pairs,
            vec![
                expect("select", "*"),
                expect("client_id", "eq.00000000-0000-0000-0000-000000000000"),
                expect("name", "ilike.*office*"),
                expect("id", "not.is.null"),
                expect("order", "end_of_life_date.asc.nullslast,id.asc"),
                expect("offset", "10"),
                expect("limit", "10"),
            ]
        );

        let literal = SelectQuery::new()
            .with_filter(Expr::Contains("name".into(), r"50%_off\x".into()));
        assert_eq!(
            query_pairs(&literal)[1],
            expect("name", r"ilike.*50\%\_off\\x*")
        );
    }

    #[test]
    fn null_comparisons_use_is() {
        let mut out = Vec::new();
        render_filter(
            &Expr::Compare("client_id".into(), CompareOperator::Eq, Value::Null),
            &mut out,
        );
        assert_eq!(out, vec![("client_id".to_owned(), "is.null".to_owned())]);
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range("0-9/25"), Some(25));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }
}
