//! Filtering, ordering, pagination and projection over flat records
//!
//! Filter keys are field names, optionally suffixed with an operator:
//! `age__gte=18`, `name__icontains="ada"`, `role__in=["admin","owner"]`.
//! A bare field name means equality, and so does a key whose `__` suffix is
//! not an operator: `first__name="Ada"` filters on the field `first__name`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    error::{ResourceError, Result},
    types::{Record, ID_FIELD},
};

const OPERATOR_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    IContains,
}

impl FilterOp {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            "contains" => FilterOp::Contains,
            "icontains" => FilterOp::IContains,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Ne => !values_equal(actual, &self.value),
            FilterOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::In => self
                .value
                .as_array()
                .is_some_and(|options| options.iter().any(|o| values_equal(actual, o))),
            FilterOp::Contains => match (actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::Array(items), needle) => items.iter().any(|i| values_equal(i, needle)),
                _ => false,
            },
            FilterOp::IContains => match (actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
        }
    }
}

/// Conjunction of field filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FieldFilter>,
}

impl Filter {
    pub fn parse(filters: &Record) -> Result<Self> {
        let mut clauses = Vec::with_capacity(filters.len());
        for (key, value) in filters {
            let (field, op) = split_key(key);
            if op == FilterOp::In && !value.is_array() {
                return Err(ResourceError::validation(format!(
                    "filter '{}' expects a list",
                    key
                )));
            }
            clauses.push(FieldFilter {
                field: field.to_string(),
                op,
                value: value.clone(),
            });
        }
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[FieldFilter] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

/// Split `name__op` into field and operator
///
/// Only a known operator suffix splits the key; anything else names a field.
pub fn split_key(key: &str) -> (&str, FilterOp) {
    key.rsplit_once(OPERATOR_SEPARATOR)
        .filter(|(field, _)| !field.is_empty())
        .and_then(|(field, suffix)| FilterOp::from_suffix(suffix).map(|op| (field, op)))
        .unwrap_or((key, FilterOp::Eq))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between two scalar values of the same kind; `None` otherwise
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order for sorting: missing/null first, then by kind, then by value
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    compare(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

/// Compare two records by `order_by` keys; `-field` sorts descending
pub fn compare_records(a: &Record, b: &Record, order_by: &[String]) -> Ordering {
    for key in order_by {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key.as_str(), false),
        };
        let left = a.get(field).unwrap_or(&Value::Null);
        let right = b.get(field).unwrap_or(&Value::Null);
        let ord = sort_order(left, right);
        let ord = if descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Apply `offset` then `limit`
pub fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Keep `id` and the listed fields; everything when `fields` is `None`
pub fn project(record: &Record, fields: Option<&[String]>) -> Record {
    match fields {
        None => record.clone(),
        Some(fields) => record
            .iter()
            .filter(|(key, _)| key.as_str() == ID_FIELD || fields.iter().any(|f| f == *key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// Case-insensitive substring match against every string field
pub fn text_match(record: &Record, query: &str) -> bool {
    let needle = query.to_lowercase();
    record
        .values()
        .filter_map(Value::as_str)
        .any(|text| text.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn people() -> Vec<Record> {
        vec![
            record(json!({"id": "1", "name": "Ada", "age": 36, "role": "admin"})),
            record(json!({"id": "2", "name": "Grace", "age": 45, "role": "user"})),
            record(json!({"id": "3", "name": "Linus", "role": "user"})),
        ]
    }

    fn matching(filters: Value) -> Vec<String> {
        let filter = Filter::parse(&record(filters)).unwrap();
        people()
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_equality_and_operators() {
        assert_eq!(matching(json!({"role": "user"})), vec!["2", "3"]);
        assert_eq!(matching(json!({"age__gte": 40})), vec!["2"]);
        assert_eq!(matching(json!({"age__lt": 40})), vec!["1"]);
        assert_eq!(matching(json!({"role__ne": "user"})), vec!["1"]);
        assert_eq!(matching(json!({"name__in": ["Ada", "Linus"]})), vec!["1", "3"]);
        assert_eq!(matching(json!({"name__contains": "ra"})), vec!["2"]);
        assert_eq!(matching(json!({"name__icontains": "LIN"})), vec!["3"]);
        assert_eq!(matching(json!({"role": "user", "age__gt": 10})), vec!["2"]);
    }

    #[test]
    fn test_integer_and_float_compare_equal() {
        assert_eq!(matching(json!({"age": 36.0})), vec!["1"]);
    }

    #[test]
    fn test_unknown_suffix_names_a_field() {
        assert_eq!(split_key("first__name"), ("first__name", FilterOp::Eq));
        assert_eq!(split_key("first__name__icontains"), ("first__name", FilterOp::IContains));
        assert_eq!(split_key("__gt"), ("__gt", FilterOp::Eq));

        let rows = vec![
            record(json!({"id": "1", "first__name": "Ada"})),
            record(json!({"id": "2", "first__name": "Grace"})),
        ];
        let filter = Filter::parse(&record(json!({"first__name": "Ada"}))).unwrap();
        let hits: Vec<_> = rows.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("1"));
    }

    #[test]
    fn test_in_requires_a_list() {
        assert!(Filter::parse(&record(json!({"name__in": "Ada"}))).is_err());
    }

    fn sort_records(records: &mut [Record], order_by: &[String]) {
        records.sort_by(|a, b| compare_records(a, b, order_by));
    }

    #[test]
    fn test_sort_nulls_first_and_descending() {
        let mut rows = people();
        sort_records(&mut rows, &["age".to_string()]);
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("3"), json!("1"), json!("2")]);

        sort_records(&mut rows, &["-role".to_string(), "name".to_string()]);
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("2"), json!("3"), json!("1")]);
    }

    #[test]
    fn test_paginate() {
        assert_eq!(paginate(vec![1, 2, 3, 4], Some(1), Some(2)), vec![2, 3]);
        assert_eq!(paginate(vec![1, 2], None, None), vec![1, 2]);
        assert!(paginate(vec![1, 2], Some(5), None).is_empty());
    }

    #[test]
    fn test_project_keeps_id() {
        let fields = vec!["name".to_string()];
        let projected = project(&people()[0], Some(&fields));
        assert_eq!(projected.len(), 2);
        assert!(projected.contains_key("id"));
    }

    #[test]
    fn test_text_match() {
        assert!(text_match(&people()[1], "grace"));
        assert!(!text_match(&people()[1], "admin"));
    }
}
