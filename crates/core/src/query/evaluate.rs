//! Pure evaluation of [`Query`] descriptors against entity records.

use std::cmp::Ordering;

use serde_json::Value;

use crate::inventory::Entity;

use super::types::{Filter, FilterOp, Query, SortDirection, SortKey};

/// Looks up a dotted path (`"a.b.c"`) inside a JSON value.
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
}

/// Orders two JSON scalars of the same kind.
///
/// Returns `None` when the values are of different kinds or not scalars.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal) || a == b
}

impl Filter {
    /// Returns true if `record` satisfies this filter.
    ///
    /// A missing field only satisfies `Ne`.
    pub fn matches(&self, record: &Value) -> bool {
        let Some(field) = lookup(record, &self.field) else {
            return self.op == FilterOp::Ne;
        };

        match self.op {
            FilterOp::Eq => values_equal(field, &self.value),
            FilterOp::Ne => !values_equal(field, &self.value),
            FilterOp::Gt => compare_values(field, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare_values(field, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Contains => match (field, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                (Value::Array(items), needle) => items.iter().any(|i| values_equal(i, needle)),
                _ => false,
            },
            FilterOp::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(|c| values_equal(field, c)),
                _ => false,
            },
        }
    }
}

impl Query {
    /// Returns true if `record` satisfies every filter.
    pub fn matches(&self, record: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Filters and orders `records`.
    ///
    /// Records are compared through their JSON form. Values missing or of
    /// a different kind sort after comparable ones; ties fall back to id.
    pub fn apply<T: Entity>(&self, records: Vec<T>) -> Result<Vec<T>, serde_json::Error> {
        let mut matched = Vec::with_capacity(records.len());
        for record in records {
            let json = serde_json::to_value(&record)?;
            if self.matches(&json) {
                matched.push((json, record));
            }
        }

        matched.sort_by(|(a_json, a), (b_json, b)| {
            self.sort
                .iter()
                .map(|key| compare_by_key(key, a_json, b_json))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| a.id().cmp(&b.id()))
        });

        Ok(matched.into_iter().map(|(_, record)| record).collect())
    }
}

fn compare_by_key(key: &SortKey, a: &Value, b: &Value) -> Ordering {
    let ordering = match (lookup(a, &key.field), lookup(b, &key.field)) {
        (Some(x), Some(y)) => match compare_values(x, y) {
            Some(ordering) => ordering,
            None => return Ordering::Equal,
        },
        // Missing values go last regardless of direction.
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => return Ordering::Equal,
    };

    match key.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Tool;
    use serde_json::json;

    fn tools() -> Vec<Tool> {
        vec![
            Tool::new("Hammer", 4).with_id(1),
            Tool::new("Circular Saw", 1).with_id(2),
            Tool::new("Hand Saw", 4).with_id(3).with_description("Rip cut"),
            Tool::new("Drill", 2).with_id(4),
        ]
    }

    fn ids(tools: &[Tool]) -> Vec<i64> {
        tools.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_lookup_nested_path() {
        let record = json!({"a": {"b": {"c": 7}}});
        assert_eq!(lookup(&record, "a.b.c"), Some(&json!(7)));
        assert_eq!(lookup(&record, "a.x"), None);
    }

    #[test]
    fn test_compare_values_mixed_kinds() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }

    #[test]
    fn test_empty_query_returns_all_in_id_order() {
        let mut shuffled = tools();
        shuffled.reverse();
        let result = Query::all().apply(shuffled).unwrap();
        assert_eq!(ids(&result), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_comparison_filters() {
        let result = Query::all()
            .filter("quantity", FilterOp::Gte, 2)
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![1, 3, 4]);

        let result = Query::all()
            .filter("quantity", FilterOp::Lt, 2)
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![2]);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let result = Query::all()
            .filter("name", FilterOp::Contains, "saw")
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![2, 3]);
    }

    #[test]
    fn test_in_filter() {
        let result = Query::all()
            .filter("id", FilterOp::In, json!([2, 4, 9]))
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![2, 4]);
    }

    #[test]
    fn test_missing_field_only_matches_ne() {
        let record = json!({"id": 1});
        assert!(!Filter::new("description", FilterOp::Eq, "x").matches(&record));
        assert!(Filter::new("description", FilterOp::Ne, "x").matches(&record));
    }

    #[test]
    fn test_null_optional_field() {
        let result = Query::all()
            .eq("description", Value::Null)
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![1, 2, 4]);
    }

    #[test]
    fn test_sort_with_id_tie_break() {
        let result = Query::all()
            .sort_by("quantity", SortDirection::Desc)
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_sort_by_name() {
        let result = Query::all()
            .sort_by("name", SortDirection::Asc)
            .apply(tools())
            .unwrap();
        assert_eq!(ids(&result), vec![2, 4, 1, 3]);
    }
}
