use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match on strings, membership on arrays.
    Contains,
    /// Field value is one of the values in the filter's array.
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Contains => "~",
            FilterOp::In => "in",
        }
    }
}

/// A single predicate on one field of an entity's JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Dotted path into the entity, e.g. `"quantity"`.
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// A serializable description of a read.
///
/// Filters are combined with AND. Sort keys apply in order and ties always
/// fall back to ascending id, so the same query over the same data yields the
/// same sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
}

impl Query {
    /// A query matching every record in id order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sort.is_empty()
    }
}

/// Writes `field` as a JSON string so quotes, operators and commas inside a
/// field name cannot run into the surrounding syntax.
fn write_field(f: &mut fmt::Formatter<'_>, field: &str) -> fmt::Result {
    write!(f, "{}", Value::from(field))
}

/// Canonical text form used in cache keys.
///
/// Field names and values are both JSON, so every part is self-delimiting
/// and two different queries never print the same. `serde_json::Value`
/// renders objects with sorted keys, so two equal queries always print
/// identically.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "where[")?;
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write_field(f, &filter.field)?;
            write!(f, "{}{}", filter.op.as_str(), filter.value)?;
        }
        write!(f, "]order[")?;
        for (i, key) in self.sort.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            let direction = match key.direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            write_field(f, &key.field)?;
            write!(f, " {direction}")?;
        }
        write!(f, "]")
    }
}
