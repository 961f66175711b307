//! Cache key derivation for repository reads.
//!
//! A key is `{prefix}:{operation}:{descriptor}`. The descriptor is the
//! canonical text of everything that shapes the result: the query, the id,
//! the page and any extra parameters. Equal reads produce equal keys and a
//! difference in any input produces a different key.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Query;
use crate::storage::PageRequest;

/// The repository read a cache entry was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadOperation {
    GetEntity,
    GetById,
    GetAll,
    GetAllPaged,
}

impl ReadOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadOperation::GetEntity => "GetEntity",
            ReadOperation::GetById => "GetById",
            ReadOperation::GetAll => "GetAll",
            ReadOperation::GetAllPaged => "GetAllPaged",
        }
    }
}

impl fmt::Display for ReadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to run a read again.
///
/// The key registry stores one of these per issued key so the read can be
/// replayed when the cache is repopulated after a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub operation: ReadOperation,
    #[serde(default)]
    pub query: Query,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub page: Option<PageRequest>,
    /// Caller-supplied values that must also distinguish the key.
    #[serde(default)]
    pub params: Option<Value>,
}

impl ReadRequest {
    fn new(operation: ReadOperation, query: Query) -> Self {
        Self {
            operation,
            query,
            id: None,
            page: None,
            params: None,
        }
    }

    pub fn entity(query: Query) -> Self {
        Self::new(ReadOperation::GetEntity, query)
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::new(ReadOperation::GetById, Query::default())
        }
    }

    pub fn all(query: Query) -> Self {
        Self::new(ReadOperation::GetAll, query)
    }

    pub fn paged(query: Query, page: PageRequest) -> Self {
        Self {
            page: Some(page),
            ..Self::new(ReadOperation::GetAllPaged, query)
        }
    }

    pub fn with_params(mut self, params: Option<Value>) -> Self {
        self.params = params;
        self
    }

    /// Canonical text of the read's inputs, without prefix or operation.
    pub fn descriptor(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        match self.id {
            Some(id) => parts.push(format!("id={id}")),
            None => parts.push(self.query.to_string()),
        }
        if let Some(page) = self.page {
            parts.push(format!("page={}/{}", page.page_index, page.page_size));
        }
        if let Some(params) = &self.params {
            parts.push(format!("params={params}"));
        }
        parts.join("|")
    }
}

/// Returns the cache key for `request` under an entity prefix.
///
/// # Examples
///
/// ```
/// use toolcheck_core::cache::{cache_key, ReadRequest};
/// use toolcheck_core::query::Query;
/// use toolcheck_core::storage::PageRequest;
///
/// let key = cache_key("tools", &ReadRequest::paged(Query::all(), PageRequest::new(1, 10)));
/// assert_eq!(key, "tools:GetAllPaged:where[]order[]|page=1/10");
///
/// assert_eq!(cache_key("tools", &ReadRequest::by_id(3)), "tools:GetById:id=3");
/// ```
pub fn cache_key(prefix: &str, request: &ReadRequest) -> String {
    format!(
        "{}:{}:{}",
        prefix,
        request.operation.as_str(),
        request.descriptor()
    )
}
