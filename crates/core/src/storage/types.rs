use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Query;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A request for one page of results. `page_index` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_index: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page_index.saturating_sub(1) as usize) * self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page_index < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 1
    }
}

/// Cuts the page described by `request` out of an already ordered result set.
///
/// A page past the end is empty but still reports the real totals.
///
/// # Example
///
/// ```
/// use toolcheck_core::storage::{paginate, PageRequest};
///
/// let page = paginate((1..=25).collect::<Vec<_>>(), PageRequest::new(3, 10));
/// assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
/// assert_eq!(page.total_pages, 3);
/// ```
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_count = items.len() as u64;
    let total_pages = if request.page_size == 0 {
        0
    } else {
        total_count.div_ceil(request.page_size as u64) as u32
    };
    let page_items = items
        .into_iter()
        .skip(request.offset())
        .take(request.page_size as usize)
        .collect();

    Page {
        items: page_items,
        page_index: request.page_index,
        page_size: request.page_size,
        total_count,
        total_pages,
    }
}

/// A write payload holding either a single item or a bulk array.
#[derive(Debug, Clone, PartialEq)]
pub enum Items<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Items<T> {
    pub fn one(item: T) -> Self {
        Items::One(item)
    }

    pub fn many(items: Vec<T>) -> Self {
        Items::Many(items)
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Items::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Items::One(_) => 1,
            Items::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Items::One(item) => std::slice::from_ref(item).iter(),
            Items::Many(items) => items.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Items::One(item) => vec![item],
            Items::Many(items) => items,
        }
    }
}

/// A partial update: the fields in `data` replace the stored ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub id: i64,
    pub data: Value,
}

impl EntityUpdate {
    pub fn new(id: i64, data: Value) -> Self {
        Self { id, data }
    }
}

/// What a delete call removes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget<T> {
    One(T),
    Many(Vec<T>),
    /// Every record the query matches.
    Matching(Query),
}
