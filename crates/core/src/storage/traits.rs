use async_trait::async_trait;

use crate::inventory::Entity;
use crate::query::Query;

use super::{DeleteTarget, EntityUpdate, Items, Page, PageRequest, Result};

/// CRUD access to one entity type.
///
/// Backends implement this directly; the cached decorator implements it too,
/// so callers cannot tell whether reads come from the store or the cache.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Gets the first record matching `query`, in query order.
    async fn get_entity(&self, query: &Query) -> Result<Option<T>>;

    /// Gets a record by its id.
    async fn get_by_id(&self, id: i64) -> Result<Option<T>>;

    /// Gets every record matching `query`.
    async fn get_all(&self, query: &Query) -> Result<Vec<T>>;

    /// Gets one page of the records matching `query`.
    async fn get_all_paged(&self, query: &Query, page: PageRequest) -> Result<Page<T>>;

    /// Inserts one or many records, returning them with their assigned ids.
    async fn insert(&self, items: Items<T>) -> Result<Vec<T>>;

    /// Applies one or many partial updates, returning the updated records.
    async fn update(&self, updates: Items<EntityUpdate>) -> Result<Vec<T>>;

    /// Deletes records, returning how many were removed.
    async fn delete(&self, target: DeleteTarget<T>) -> Result<u64>;
}
