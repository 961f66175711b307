//! In-memory repository implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use toolcheck_core::inventory::Entity;
use toolcheck_core::query::Query;
use toolcheck_core::storage::{
    apply_update, paginate, validate_delete, validate_inserts, validate_page, validate_updates,
    DeleteTarget, EntityUpdate, Items, Page, PageRequest, Repository, RepositoryError, Result,
};

/// In-memory storage backend for one entity type.
///
/// Records live in a `BTreeMap` keyed by id wrapped in `Arc<RwLock<_>>`.
/// Writes are all-or-nothing: a bulk call that fails part way leaves the map
/// untouched. Data is lost when the repository is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryRepository<T: Entity> {
    records: Arc<RwLock<BTreeMap<i64, T>>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn matching(&self, query: &Query) -> Result<Vec<T>> {
        let records: Vec<T> = self.records.read().await.values().cloned().collect();
        Ok(query.apply(records)?)
    }
}

fn not_found<T: Entity>(id: i64) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: T::NAME,
        id: id.to_string(),
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get_entity(&self, query: &Query) -> Result<Option<T>> {
        Ok(self.matching(query).await?.into_iter().next())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<T>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn get_all(&self, query: &Query) -> Result<Vec<T>> {
        self.matching(query).await
    }

    async fn get_all_paged(&self, query: &Query, page: PageRequest) -> Result<Page<T>> {
        validate_page(&page)?;
        Ok(paginate(self.matching(query).await?, page))
    }

    async fn insert(&self, items: Items<T>) -> Result<Vec<T>> {
        validate_inserts(&items)?;

        let mut records = self.records.write().await;
        let mut next_id = records.keys().next_back().copied().unwrap_or(0) + 1;
        let mut inserted = Vec::with_capacity(items.len());

        for mut entity in items.into_vec() {
            if entity.id() == 0 {
                entity.set_id(next_id);
            }
            if records.contains_key(&entity.id()) || inserted.iter().any(|e: &T| e.id() == entity.id()) {
                return Err(RepositoryError::AlreadyExists {
                    entity_type: T::NAME,
                    id: entity.id().to_string(),
                });
            }
            next_id = next_id.max(entity.id() + 1);
            inserted.push(entity);
        }

        for entity in &inserted {
            records.insert(entity.id(), entity.clone());
        }
        Ok(inserted)
    }

    async fn update(&self, updates: Items<EntityUpdate>) -> Result<Vec<T>> {
        validate_updates(&updates)?;

        let mut records = self.records.write().await;
        let mut updated: Vec<T> = Vec::with_capacity(updates.len());

        for update in updates.iter() {
            // A bulk update may touch the same record twice; later patches
            // build on earlier ones.
            let current = match updated.iter().rev().find(|e| e.id() == update.id) {
                Some(pending) => pending.clone(),
                None => records
                    .get(&update.id)
                    .cloned()
                    .ok_or_else(|| not_found::<T>(update.id))?,
            };
            let patched = apply_update(&current, &update.data)?;
            patched.validate()?;
            updated.push(patched);
        }

        for entity in &updated {
            records.insert(entity.id(), entity.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, target: DeleteTarget<T>) -> Result<u64> {
        validate_delete(&target)?;

        let ids: Vec<i64> = match target {
            DeleteTarget::One(entity) => vec![entity.id()],
            DeleteTarget::Many(entities) => entities.iter().map(Entity::id).collect(),
            DeleteTarget::Matching(query) => {
                let matched = self.matching(&query).await?;
                let mut records = self.records.write().await;
                let mut removed = 0;
                for entity in matched {
                    if records.remove(&entity.id()).is_some() {
                        removed += 1;
                    }
                }
                return Ok(removed);
            }
        };

        let mut records = self.records.write().await;
        if let Some(missing) = ids.iter().find(|id| !records.contains_key(id)) {
            return Err(not_found::<T>(*missing));
        }
        let mut removed = 0;
        for id in ids {
            if records.remove(&id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolcheck_core::inventory::{seed_tools, Tool};
    use toolcheck_core::query::{FilterOp, SortDirection};

    async fn seeded(count: usize) -> InMemoryRepository<Tool> {
        let repo = InMemoryRepository::new();
        repo.insert(Items::many(seed_tools(count))).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryRepository::<Tool>::new();

        let inserted = repo
            .insert(Items::many(vec![Tool::new("Saw", 1), Tool::new("Drill", 2)]))
            .await
            .unwrap();
        assert_eq!(inserted.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);

        let next = repo.insert(Items::one(Tool::new("Level", 1))).await.unwrap();
        assert_eq!(next[0].id, 3);
    }

    #[tokio::test]
    async fn test_insert_explicit_id_conflict() {
        let repo = seeded(2).await;

        let err = repo
            .insert(Items::one(Tool::new("Saw", 1).with_id(2)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::AlreadyExists {
                entity_type: "Tool",
                id: "2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_bulk_insert_is_all_or_nothing() {
        let repo = seeded(2).await;

        let result = repo
            .insert(Items::many(vec![
                Tool::new("Saw", 1),
                Tool::new("Duplicate", 1).with_id(1),
            ]))
            .await;
        assert!(result.is_err());
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_insert_rejected() {
        let repo = InMemoryRepository::<Tool>::new();
        let err = repo.insert(Items::one(Tool::new("", 1))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let repo = seeded(3).await;
        assert_eq!(repo.get_by_id(2).await.unwrap().unwrap().name, "Circular Saw");
        assert!(repo.get_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_entity_returns_first_in_query_order() {
        let repo = seeded(5).await;
        let query = Query::all().sort_by("name", SortDirection::Desc);
        let first = repo.get_entity(&query).await.unwrap().unwrap();
        assert_eq!(first.name, "Laser Level");
    }

    #[tokio::test]
    async fn test_get_all_with_filter() {
        let repo = seeded(12).await;
        let query = Query::all().filter("quantity", FilterOp::Gte, 5);
        let tools = repo.get_all(&query).await.unwrap();
        assert!(!tools.is_empty());
        assert!(tools.iter().all(|t| t.quantity >= 5));
    }

    #[tokio::test]
    async fn test_get_all_paged() {
        let repo = seeded(25).await;
        let page = repo
            .get_all_paged(&Query::all(), PageRequest::new(3, 10))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].id, 21);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_get_all_paged_rejects_bad_page() {
        let repo = seeded(1).await;
        let err = repo
            .get_all_paged(&Query::all(), PageRequest::new(0, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_patches_fields() {
        let repo = seeded(3).await;
        let updated = repo
            .update(Items::one(EntityUpdate::new(3, json!({"quantity": 9}))))
            .await
            .unwrap();
        assert_eq!(updated[0].quantity, 9);
        assert_eq!(repo.get_by_id(3).await.unwrap().unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn test_update_missing_record_mutates_nothing() {
        let repo = seeded(3).await;
        let err = repo
            .update(Items::many(vec![
                EntityUpdate::new(1, json!({"quantity": 9})),
                EntityUpdate::new(42, json!({"quantity": 9})),
            ]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::NotFound {
                entity_type: "Tool",
                id: "42".to_string()
            }
        );
        assert_eq!(repo.get_by_id(1).await.unwrap().unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_result() {
        let repo = seeded(1).await;
        let err = repo
            .update(Items::one(EntityUpdate::new(1, json!({"quantity": -3}))))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let repo = seeded(5).await;
        let one = repo.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(repo.delete(DeleteTarget::One(one)).await.unwrap(), 1);

        let rest = repo.get_all(&Query::all()).await.unwrap();
        assert_eq!(repo.delete(DeleteTarget::Many(rest[..2].to_vec())).await.unwrap(), 2);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let repo = seeded(1).await;
        let err = repo
            .delete(DeleteTarget::One(Tool::new("Ghost", 1).with_id(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_matching() {
        let repo = seeded(10).await;
        let removed = repo
            .delete(DeleteTarget::Matching(Query::all().filter(
                "quantity",
                FilterOp::Lte,
                2,
            )))
            .await
            .unwrap();
        assert_eq!(removed, 4);
        assert_eq!(repo.len().await, 6);
    }
}
