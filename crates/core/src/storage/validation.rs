//! Shape checks for repository calls.
//!
//! These run before a write touches the cache or the data store, so a
//! malformed bulk call is rejected as a whole and nothing is mutated.

use serde_json::Value;

use crate::inventory::Entity;

use super::{DeleteTarget, EntityUpdate, Items, PageRequest, RepositoryError, Result, MAX_PAGE_SIZE};

fn invalid(message: String) -> RepositoryError {
    RepositoryError::Validation(message)
}

/// Label used in messages so bulk errors point at the offending element.
fn position(items_are_bulk: bool, index: usize) -> String {
    if items_are_bulk {
        format!("item {index}: ")
    } else {
        String::new()
    }
}

/// Checks a page request is within bounds.
pub fn validate_page(page: &PageRequest) -> Result<()> {
    if page.page_index == 0 {
        return Err(invalid("page_index starts at 1".to_string()));
    }
    if page.page_size == 0 || page.page_size > MAX_PAGE_SIZE {
        return Err(invalid(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
            page.page_size
        )));
    }
    Ok(())
}

/// Checks every entity of an insert.
pub fn validate_inserts<T: Entity>(items: &Items<T>) -> Result<()> {
    if items.is_empty() {
        return Err(invalid(format!("no {} to insert", T::NAME)));
    }
    for (index, entity) in items.iter().enumerate() {
        if entity.id() < 0 {
            return Err(invalid(format!(
                "{}{} id must not be negative",
                position(items.is_bulk(), index),
                T::NAME
            )));
        }
        entity
            .validate()
            .map_err(|e| invalid(format!("{}{e}", position(items.is_bulk(), index))))?;
    }
    Ok(())
}

/// Checks every `{id, data}` pair of an update.
///
/// `data` must be a non-empty JSON object and may only repeat the target id.
pub fn validate_updates(updates: &Items<EntityUpdate>) -> Result<()> {
    if updates.is_empty() {
        return Err(invalid("no updates given".to_string()));
    }
    for (index, update) in updates.iter().enumerate() {
        let at = position(updates.is_bulk(), index);
        if update.id <= 0 {
            return Err(invalid(format!("{at}update requires a positive id")));
        }
        let Value::Object(fields) = &update.data else {
            return Err(invalid(format!("{at}update data must be an object")));
        };
        if fields.is_empty() {
            return Err(invalid(format!("{at}update data must not be empty")));
        }
        if let Some(id) = fields.get("id") {
            if id.as_i64() != Some(update.id) {
                return Err(invalid(format!("{at}update data must not change the id")));
            }
        }
    }
    Ok(())
}

/// Checks the entities named by a delete carry ids.
pub fn validate_delete<T: Entity>(target: &DeleteTarget<T>) -> Result<()> {
    let entities: &[T] = match target {
        DeleteTarget::One(entity) => std::slice::from_ref(entity),
        DeleteTarget::Many(entities) if entities.is_empty() => {
            return Err(invalid(format!("no {} to delete", T::NAME)));
        }
        DeleteTarget::Many(entities) => entities.as_slice(),
        DeleteTarget::Matching(_) => return Ok(()),
    };
    let bulk = matches!(target, DeleteTarget::Many(_));
    for (index, entity) in entities.iter().enumerate() {
        if entity.id() <= 0 {
            return Err(invalid(format!(
                "{}{} to delete has no id",
                position(bulk, index),
                T::NAME
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Tool;
    use crate::query::Query;
    use serde_json::json;

    #[test]
    fn test_validate_page() {
        assert!(validate_page(&PageRequest::new(1, 10)).is_ok());
        assert!(validate_page(&PageRequest::new(0, 10)).is_err());
        assert!(validate_page(&PageRequest::new(1, 0)).is_err());
        assert!(validate_page(&PageRequest::new(1, MAX_PAGE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_validate_inserts_single() {
        assert!(validate_inserts(&Items::one(Tool::new("Saw", 1))).is_ok());

        let err = validate_inserts(&Items::one(Tool::new("", 1))).unwrap_err();
        assert_eq!(
            err,
            RepositoryError::Validation("Tool.name: must not be empty".to_string())
        );
    }

    #[test]
    fn test_validate_inserts_bulk_points_at_bad_item() {
        let items = Items::many(vec![
            Tool::new("Saw", 1),
            Tool::new("Drill", -2),
            Tool::new("Level", 1),
        ]);
        let err = validate_inserts(&items).unwrap_err();
        assert_eq!(
            err,
            RepositoryError::Validation("item 1: Tool.quantity: must not be negative".to_string())
        );
    }

    #[test]
    fn test_validate_inserts_empty_bulk() {
        assert!(validate_inserts(&Items::<Tool>::many(vec![])).is_err());
    }

    #[test]
    fn test_validate_updates() {
        let ok = Items::one(EntityUpdate::new(3, json!({"quantity": 2})));
        assert!(validate_updates(&ok).is_ok());

        let same_id = Items::one(EntityUpdate::new(3, json!({"id": 3, "quantity": 2})));
        assert!(validate_updates(&same_id).is_ok());
    }

    #[test]
    fn test_validate_updates_rejects_malformed() {
        let cases = [
            EntityUpdate::new(0, json!({"quantity": 2})),
            EntityUpdate::new(3, json!(2)),
            EntityUpdate::new(3, json!([{"quantity": 2}])),
            EntityUpdate::new(3, json!({})),
            EntityUpdate::new(3, json!({"id": 4})),
        ];
        for update in cases {
            assert!(
                validate_updates(&Items::one(update.clone())).is_err(),
                "{update:?}"
            );
        }
    }

    #[test]
    fn test_validate_updates_bulk_with_one_bad_element() {
        let updates = Items::many(vec![
            EntityUpdate::new(1, json!({"quantity": 2})),
            EntityUpdate::new(2, json!("not an object")),
        ]);
        let err = validate_updates(&updates).unwrap_err();
        assert_eq!(
            err,
            RepositoryError::Validation("item 1: update data must be an object".to_string())
        );
    }

    #[test]
    fn test_validate_delete() {
        assert!(validate_delete(&DeleteTarget::One(Tool::new("Saw", 1).with_id(2))).is_ok());
        assert!(validate_delete(&DeleteTarget::One(Tool::new("Saw", 1))).is_err());
        assert!(validate_delete::<Tool>(&DeleteTarget::Many(vec![])).is_err());
        assert!(validate_delete::<Tool>(&DeleteTarget::Matching(Query::all())).is_ok());
    }
}
