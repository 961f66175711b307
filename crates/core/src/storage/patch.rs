//! Applying partial updates to entities.

use serde_json::Value;

use crate::inventory::Entity;

use super::{RepositoryError, Result};

/// Returns `current` with the top-level fields of `data` replaced.
///
/// Fields absent from `data` keep their stored values. The id is never
/// changed. Fails with `InvalidData` if the patched record no longer
/// deserializes as `T` (wrong field types, for example).
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use toolcheck_core::inventory::Tool;
/// use toolcheck_core::storage::apply_update;
///
/// let tool = Tool::new("Saw", 5).with_id(3);
/// let patched = apply_update(&tool, &json!({"quantity": 2})).unwrap();
/// assert_eq!(patched.quantity, 2);
/// assert_eq!(patched.name, "Saw");
/// ```
pub fn apply_update<T: Entity>(current: &T, data: &Value) -> Result<T> {
    let Value::Object(changes) = data else {
        return Err(RepositoryError::InvalidData(format!(
            "{} update must be an object",
            T::NAME
        )));
    };

    let mut record = serde_json::to_value(current)?;
    if let Value::Object(fields) = &mut record {
        for (field, value) in changes {
            fields.insert(field.clone(), value.clone());
        }
    }

    let mut patched: T = serde_json::from_value(record)
        .map_err(|e| RepositoryError::InvalidData(format!("{}: {e}", T::NAME)))?;
    patched.set_id(current.id());
    Ok(patched)
}
