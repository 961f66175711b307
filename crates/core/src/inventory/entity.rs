use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A rule an entity failed before it reached storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{entity_type}.{field}: {reason}")]
pub struct ValidationError {
    pub entity_type: &'static str,
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(entity_type: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            entity_type,
            field,
            reason: reason.into(),
        }
    }
}

/// A persisted inventory record.
///
/// Every entity is identified by an integer id that the repository assigns on
/// insert when the caller leaves it at `0`. The JSON form produced by serde is
/// what queries are evaluated against and what the cache stores.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Human readable type name used in errors and logs.
    const NAME: &'static str;

    /// Namespace for cache keys and storage tables.
    const CACHE_PREFIX: &'static str;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Checks the fields that must hold before the entity is written.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Fails with a `ValidationError` if `value` is blank.
pub(crate) fn require_text(
    entity_type: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(entity_type, field, "must not be empty"));
    }
    Ok(())
}

/// Fails with a `ValidationError` if `value` is not a positive reference.
pub(crate) fn require_reference(
    entity_type: &'static str,
    field: &'static str,
    value: i64,
) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::new(
            entity_type,
            field,
            "must reference an existing record",
        ));
    }
    Ok(())
}
