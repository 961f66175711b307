//! Translation of driver failures into [`RepositoryError`].

use toolcheck_core::storage::RepositoryError;

/// Classifies a driver error for the record `id` of `entity_type`.
///
/// Key collisions become `AlreadyExists`, a missing row becomes `NotFound`
/// and a database that cannot be opened becomes `ConnectionFailed`.
/// Anything else is reported as `QueryFailed`.
pub fn map_rusqlite_error(
    err: &rusqlite::Error,
    entity_type: &'static str,
    id: Option<i64>,
) -> RepositoryError {
    let id = || id.map_or_else(|| "unknown".to_string(), |id| id.to_string());
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepositoryError::AlreadyExists {
                entity_type,
                id: id(),
            }
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen =>
        {
            RepositoryError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
            entity_type,
            id: id(),
        },

        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

/// Same as [`map_rusqlite_error`] for errors raised on the connection thread.
pub fn map_tokio_rusqlite_error(
    err: tokio_rusqlite::Error,
    entity_type: &'static str,
) -> RepositoryError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => {
            map_rusqlite_error(rusqlite_err, entity_type, None)
        }
        tokio_rusqlite::Error::Close(_) | tokio_rusqlite::Error::ConnectionClosed => {
            RepositoryError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn constraint(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code,
            },
            None,
        )
    }

    #[test]
    fn test_primary_key_maps_to_already_exists_with_id() {
        let result = map_rusqlite_error(&constraint(ffi::SQLITE_CONSTRAINT_PRIMARYKEY), "Tool", Some(4));
        assert_eq!(
            result,
            RepositoryError::AlreadyExists {
                entity_type: "Tool",
                id: "4".to_string()
            }
        );
    }

    #[test]
    fn test_unique_constraint_through_tokio_error() {
        let err = tokio_rusqlite::Error::Rusqlite(constraint(ffi::SQLITE_CONSTRAINT_UNIQUE));
        let result = map_tokio_rusqlite_error(err, "User");
        assert!(matches!(
            result,
            RepositoryError::AlreadyExists {
                entity_type: "User",
                ..
            }
        ));
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let result = map_rusqlite_error(&rusqlite::Error::QueryReturnedNoRows, "Project", Some(9));
        assert_eq!(
            result,
            RepositoryError::NotFound {
                entity_type: "Project",
                id: "9".to_string()
            }
        );
    }

    #[test]
    fn test_other_error_maps_to_query_failed() {
        let err = tokio_rusqlite::Error::Other(Box::new(std::io::Error::other("disk full")));
        let result = map_tokio_rusqlite_error(err, "Tool");
        assert!(matches!(result, RepositoryError::QueryFailed(_)));
    }
}
