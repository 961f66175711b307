//! SQLite repository implementation.
//!
//! Implements `toolcheck_core::storage::Repository` for any entity type by
//! storing its JSON document. Filtering and ordering run in process through
//! `Query::apply`, so every backend answers a query the same way.

use std::marker::PhantomData;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Transaction};
use tokio_rusqlite::Connection;

use toolcheck_core::inventory::Entity;
use toolcheck_core::query::Query;
use toolcheck_core::storage::{
    apply_update, paginate, validate_delete, validate_inserts, validate_page, validate_updates,
    DeleteTarget, EntityUpdate, Items, Page, PageRequest, Repository, RepositoryError, Result,
};

use super::error::{map_rusqlite_error, map_tokio_rusqlite_error};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Opens a file-based database, creating the file if it doesn't exist.
pub async fn open(path: &str) -> Result<Connection> {
    Connection::open(path)
        .await
        .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))
}

/// Opens an in-memory database. Data is lost when the connection is dropped.
pub async fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory()
        .await
        .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))
}

type Row = (i64, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode<T: Entity>((id, data): Row) -> Result<T> {
    let mut entity: T = serde_json::from_str(&data)
        .map_err(|e| RepositoryError::InvalidData(format!("{} {id}: {e}", T::NAME)))?;
    entity.set_id(id);
    Ok(entity)
}

fn decode_all<T: Entity>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(decode::<T>).collect()
}

/// SQLite-backed repository for one entity type.
///
/// Each entity type gets its own table named after `T::CACHE_PREFIX`.
pub struct SqliteRepository<T: Entity> {
    conn: Connection,
    table: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteRepository<T> {
    /// Creates a repository over `conn`, creating its table when missing.
    pub async fn new(conn: Connection) -> Result<Self> {
        let table = T::CACHE_PREFIX;
        let ddl = schema::create_table(table);
        conn.call(move |conn| {
            conn.execute_batch(&ddl).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(Self {
            conn,
            table,
            _entity: PhantomData,
        })
    }

    async fn load_all(&self) -> Result<Vec<T>> {
        let sql = schema::select_all(self.table);
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map([], read_row)
                    .map_err(wrap_err)?;

                let mut records = Vec::new();
                for row_result in rows {
                    records.push(row_result.map_err(wrap_err)?);
                }
                Ok(records)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, T::NAME))?;

        decode_all(rows)
    }

    async fn matching(&self, query: &Query) -> Result<Vec<T>> {
        Ok(query.apply(self.load_all().await?)?)
    }
}

fn fetch_row(tx: &Transaction<'_>, table: &str, id: i64) -> rusqlite::Result<Option<Row>> {
    tx.query_row(&schema::select_by_id(table), [id], read_row)
        .optional()
}

fn row_exists(tx: &Transaction<'_>, table: &str, id: i64) -> rusqlite::Result<bool> {
    tx.query_row(&schema::exists(table), [id], |row| row.get(0))
}

fn insert_rows<T: Entity>(tx: &Transaction<'_>, table: &str, documents: Vec<(T, String)>) -> Result<Vec<T>> {
    let mut inserted = Vec::with_capacity(documents.len());
    for (mut entity, data) in documents {
        let explicit = entity.id();
        let outcome = if explicit == 0 {
            tx.execute(&schema::insert(table), [&data])
        } else {
            tx.execute(&schema::insert_with_id(table), params![explicit, data])
        };
        outcome.map_err(|e| map_rusqlite_error(&e, T::NAME, Some(explicit)))?;
        entity.set_id(tx.last_insert_rowid());
        inserted.push(entity);
    }
    Ok(inserted)
}

fn update_rows<T: Entity>(tx: &Transaction<'_>, table: &str, updates: &[EntityUpdate]) -> Result<Vec<T>> {
    let mut updated = Vec::with_capacity(updates.len());
    for update in updates {
        let row = fetch_row(tx, table, update.id)
            .map_err(|e| map_rusqlite_error(&e, T::NAME, Some(update.id)))?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: T::NAME,
                id: update.id.to_string(),
            })?;
        let patched = apply_update(&decode::<T>(row)?, &update.data)?;
        patched.validate()?;

        let data = serde_json::to_string(&patched)?;
        tx.execute(&schema::update(table), params![update.id, data])
            .map_err(|e| map_rusqlite_error(&e, T::NAME, Some(update.id)))?;
        updated.push(patched);
    }
    Ok(updated)
}

fn delete_rows<T: Entity>(tx: &Transaction<'_>, table: &str, ids: &[i64], require_all: bool) -> Result<u64> {
    if require_all {
        for &id in ids {
            let exists = row_exists(tx, table, id).map_err(|e| map_rusqlite_error(&e, T::NAME, Some(id)))?;
            if !exists {
                return Err(RepositoryError::NotFound {
                    entity_type: T::NAME,
                    id: id.to_string(),
                });
            }
        }
    }

    let mut removed = 0;
    for &id in ids {
        removed += tx
            .execute(&schema::delete(table), [id])
            .map_err(|e| map_rusqlite_error(&e, T::NAME, Some(id)))? as u64;
    }
    Ok(removed)
}

impl<T: Entity> SqliteRepository<T> {
    /// Runs `work` in a transaction, committing only when it succeeds.
    async fn write<R, F>(&self, work: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Transaction<'_>, &str) -> Result<R> + Send + 'static,
    {
        let table = self.table;
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let outcome = work(&tx, table);
                if outcome.is_ok() {
                    tx.commit().map_err(wrap_err)?;
                }
                Ok(outcome)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, T::NAME))?;
        outcome
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for SqliteRepository<T> {
    async fn get_entity(&self, query: &Query) -> Result<Option<T>> {
        Ok(self.matching(query).await?.into_iter().next())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<T>> {
        let sql = schema::select_by_id(self.table);
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                match stmt.query_row([id], read_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, T::NAME))?;

        row.map(decode).transpose()
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

        let documents = items
            .into_vec()
            .into_iter()
            .map(|entity| {
                let data = serde_json::to_string(&entity)?;
                Ok((entity, data))
            })
            .collect::<Result<Vec<_>>>()?;

        self.write(move |tx, table| insert_rows(tx, table, documents))
            .await
    }

    async fn update(&self, updates: Items<EntityUpdate>) -> Result<Vec<T>> {
        validate_updates(&updates)?;

        let updates = updates.into_vec();
        self.write(move |tx, table| update_rows(tx, table, &updates))
            .await
    }

    async fn delete(&self, target: DeleteTarget<T>) -> Result<u64> {
        validate_delete(&target)?;

        let (ids, require_all): (Vec<i64>, bool) = match target {
            DeleteTarget::One(entity) => (vec![entity.id()], true),
            DeleteTarget::Many(entities) => (entities.iter().map(Entity::id).collect(), true),
            DeleteTarget::Matching(query) => (
                self.matching(&query).await?.iter().map(Entity::id).collect(),
                false,
            ),
        };

        self.write(move |tx, table| delete_rows::<T>(tx, table, &ids, require_all))
            .await
    }
}
