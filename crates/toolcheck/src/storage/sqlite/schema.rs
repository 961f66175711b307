//! SQLite schema definitions and SQL builders.
//!
//! Pure string construction, no I/O. Table names come from
//! `Entity::CACHE_PREFIX`, which is a compile-time constant, never user input.

/// SQL statement creating the document table for `table`.
pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    \
             id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
             data TEXT NOT NULL\n\
         );"
    )
}

pub fn select_all(table: &str) -> String {
    format!("SELECT id, data FROM {table} ORDER BY id ASC")
}

pub fn select_by_id(table: &str) -> String {
    format!("SELECT id, data FROM {table} WHERE id = ?1")
}

/// Insert letting SQLite assign the id.
pub fn insert(table: &str) -> String {
    format!("INSERT INTO {table} (data) VALUES (?1)")
}

pub fn insert_with_id(table: &str) -> String {
    format!("INSERT INTO {table} (id, data) VALUES (?1, ?2)")
}

pub fn update(table: &str) -> String {
    format!("UPDATE {table} SET data = ?2 WHERE id = ?1")
}

pub fn delete(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = ?1")
}

pub fn exists(table: &str) -> String {
    format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)")
}
