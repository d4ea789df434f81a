use crate::Database;
use crate::models::{FileRow, NewFile, UserRow, WeightRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Weights --

    /// Insert a weight record together with its file rows in one transaction.
    /// File payloads are already on disk before this runs.
    pub fn create_weight(
        &self,
        id: &str,
        user_id: &str,
        date: &str,
        weight: i64,
        files: &[NewFile],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO weights (id, user_id, date, weight) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, date, weight],
            )?;
            for (position, file) in files.iter().enumerate() {
                tx.execute(
                    "INSERT INTO files (id, weight_id, name, position) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![file.id, id, file.name, position as i64],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// All weight records owned by a user, in insertion order.
    pub fn list_weights(&self, user_id: &str) -> Result<Vec<WeightRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, date, weight, created_at
                 FROM weights
                 WHERE user_id = ?1
                 ORDER BY rowid",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(WeightRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        date: row.get(2)?,
                        weight: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Batch-fetch file rows for a set of weight ids.
    pub fn get_files_for_weights(&self, weight_ids: &[String]) -> Result<Vec<FileRow>> {
        if weight_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=weight_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, weight_id, name, position FROM files
                 WHERE weight_id IN ({})
                 ORDER BY weight_id, position",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = weight_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(FileRow {
                        id: row.get(0)?,
                        weight_id: row.get(1)?,
                        name: row.get(2)?,
                        position: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Delete a weight record and its file rows, scoped to the owning user.
    /// Returns the deleted file rows so the caller can remove disk payloads,
    /// or None if no matching record exists.
    pub fn delete_weight(&self, id: &str, user_id: &str) -> Result<Option<Vec<FileRow>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let owned: Option<String> = tx
                .query_row(
                    "SELECT id FROM weights WHERE id = ?1 AND user_id = ?2",
                    [id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            if owned.is_none() {
                return Ok(None);
            }

            let files = {
                let mut stmt = tx.prepare(
                    "SELECT id, weight_id, name, position FROM files WHERE weight_id = ?1",
                )?;
                stmt.query_map([id], |row| {
                    Ok(FileRow {
                        id: row.get(0)?,
                        weight_id: row.get(1)?,
                        name: row.get(2)?,
                        position: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?
            };

            tx.execute("DELETE FROM files WHERE weight_id = ?1", [id])?;
            tx.execute("DELETE FROM weights WHERE id = ?1", [id])?;
            tx.commit()?;

            Ok(Some(files))
        })
    }

    /// Replace a record's date and weight wholesale, scoped to the owner.
    /// Returns false if no matching record exists.
    pub fn update_weight(&self, id: &str, user_id: &str, date: &str, weight: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE weights SET date = ?1, weight = ?2 WHERE id = ?3 AND user_id = ?4",
                rusqlite::params![date, weight, id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Files --

    /// Delete a single file row if it belongs to a record owned by the user.
    /// Returns the deleted row for disk cleanup, or None.
    pub fn delete_file(&self, id: &str, user_id: &str) -> Result<Option<FileRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let row = tx
                .query_row(
                    "SELECT f.id, f.weight_id, f.name, f.position
                     FROM files f
                     JOIN weights w ON f.weight_id = w.id
                     WHERE f.id = ?1 AND w.user_id = ?2",
                    [id, user_id],
                    |row| {
                        Ok(FileRow {
                            id: row.get(0)?,
                            weight_id: row.get(1)?,
                            name: row.get(2)?,
                            position: row.get(3)?,
                        })
                    },
                )
                .optional()?;

            let Some(row) = row else {
                return Ok(None);
            };

            tx.execute("DELETE FROM files WHERE id = ?1", [id])?;
            tx.commit()?;

            Ok(Some(row))
        })
    }

    /// Whether any file row still references this stored name. Names are
    /// caller-chosen and last-write-wins, so two records can share one disk
    /// payload; it is only removed once the last reference is gone.
    pub fn name_in_use(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM files WHERE name = ?1", [name], |row| {
                    row.get(0)
                })?;
            Ok(count > 0)
        })
    }

    /// Every stored filename still referenced by some file row. Used by the
    /// orphan reconciler to decide which disk files to keep.
    pub fn stored_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT name FROM files")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
