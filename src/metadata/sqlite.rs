//! SQLite metadata provider.

use super::{InMemoryMetadata, MetadataError, MetadataProvider, RawColumn, TableColumns};
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// A live, read-only connection to a SQLite database.
pub struct SqliteMetadata {
    conn: Connection,
}

impl SqliteMetadata {
    /// Open an existing database read-only. A missing file is reported as
    /// [`MetadataError::MissingResource`] rather than silently created.
    pub fn open(path: &Path) -> Result<Self, MetadataError> {
        if !path.is_file() {
            return Err(MetadataError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn query_tables(&self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names
            .into_iter()
            .filter(|n| !n.starts_with("sqlite_"))
            .collect())
    }

    fn query_columns(&self, table: &str) -> rusqlite::Result<Vec<RawColumn>> {
        let sql = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(RawColumn {
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }
}

impl MetadataProvider for SqliteMetadata {
    fn list_tables(&self) -> Vec<String> {
        match self.query_tables() {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Cannot list tables: {e}");
                Vec::new()
            }
        }
    }

    fn columns(&self, table: &str) -> Result<Vec<RawColumn>, MetadataError> {
        self.query_columns(table)
            .map_err(|e| MetadataError::MalformedTable {
                table: table.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Read every table of the database at `path` into memory. The connection
/// is closed before returning, on success and on every error path.
pub fn snapshot(path: &Path) -> Result<InMemoryMetadata, MetadataError> {
    let source = SqliteMetadata::open(path)?;
    let tables = source
        .list_tables()
        .into_iter()
        .map(|name| {
            let columns = match source.columns(&name) {
                Ok(columns) => Some(columns),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            };
            TableColumns { name, columns }
        })
        .collect::<Vec<_>>();
    debug!("Read {} tables from {}", tables.len(), path.display());
    Ok(InMemoryMetadata { tables })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteMetadata {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE BIOG_MAIN (c_personid INTEGER PRIMARY KEY, c_name_chn TEXT);
             CREATE TABLE \"odd\"\"name\" (c_dy INTEGER);
             CREATE TABLE untyped (a, b);",
        )
        .unwrap();
        SqliteMetadata::from_connection(conn)
    }

    #[test]
    fn test_list_tables() {
        let meta = fixture();
        assert_eq!(meta.list_tables(), vec!["BIOG_MAIN", "odd\"name", "untyped"]);
    }

    #[test]
    fn test_columns_with_types() {
        let meta = fixture();
        let cols = meta.columns("BIOG_MAIN").unwrap();
        assert_eq!(cols, vec![
            RawColumn::new("c_personid", "INTEGER"),
            RawColumn::new("c_name_chn", "TEXT"),
        ]);
    }

    #[test]
    fn test_quoted_and_untyped_tables() {
        let meta = fixture();
        assert_eq!(meta.columns("odd\"name").unwrap()[0].name, "c_dy");
        let cols = meta.columns("untyped").unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].declared_type, "");
    }

    #[test]
    fn test_missing_database() {
        let err = snapshot(Path::new("/definitely/not/here.db")).unwrap_err();
        assert!(matches!(err, MetadataError::MissingResource { .. }));
    }
}
