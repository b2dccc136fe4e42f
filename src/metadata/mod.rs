//! Physical table and column metadata consumed by the inference engine.

#[cfg(not(target_arch = "wasm32"))]
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Database not found: {}", path.display())]
    MissingResource { path: PathBuf },
    #[error("Cannot read structure of table {table}: {reason}")]
    MalformedTable { table: String, reason: String },
    #[cfg(not(target_arch = "wasm32"))]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A column as declared by the source database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub declared_type: String,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// Read-only view of a database's tables.
pub trait MetadataProvider {
    /// Table names in storage order.
    fn list_tables(&self) -> Vec<String>;

    /// Columns of one table. An `Err` marks the table as unreadable.
    fn columns(&self, table: &str) -> Result<Vec<RawColumn>, MetadataError>;
}

/// One table of an [`InMemoryMetadata`] snapshot. `columns: None` records a
/// table whose structure could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumns {
    pub name: String,
    pub columns: Option<Vec<RawColumn>>,
}

/// Metadata materialized in memory, used for snapshots, fixtures and the
/// wasm entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryMetadata {
    pub tables: Vec<TableColumns>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document of the form
    /// `{"tables": [{"name": "T", "columns": [{"name": "c", "type": "INTEGER"}]}]}`.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style helper taking `(name, type)` pairs.
    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.push(TableColumns {
            name: name.to_string(),
            columns: Some(
                columns
                    .iter()
                    .map(|(n, t)| RawColumn::new(*n, *t))
                    .collect(),
            ),
        });
        self
    }

    /// Record a table that is listed but whose structure cannot be read.
    pub fn with_unreadable_table(mut self, name: &str) -> Self {
        self.tables.push(TableColumns {
            name: name.to_string(),
            columns: None,
        });
        self
    }
}

impl MetadataProvider for InMemoryMetadata {
    fn list_tables(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    fn columns(&self, table: &str) -> Result<Vec<RawColumn>, MetadataError> {
        let entry = self.tables.iter().find(|t| t.name == table);
        match entry.and_then(|t| t.columns.clone()) {
            Some(columns) => Ok(columns),
            None => Err(MetadataError::MalformedTable {
                table: table.to_string(),
                reason: if entry.is_some() {
                    "structure unavailable".to_string()
                } else {
                    "no such table".to_string()
                },
            }),
        }
    }
}

/// Snapshot a SQLite database, falling back to empty metadata when the
/// database cannot be opened. The rest of the pipeline then produces an
/// empty graph instead of aborting.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_or_empty(path: &std::path::Path) -> InMemoryMetadata {
    match sqlite::snapshot(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!("{e}; continuing with an empty schema");
            InMemoryMetadata::new()
        }
    }
}
