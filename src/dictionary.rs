//! Human-readable names for tables and columns.
//!
//! The dictionary is loaded once and only read afterwards; components take
//! it by shared reference. A missing entry is a normal outcome.

use crate::rules::SUFFIX_DESCRIPTIONS;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Dictionary source not found: {}", path.display())]
    MissingResource { path: PathBuf },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameDictionary {
    /// Keyed by upper-cased table code.
    #[serde(default)]
    tables: HashMap<String, String>,
    #[serde(default)]
    columns: HashMap<String, String>,
}

impl NameDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, DictionaryError> {
        let raw: NameDictionary = serde_json::from_str(json)?;
        let mut dict = Self::new();
        for (code, meaning) in raw.tables {
            dict.insert_table(&code, &meaning);
        }
        for (code, meaning) in raw.columns {
            dict.insert_column(&code, &meaning);
        }
        Ok(dict)
    }

    /// Load the table list (`table_code`, `explanation_cn`, `explanation_en`).
    pub fn load_tables_csv<R: Read>(&mut self, reader: R) -> Result<usize, DictionaryError> {
        let rows = read_rows(reader, "table_code", "explanation_cn", "explanation_en")?;
        let count = rows.len();
        for (code, meaning) in rows {
            self.insert_table(&code, &meaning);
        }
        Ok(count)
    }

    /// Load column meanings (`column_code`, `meaning_cn`, `meaning_en`).
    pub fn load_columns_csv<R: Read>(&mut self, reader: R) -> Result<usize, DictionaryError> {
        let rows = read_rows(reader, "column_code", "meaning_cn", "meaning_en")?;
        let count = rows.len();
        for (code, meaning) in rows {
            self.insert_column(&code, &meaning);
        }
        Ok(count)
    }

    pub fn insert_table(&mut self, code: &str, meaning: &str) {
        let code = code.trim().to_uppercase();
        if !code.is_empty() && !meaning.is_empty() {
            self.tables.insert(code, meaning.to_string());
        }
    }

    /// The first description recorded for a column name wins.
    pub fn insert_column(&mut self, code: &str, meaning: &str) {
        let code = code.trim();
        if !code.is_empty() && !meaning.is_empty() {
            self.columns
                .entry(code.to_string())
                .or_insert_with(|| meaning.to_string());
        }
    }

    pub fn table_meaning(&self, table: &str) -> Option<&str> {
        self.tables
            .get(&table.to_uppercase())
            .or_else(|| self.tables.get(table))
            .map(String::as_str)
    }

    pub fn column_description(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Dictionary entry, else a guess from the column name ending.
    pub fn describe_column(&self, column: &str) -> Option<String> {
        self.column_description(column)
            .map(str::to_string)
            .or_else(|| heuristic_description(column).map(str::to_string))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty()
    }
}

pub fn heuristic_description(column: &str) -> Option<&'static str> {
    let lower = column.to_lowercase();
    SUFFIX_DESCRIPTIONS
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|(_, desc)| *desc)
}

/// Prefer the first language column unless it is blank or a spreadsheet
/// `nan` placeholder.
fn preferred(primary: &str, secondary: &str) -> String {
    let primary = primary.trim();
    if primary.is_empty() || primary.eq_ignore_ascii_case("nan") {
        secondary.trim().to_string()
    } else {
        primary.to_string()
    }
}

fn read_rows<R: Read>(
    reader: R,
    code_col: &str,
    primary_col: &str,
    secondary_col: &str,
) -> Result<Vec<(String, String)>, DictionaryError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let Some(code_idx) = position(code_col) else {
        warn!("Dictionary CSV has no {code_col} column; skipping");
        return Ok(Vec::new());
    };
    let primary_idx = position(primary_col);
    let secondary_idx = position(secondary_col);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
        let code = field(Some(code_idx)).trim();
        if code.is_empty() {
            continue;
        }
        let meaning = preferred(field(primary_idx), field(secondary_idx));
        rows.push((code.to_string(), meaning));
    }
    Ok(rows)
}

/// Load a dictionary from optional table and column CSV files. Missing or
/// unreadable sources are logged and leave the dictionary partially empty.
pub fn load_or_empty(tables_csv: Option<&Path>, columns_csv: Option<&Path>) -> NameDictionary {
    let mut dict = NameDictionary::new();

    if let Some(path) = tables_csv {
        match open(path).and_then(|f| dict.load_tables_csv(f)) {
            Ok(n) => debug!("Loaded {n} table meanings from {}", path.display()),
            Err(e) => warn!("{e}; table meanings unavailable"),
        }
    }
    if let Some(path) = columns_csv {
        match open(path).and_then(|f| dict.load_columns_csv(f)) {
            Ok(n) => debug!("Loaded {n} column meanings from {}", path.display()),
            Err(e) => warn!("{e}; column meanings unavailable"),
        }
    }
    dict
}

fn open(path: &Path) -> Result<std::fs::File, DictionaryError> {
    if !path.is_file() {
        return Err(DictionaryError::MissingResource {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::File::open(path)?)
}
