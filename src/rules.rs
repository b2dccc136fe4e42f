//! Ordered rule tables driving grouping and relationship inference.
//!
//! Every heuristic the engine applies is described here as data. The
//! engine iterates these lists generically, so adding a group keyword, a
//! strong link or a lookup-table naming convention never touches dispatch
//! logic. List order is priority order.

use serde::{Deserialize, Serialize};

/// Thematic category used for visual clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Group {
    Core,
    Office,
    Kinship,
    Social,
    Entry,
    Text,
    Dict,
    Other,
}

impl Group {
    pub const ALL: [Group; 8] = [
        Group::Core,
        Group::Office,
        Group::Kinship,
        Group::Social,
        Group::Entry,
        Group::Text,
        Group::Dict,
        Group::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "Core",
            Self::Office => "Office",
            Self::Kinship => "Kinship",
            Self::Social => "Social",
            Self::Entry => "Entry",
            Self::Text => "Text",
            Self::Dict => "Dict",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive parse of a group name.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Fill color of nodes in this group.
    pub fn color(self) -> &'static str {
        match self {
            Self::Core => "#FFCDD2",
            Self::Office => "#BBDEFB",
            Self::Kinship => "#C8E6C9",
            Self::Social => "#E1BEE7",
            Self::Entry => "#FFE0B2",
            Self::Text => "#D7CCC8",
            Self::Dict => "#F5F5F5",
            Self::Other => "#E0E0E0",
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table whose upper-cased name contains any keyword belongs to `group`.
#[derive(Debug, Clone, Copy)]
pub struct GroupRule {
    pub group: Group,
    pub keywords: &'static [&'static str],
}

/// Grouping rules, first match wins. A name such as `KIN_OFFICE_DATA`
/// resolves to `Office` because that rule is listed before `Kinship`.
pub const GROUP_RULES: &[GroupRule] = &[
    GroupRule { group: Group::Core, keywords: &["BIOG"] },
    GroupRule { group: Group::Office, keywords: &["OFFICE", "POSTED", "APPT"] },
    GroupRule { group: Group::Kinship, keywords: &["KIN"] },
    GroupRule { group: Group::Social, keywords: &["ASSOC"] },
    GroupRule { group: Group::Entry, keywords: &["ENTRY"] },
    GroupRule { group: Group::Text, keywords: &["TEXT"] },
    GroupRule { group: Group::Dict, keywords: &["CODES", "DYNAST", "ADDR"] },
];

/// Assign the thematic group of a table name.
pub fn classify(table: &str) -> Group {
    let upper = table.to_uppercase();
    GROUP_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| upper.contains(k)))
        .map(|rule| rule.group)
        .unwrap_or(Group::Other)
}

/// A column that always references a canonical table when that table exists.
#[derive(Debug, Clone, Copy)]
pub struct StrongLink {
    pub column: &'static str,
    pub target: &'static str,
}

pub const STRONG_LINKS: &[StrongLink] = &[
    StrongLink { column: "c_personid", target: "BIOG_MAIN" },
    StrongLink { column: "c_dy", target: "DYNASTIES" },
];

/// Column name endings that mark a code or identifier reference.
pub const REFERENCE_SUFFIXES: &[&str] = &["_code", "_id"];

/// Conventional column prefixes, stripped from the front in this order.
pub const COLUMN_PREFIXES: &[&str] = &["c_", "index_"];

/// Roots of this length or shorter are too ambiguous to match.
pub const MIN_ROOT_LEN: usize = 3;

/// How a candidate lookup-table name is built from a root token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPattern {
    /// `ROOT` followed by the suffix.
    Suffix(&'static str),
    /// The prefix followed by `ROOT`.
    Prefix(&'static str),
}

impl TargetPattern {
    pub fn apply(self, root: &str) -> String {
        match self {
            Self::Suffix(s) => format!("{root}{s}"),
            Self::Prefix(p) => format!("{p}{root}"),
        }
    }
}

/// Lookup-table naming conventions, tried in order for every root.
pub const TARGET_PATTERNS: &[TargetPattern] = &[
    TargetPattern::Suffix("_CODES"),
    TargetPattern::Suffix("_DATA"),
    TargetPattern::Prefix("CODE_"),
];

/// Audit and bookkeeping columns that never justify a relationship.
pub const IGNORED_COLUMNS: &[&str] = &[
    "c_created_by",
    "c_created_date",
    "c_modified_by",
    "c_modified_date",
    "tts_sysno",
    "c_notes",
    "c_source",
    "c_pages",
];

pub fn is_ignored(column: &str) -> bool {
    IGNORED_COLUMNS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(column))
}

/// Descriptions guessed from a column name ending.
pub const SUFFIX_DESCRIPTIONS: &[(&str, &str)] = &[
    ("_chn", "Chinese name"),
    ("_code", "Code (FK)"),
    ("_id", "ID (FK)"),
    ("_year", "Year"),
];

/// Derive the candidate root token of a reference column.
///
/// Returns `None` when the column carries no reference suffix or when the
/// root is too short. A column reduced to the bare token (`id`, `c_code`)
/// refers to its own table, so the root is the table name.
pub fn reference_root(table: &str, column: &str) -> Option<String> {
    let lower = column.to_lowercase();

    let mut stripped = lower.as_str();
    for prefix in COLUMN_PREFIXES {
        if let Some(rest) = stripped.strip_prefix(prefix) {
            stripped = rest;
        }
    }

    let root = if REFERENCE_SUFFIXES
        .iter()
        .any(|s| s.trim_start_matches('_') == stripped)
    {
        table.to_uppercase()
    } else {
        let suffix = REFERENCE_SUFFIXES.iter().find(|s| stripped.ends_with(*s))?;
        stripped[..stripped.len() - suffix.len()].to_uppercase()
    };

    (root.chars().count() >= MIN_ROOT_LEN).then_some(root)
}

/// Candidate target table names for a root, in priority order.
pub fn candidate_targets(root: &str) -> Vec<String> {
    TARGET_PATTERNS.iter().map(|p| p.apply(root)).collect()
}
