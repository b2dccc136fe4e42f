//! Relationship inference engine.
//!
//! Turns raw table/column metadata into a [`SchemaGraph`]: one node per
//! readable table, a deduplicated list of inferred relationships and an
//! index from column name to the tables containing it. Relationships come
//! from naming conventions, not from declared foreign keys, and are built
//! in three ordered passes:
//!
//! 1. strong links ([`STRONG_LINKS`]),
//! 2. lookup-table naming conventions ([`TARGET_PATTERNS`]),
//! 3. orphan rescue through shared column names.

use crate::dictionary::NameDictionary;
use crate::metadata::MetadataProvider;
use crate::rules::{self, Group, STRONG_LINKS, TARGET_PATTERNS};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    /// Empty when neither the dictionary nor the name suggests a meaning.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableNode {
    pub name: String,
    pub group: Group,
    pub meaning: Option<String>,
    pub columns: Vec<ColumnInfo>,
}

/// Which pass produced a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkSource {
    Strong,
    Naming,
    Orphan,
}

/// An undirected connection between two distinct tables, justified by a
/// column name.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub table_a: String,
    pub table_b: String,
    pub link_key: String,
    pub source: LinkSource,
}

impl Relationship {
    /// Identity used for deduplication: the unordered pair plus the key.
    pub fn identity(&self) -> (&str, &str, &str) {
        let (a, b) = ordered(&self.table_a, &self.table_b);
        (a, b, &self.link_key)
    }

    pub fn touches(&self, table: &str) -> bool {
        self.table_a == table || self.table_b == table
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Relationship {}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Column name to the tables containing it, in table insertion order.
/// Ignored bookkeeping columns never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl ColumnIndex {
    fn insert(&mut self, column: &str, table: &str) {
        let tables = self.entries.entry(column.to_string()).or_default();
        if !tables.iter().any(|t| t == table) {
            tables.push(table.to_string());
        }
    }

    pub fn tables(&self, column: &str) -> &[String] {
        self.entries.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted link-key vocabulary.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable engine output handed to the presentation layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaGraph {
    pub nodes: Vec<TableNode>,
    pub edges: Vec<Relationship>,
    pub column_index: ColumnIndex,
}

impl SchemaGraph {
    pub fn node(&self, name: &str) -> Option<&TableNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn degree(&self, table: &str) -> usize {
        self.edges.iter().filter(|e| e.touches(table)).count()
    }

    pub fn degrees(&self) -> HashMap<&str, usize> {
        let mut degrees: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.name.as_str(), 0)).collect();
        for edge in &self.edges {
            for end in [&edge.table_a, &edge.table_b] {
                if let Some(d) = degrees.get_mut(end.as_str()) {
                    *d += 1;
                }
            }
        }
        degrees
    }

    /// Sorted, non-ignored column names selectable as link keys.
    pub fn link_keys(&self) -> Vec<String> {
        self.column_index.keys().map(str::to_string).collect()
    }

    /// Sorted distinct groups present in the graph.
    pub fn groups(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = self.nodes.iter().map(|n| n.group).collect();
        groups.sort();
        groups.dedup();
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Accumulates relationships, rejecting self-links and duplicates.
#[derive(Default)]
struct EdgeSet {
    edges: Vec<Relationship>,
    seen: HashSet<(String, String, String)>,
    linked: HashSet<String>,
}

impl EdgeSet {
    fn add(&mut self, from: &str, to: &str, key: &str, source: LinkSource) -> bool {
        if from == to {
            return false;
        }
        let (a, b) = ordered(from, to);
        if !self
            .seen
            .insert((a.to_string(), b.to_string(), key.to_string()))
        {
            return false;
        }
        debug!("{source:?} link {from} -- {to} via {key}");
        self.linked.insert(from.to_string());
        self.linked.insert(to.to_string());
        self.edges.push(Relationship {
            table_a: from.to_string(),
            table_b: to.to_string(),
            link_key: key.to_string(),
            source,
        });
        true
    }

    fn is_linked(&self, table: &str) -> bool {
        self.linked.contains(table)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine;

impl InferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all passes over the provider's tables. Unreadable tables are
    /// dropped; an empty provider yields an empty graph.
    pub fn infer(&self, provider: &dyn MetadataProvider, dict: &NameDictionary) -> SchemaGraph {
        let nodes = self.build_nodes(provider, dict);

        let mut column_index = ColumnIndex::default();
        for node in &nodes {
            for col in &node.columns {
                if !rules::is_ignored(&col.name) {
                    column_index.insert(&col.name, &node.name);
                }
            }
        }

        // Upper-cased name -> stored name, for case-insensitive matching.
        let by_upper: HashMap<String, &str> = nodes
            .iter()
            .map(|n| (n.name.to_uppercase(), n.name.as_str()))
            .collect();

        let mut edges = EdgeSet::default();
        for node in &nodes {
            self.link_by_convention(node, &by_upper, &mut edges);
        }
        self.rescue_orphans(&nodes, &column_index, &mut edges);

        info!(
            "Inferred {} relationships across {} tables ({} link keys)",
            edges.edges.len(),
            nodes.len(),
            column_index.len()
        );

        SchemaGraph {
            nodes,
            edges: edges.edges,
            column_index,
        }
    }

    fn build_nodes(&self, provider: &dyn MetadataProvider, dict: &NameDictionary) -> Vec<TableNode> {
        let mut nodes = Vec::new();
        let mut names = HashSet::new();

        for table in provider.list_tables() {
            if !names.insert(table.clone()) {
                continue;
            }
            let raw = match provider.columns(&table) {
                Ok(columns) => columns,
                Err(e) => {
                    warn!("Skipping table: {e}");
                    continue;
                }
            };
            let columns = raw
                .into_iter()
                .map(|c| ColumnInfo {
                    description: dict.describe_column(&c.name).unwrap_or_default(),
                    name: c.name,
                    declared_type: c.declared_type,
                })
                .collect();
            nodes.push(TableNode {
                group: rules::classify(&table),
                meaning: dict.table_meaning(&table).map(str::to_string),
                name: table,
                columns,
            });
        }
        nodes
    }

    /// Passes 1 and 2 for one table.
    fn link_by_convention(
        &self,
        node: &TableNode,
        by_upper: &HashMap<String, &str>,
        edges: &mut EdgeSet,
    ) {
        for col in &node.columns {
            if rules::is_ignored(&col.name) {
                continue;
            }

            let strong = STRONG_LINKS
                .iter()
                .find(|l| l.column.eq_ignore_ascii_case(&col.name))
                .and_then(|l| by_upper.get(l.target));
            if let Some(target) = strong {
                edges.add(&node.name, target, &col.name, LinkSource::Strong);
                continue;
            }

            let Some(root) = rules::reference_root(&node.name, &col.name) else {
                continue;
            };
            let target = TARGET_PATTERNS
                .iter()
                .filter_map(|p| by_upper.get(&p.apply(&root)))
                .find(|t| **t != node.name);
            if let Some(target) = target {
                edges.add(&node.name, target, &col.name, LinkSource::Naming);
            }
        }
    }

    /// Pass 3: link every still-unconnected table through its first column
    /// shared with another table.
    fn rescue_orphans(&self, nodes: &[TableNode], index: &ColumnIndex, edges: &mut EdgeSet) {
        let orphans: Vec<&TableNode> = nodes.iter().filter(|n| !edges.is_linked(&n.name)).collect();
        debug!("{} orphan tables after naming inference", orphans.len());

        for orphan in orphans {
            if edges.is_linked(&orphan.name) {
                continue;
            }
            for col in orphan.columns.iter().filter(|c| !rules::is_ignored(&c.name)) {
                let other = index.tables(&col.name).iter().find(|t| **t != orphan.name);
                if let Some(other) = other {
                    if edges.add(&orphan.name, other, &col.name, LinkSource::Orphan) {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryMetadata;

    fn infer(meta: &InMemoryMetadata) -> SchemaGraph {
        InferenceEngine::new().infer(meta, &NameDictionary::new())
    }

    fn has_edge(g: &SchemaGraph, a: &str, b: &str, key: &str) -> bool {
        let (x, y) = ordered(a, b);
        g.edges.iter().any(|e| e.identity() == (x, y, key))
    }

    fn cbdb_like() -> InMemoryMetadata {
        InMemoryMetadata::new()
            .with_table("BIOG_MAIN", &[
                ("c_personid", "INTEGER"),
                ("c_name_chn", "TEXT"),
                ("c_dy", "INTEGER"),
                ("c_index_addr_id", "INTEGER"),
                ("c_notes", "TEXT"),
            ])
            .with_table("DYNASTIES", &[("c_dy", "INTEGER"), ("c_dynasty_chn", "TEXT")])
            .with_table("ADDR_CODES", &[("c_addr_id", "INTEGER"), ("c_name_chn", "TEXT")])
            .with_table("ENTRY_DATA", &[
                ("c_personid", "INTEGER"),
                ("c_entry_code", "INTEGER"),
                ("c_notes", "TEXT"),
            ])
            .with_table("ENTRY_CODES", &[("c_entry_code", "INTEGER")])
            .with_table("KIN_DATA", &[("c_personid", "INTEGER"), ("c_kin_code", "INTEGER")])
            .with_table("NIAN_HAO", &[("c_nianhao_id", "INTEGER"), ("c_dy", "INTEGER")])
    }

    #[test]
    fn test_groups_assigned() {
        let g = infer(&cbdb_like());
        let group = |n: &str| g.node(n).unwrap().group;
        assert_eq!(group("BIOG_MAIN"), Group::Core);
        assert_eq!(group("DYNASTIES"), Group::Dict);
        assert_eq!(group("ENTRY_DATA"), Group::Entry);
        assert_eq!(group("KIN_DATA"), Group::Kinship);
        assert_eq!(group("NIAN_HAO"), Group::Other);
    }

    #[test]
    fn test_strong_links() {
        let g = infer(&cbdb_like());
        assert!(has_edge(&g, "ENTRY_DATA", "BIOG_MAIN", "c_personid"));
        assert!(has_edge(&g, "KIN_DATA", "BIOG_MAIN", "c_personid"));
        assert!(has_edge(&g, "BIOG_MAIN", "DYNASTIES", "c_dy"));
        assert!(has_edge(&g, "NIAN_HAO", "DYNASTIES", "c_dy"));
        let strong = g.edges.iter().find(|e| e.link_key == "c_dy").unwrap();
        assert_eq!(strong.source, LinkSource::Strong);
    }

    #[test]
    fn test_naming_links() {
        let g = infer(&cbdb_like());
        assert!(has_edge(&g, "BIOG_MAIN", "ADDR_CODES", "c_index_addr_id"));
        assert!(has_edge(&g, "ENTRY_DATA", "ENTRY_CODES", "c_entry_code"));
        // ENTRY_CODES' own c_entry_code resolves to ENTRY_CODES first, which
        // is skipped, then ENTRY_DATA.
        assert!(has_edge(&g, "ENTRY_CODES", "ENTRY_DATA", "c_entry_code"));
        assert_eq!(
            g.edges.iter().filter(|e| e.link_key == "c_entry_code").count(),
            1
        );
    }

    #[test]
    fn test_self_referencing_id_column() {
        let meta = InMemoryMetadata::new()
            .with_table("PERSON", &[("id", "INTEGER"), ("name", "TEXT")])
            .with_table("PERSON_CODES", &[("id", "INTEGER"), ("label", "TEXT")]);
        let g = infer(&meta);
        assert_eq!(g.edges.len(), 1);
        assert!(has_edge(&g, "PERSON", "PERSON_CODES", "id"));
        assert_eq!(g.edges[0].source, LinkSource::Naming);
    }

    #[test]
    fn test_first_candidate_wins() {
        let meta = InMemoryMetadata::new()
            .with_table("POSTING", &[("c_office_id", "INTEGER")])
            .with_table("CODE_OFFICE", &[("x", "INTEGER")])
            .with_table("OFFICE_DATA", &[("y", "INTEGER")])
            .with_table("OFFICE_CODES", &[("z", "INTEGER")]);
        let g = infer(&meta);
        let naming: Vec<_> = g
            .edges
            .iter()
            .filter(|e| e.source == LinkSource::Naming)
            .collect();
        assert_eq!(naming.len(), 1);
        assert!(has_edge(&g, "POSTING", "OFFICE_CODES", "c_office_id"));
    }

    #[test]
    fn test_candidate_match_is_case_insensitive() {
        let meta = InMemoryMetadata::new()
            .with_table("postings", &[("c_office_id", "INTEGER")])
            .with_table("office_codes", &[("c_office_id", "INTEGER")]);
        let g = infer(&meta);
        assert!(has_edge(&g, "postings", "office_codes", "c_office_id"));
    }

    #[test]
    fn test_short_root_ignored() {
        let meta = InMemoryMetadata::new()
            .with_table("A", &[("c_xy_id", "INTEGER")])
            .with_table("XY_CODES", &[("k", "INTEGER")]);
        let g = infer(&meta);
        assert!(g.edges.is_empty());
    }

    #[test]
    fn test_orphan_rescue() {
        let meta = InMemoryMetadata::new()
            .with_table("ORPHAN_X", &[("c_notes", "TEXT"), ("foo_code", "INTEGER")])
            .with_table("OTHER_Y", &[("foo_code", "INTEGER")])
            .with_table("THIRD_Z", &[("foo_code", "INTEGER")]);
        let g = infer(&meta);
        assert!(has_edge(&g, "ORPHAN_X", "OTHER_Y", "foo_code"));
        assert!(g.edges.iter().all(|e| e.source == LinkSource::Orphan));
        // THIRD_Z is still an orphan when visited and links to ORPHAN_X,
        // the first other table in index order.
        assert!(has_edge(&g, "THIRD_Z", "ORPHAN_X", "foo_code"));
        assert_eq!(g.edges.len(), 2);
    }

    #[test]
    fn test_orphan_rescue_stops_after_first_link() {
        let meta = InMemoryMetadata::new()
            .with_table("LONELY", &[("a", "TEXT"), ("b", "TEXT")])
            .with_table("FRIEND", &[("a", "TEXT"), ("b", "TEXT")]);
        let g = infer(&meta);
        assert_eq!(g.edges.len(), 1);
        assert!(has_edge(&g, "LONELY", "FRIEND", "a"));
    }

    #[test]
    fn test_ignored_columns_never_link() {
        let meta = InMemoryMetadata::new()
            .with_table("T1", &[("c_notes", "TEXT"), ("c_source", "INTEGER")])
            .with_table("T2", &[("c_notes", "TEXT"), ("c_source", "INTEGER")]);
        let g = infer(&meta);
        assert!(g.edges.is_empty());
        assert!(g.link_keys().is_empty());
    }

    #[test]
    fn test_no_self_or_duplicate_edges() {
        let g = infer(&cbdb_like());
        let mut seen = HashSet::new();
        for e in &g.edges {
            assert_ne!(e.table_a, e.table_b);
            assert!(seen.insert(e.identity()), "duplicate {e:?}");
        }
    }

    #[test]
    fn test_every_sharing_table_is_connected() {
        let g = infer(&cbdb_like());
        for node in &g.nodes {
            let shares = node
                .columns
                .iter()
                .any(|c| g.column_index.tables(&c.name).len() > 1);
            if shares {
                assert!(g.degree(&node.name) >= 1, "{} is isolated", node.name);
            }
        }
    }

    #[test]
    fn test_unreadable_table_dropped() {
        let meta = InMemoryMetadata::new()
            .with_table("OFFICE_DATA", &[("c_personid", "INTEGER")])
            .with_unreadable_table("BIOG_MAIN");
        let g = infer(&meta);
        assert_eq!(g.nodes.len(), 1);
        assert!(g.edges.is_empty());
    }

    #[test]
    fn test_empty_database() {
        let g = infer(&InMemoryMetadata::new());
        assert!(g.is_empty());
        assert!(g.edges.is_empty());
        assert!(g.link_keys().is_empty());
        assert!(g.groups().is_empty());
    }

    #[test]
    fn test_idempotent() {
        let meta = cbdb_like();
        let first = infer(&meta);
        let second = infer(&meta);
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.column_index, second.column_index);
    }

    #[test]
    fn test_vocabulary_sorted() {
        let g = infer(&cbdb_like());
        let keys = g.link_keys();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(!keys.contains(&"c_notes".to_string()));
        assert_eq!(
            g.groups(),
            vec![Group::Core, Group::Kinship, Group::Entry, Group::Dict, Group::Other]
        );
    }

    #[test]
    fn test_descriptions_and_meanings() {
        let mut dict = NameDictionary::new();
        dict.insert_table("BIOG_MAIN", "Biographies");
        dict.insert_column("c_dy", "Dynasty");
        let g = InferenceEngine::new().infer(&cbdb_like(), &dict);
        let biog = g.node("BIOG_MAIN").unwrap();
        assert_eq!(biog.meaning.as_deref(), Some("Biographies"));
        let desc = |name: &str| {
            biog.columns
                .iter()
                .find(|c| c.name == name)
                .unwrap()
                .description
                .clone()
        };
        assert_eq!(desc("c_dy"), "Dynasty");
        assert_eq!(desc("c_name_chn"), "Chinese name");
        assert_eq!(desc("c_notes"), "");
        assert!(g.node("NIAN_HAO").unwrap().meaning.is_none());
    }
}
