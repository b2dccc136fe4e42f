use crate::engine::{ColumnInfo, SchemaGraph};
use crate::measure::column_listing;
use crate::rules::Group;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Rows listed in a node tooltip before the remainder is summarized.
const TOOLTIP_COLUMNS: usize = 12;

/// Discrete node size chosen from connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub fn from_degree(degree: usize) -> Self {
        match degree {
            0..=5 => Self::Small,
            6..=20 => Self::Medium,
            _ => Self::Large,
        }
    }

    pub fn radius(self) -> u32 {
        match self {
            Self::Small => 15,
            Self::Medium => 25,
            Self::Large => 40,
        }
    }
}

/// The set of thematic groups currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilter {
    groups: BTreeSet<Group>,
}

impl GroupFilter {
    pub fn all() -> Self {
        Self {
            groups: Group::ALL.into_iter().collect(),
        }
    }

    pub fn only(groups: impl IntoIterator<Item = Group>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
        }
    }

    /// Parse group names; unknown names are returned alongside the filter.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> (Self, Vec<String>) {
        let mut unknown = Vec::new();
        let mut groups = BTreeSet::new();
        for name in names {
            match Group::from_str(name.as_ref()) {
                Some(g) => {
                    groups.insert(g);
                }
                None => unknown.push(name.as_ref().to_string()),
            }
        }
        (Self { groups }, unknown)
    }

    pub fn contains(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }

    pub fn groups(&self) -> impl Iterator<Item = Group> + '_ {
        self.groups.iter().copied()
    }
}

impl Default for GroupFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PresentedNode {
    pub id: String,
    pub label: String,
    pub group: Group,
    pub color: &'static str,
    /// Incident edges in the unfiltered graph, so a node keeps its size
    /// whichever groups are shown.
    pub degree: usize,
    pub tier: SizeTier,
    pub size: u32,
    pub title: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresentedEdge {
    /// Position in the engine's edge list, stable across filters.
    pub id: usize,
    pub from: String,
    pub to: String,
    pub link_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub description: String,
    pub tables: Vec<String>,
}

/// Filtered, display-ready view of a [`SchemaGraph`].
#[derive(Debug, Clone, Serialize)]
pub struct PresentedGraph {
    pub nodes: Vec<PresentedNode>,
    pub edges: Vec<PresentedEdge>,
    /// Every group of the unfiltered graph, sorted.
    pub groups: Vec<Group>,
    pub selected_groups: Vec<Group>,
    /// Every selectable link key of the unfiltered graph, sorted.
    pub link_keys: Vec<String>,
    pub field_info: BTreeMap<String, FieldInfo>,
}

impl PresentedGraph {
    /// Derive sizes and tooltips, then keep nodes of selected groups and
    /// edges whose endpoints both survive. `graph` is not modified.
    pub fn build(graph: &SchemaGraph, filter: &GroupFilter) -> Self {
        let degrees = graph.degrees();

        let nodes: Vec<PresentedNode> = graph
            .nodes
            .iter()
            .filter(|n| filter.contains(n.group))
            .map(|n| {
                let degree = degrees.get(n.name.as_str()).copied().unwrap_or(0);
                let tier = SizeTier::from_degree(degree);
                PresentedNode {
                    id: n.name.clone(),
                    label: n.name.clone(),
                    group: n.group,
                    color: n.group.color(),
                    degree,
                    tier,
                    size: tier.radius(),
                    title: tooltip(&n.name, n.meaning.as_deref(), &n.columns),
                    columns: n.columns.clone(),
                }
            })
            .collect();

        let visible: BTreeSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let edges: Vec<PresentedEdge> = graph
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                visible.contains(e.table_a.as_str()) && visible.contains(e.table_b.as_str())
            })
            .map(|(id, e)| PresentedEdge {
                id,
                from: e.table_a.clone(),
                to: e.table_b.clone(),
                link_key: e.link_key.clone(),
            })
            .collect();

        PresentedGraph {
            nodes,
            edges,
            groups: graph.groups(),
            selected_groups: filter.groups().collect(),
            link_keys: graph.link_keys(),
            field_info: field_info(graph),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge(&self, id: usize) -> Option<&PresentedEdge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

fn tooltip(name: &str, meaning: Option<&str>, columns: &[ColumnInfo]) -> String {
    let rows: Vec<(&str, &str, &str)> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.declared_type.as_str(), c.description.as_str()))
        .collect();
    let mut title = format!(
        "[ {name} ]\n\nMeaning: {}\nColumns: {}",
        meaning.unwrap_or(name),
        columns.len()
    );
    if !rows.is_empty() {
        title.push_str("\n\n");
        title.push_str(&column_listing(&rows, TOOLTIP_COLUMNS));
    }
    title
}

/// Description and containing tables of every link key.
fn field_info(graph: &SchemaGraph) -> BTreeMap<String, FieldInfo> {
    graph
        .column_index
        .keys()
        .map(|key| {
            let description = graph
                .nodes
                .iter()
                .flat_map(|n| n.columns.iter())
                .find(|c| c.name == key && !c.description.is_empty())
                .map(|c| c.description.clone())
                .unwrap_or_else(|| key.to_string());
            let info = FieldInfo {
                description,
                tables: graph.column_index.tables(key).to_vec(),
            };
            (key.to_string(), info)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::NameDictionary;
    use crate::engine::InferenceEngine;
    use crate::metadata::InMemoryMetadata;

    fn graph() -> SchemaGraph {
        let meta = InMemoryMetadata::new()
            .with_table("BIOG_MAIN", &[("c_personid", "INTEGER"), ("c_name_chn", "TEXT")])
            .with_table("POSTED_TO_OFFICE_DATA", &[
                ("c_personid", "INTEGER"),
                ("c_office_id", "INTEGER"),
            ])
            .with_table("OFFICE_CODES", &[("c_office_id", "INTEGER")])
            .with_table("KIN_DATA", &[("c_personid", "INTEGER")]);
        InferenceEngine::new().infer(&meta, &NameDictionary::new())
    }

    #[test]
    fn test_size_tiers() {
        assert_eq!(SizeTier::from_degree(0), SizeTier::Small);
        assert_eq!(SizeTier::from_degree(5), SizeTier::Small);
        assert_eq!(SizeTier::from_degree(6), SizeTier::Medium);
        assert_eq!(SizeTier::from_degree(20), SizeTier::Medium);
        assert_eq!(SizeTier::from_degree(21), SizeTier::Large);
        assert_eq!(SizeTier::Large.radius(), 40);
    }

    #[test]
    fn test_build_all_groups() {
        let g = graph();
        let p = PresentedGraph::build(&g, &GroupFilter::all());
        assert_eq!(p.nodes.len(), 4);
        assert_eq!(p.edges.len(), g.edges.len());
        let biog = p.nodes.iter().find(|n| n.id == "BIOG_MAIN").unwrap();
        assert_eq!(biog.degree, 2);
        assert_eq!(biog.size, 15);
        assert_eq!(biog.color, "#FFCDD2");
    }

    #[test]
    fn test_filter_drops_edges_with_hidden_endpoint() {
        let g = graph();
        let p = PresentedGraph::build(&g, &GroupFilter::only([Group::Core, Group::Office]));
        let ids: Vec<&str> = p.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["BIOG_MAIN", "POSTED_TO_OFFICE_DATA", "OFFICE_CODES"]);
        assert!(p.edges.iter().all(|e| e.from != "KIN_DATA" && e.to != "KIN_DATA"));
        assert_eq!(p.edges.len(), 2);
        // Vocabulary and degrees still describe the whole graph.
        assert_eq!(p.groups.len(), 3);
        assert_eq!(p.nodes[0].degree, 2);
        assert_eq!(g.edges.len(), 3);
    }

    #[test]
    fn test_edge_ids_stable_across_filters() {
        let g = graph();
        let all = PresentedGraph::build(&g, &GroupFilter::all());
        let some = PresentedGraph::build(&g, &GroupFilter::only([Group::Office]));
        for e in &some.edges {
            assert_eq!(all.edge(e.id).unwrap().link_key, e.link_key);
        }
    }

    #[test]
    fn test_empty_filter() {
        let p = PresentedGraph::build(&graph(), &GroupFilter::only(Vec::<Group>::new()));
        assert!(p.is_empty());
        assert!(p.edges.is_empty());
    }

    #[test]
    fn test_from_names() {
        let (filter, unknown) = GroupFilter::from_names(&["core", "Office", "bogus"]);
        assert!(filter.contains(Group::Core));
        assert!(filter.contains(Group::Office));
        assert!(!filter.contains(Group::Dict));
        assert_eq!(unknown, vec!["bogus"]);
    }

    #[test]
    fn test_tooltip_and_field_info() {
        let p = PresentedGraph::build(&graph(), &GroupFilter::all());
        let biog = p.nodes.iter().find(|n| n.id == "BIOG_MAIN").unwrap();
        assert!(biog.title.starts_with("[ BIOG_MAIN ]\n\nMeaning: BIOG_MAIN\nColumns: 2"));
        assert!(biog.title.contains("c_name_chn  TEXT     Chinese name"));

        let info = &p.field_info["c_personid"];
        assert_eq!(info.description, "c_personid");
        assert_eq!(info.tables.len(), 3);
        assert_eq!(p.field_info["c_office_id"].description, "ID (FK)");
    }
}
