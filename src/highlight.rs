//! Interactive link-key highlighting.
//!
//! Highlighting never adds, removes or moves graph elements. Each edge's
//! color, width and label are a pure function of its link key and the
//! current [`HighlightState`], recomputed for every edge on every change.
//! The exported page runs the same rules in its embedded script, driven by
//! the constants below.

use crate::presentation::PresentedGraph;
use serde::Serialize;

pub const NEUTRAL_COLOR: &str = "#CFD8DC";
pub const EMPHASIS_COLOR: &str = "#FF4500";
pub const MUTED_COLOR: &str = "#E0E0E0";
pub const THIN_WIDTH: u32 = 1;
pub const THICK_WIDTH: u32 = 4;
/// Label text of an edge whose label is hidden.
pub const BLANK_LABEL: &str = " ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Neutral,
    Emphasized,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeStyle {
    pub emphasis: Emphasis,
    pub color: &'static str,
    pub width: u32,
    /// `None` renders as [`BLANK_LABEL`].
    pub label: Option<String>,
}

/// Visual state of one edge.
pub fn edge_style(link_key: &str, selected: Option<&str>, show_all_labels: bool) -> EdgeStyle {
    let emphasis = match selected {
        None => Emphasis::Neutral,
        Some(key) if key == link_key => Emphasis::Emphasized,
        Some(_) => Emphasis::Muted,
    };
    let (color, width) = match emphasis {
        Emphasis::Neutral => (NEUTRAL_COLOR, THIN_WIDTH),
        Emphasis::Emphasized => (EMPHASIS_COLOR, THICK_WIDTH),
        Emphasis::Muted => (MUTED_COLOR, THIN_WIDTH),
    };
    let label = (show_all_labels || emphasis == Emphasis::Emphasized).then(|| link_key.to_string());
    EdgeStyle {
        emphasis,
        color,
        width,
        label,
    }
}

/// A discrete user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// A key chosen from the selector.
    SelectKey(String),
    /// A click on an edge, by [`PresentedEdge::id`](crate::presentation::PresentedEdge::id).
    PickEdge(usize),
    /// A click on empty canvas.
    Clear,
    ShowAllLabels(bool),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightState {
    pub selected_link_key: Option<String>,
    pub show_all_labels: bool,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event. Returns `true` when the state changed. Picking an
    /// edge selects its key exactly as choosing that key would; an empty
    /// key selects nothing.
    pub fn apply(&mut self, event: SelectionEvent, graph: &PresentedGraph) -> bool {
        let before = self.clone();
        match event {
            SelectionEvent::SelectKey(key) => {
                self.selected_link_key = (!key.is_empty()).then_some(key);
            }
            SelectionEvent::PickEdge(id) => {
                if let Some(edge) = graph.edge(id) {
                    self.selected_link_key = Some(edge.link_key.clone());
                }
            }
            SelectionEvent::Clear => self.selected_link_key = None,
            SelectionEvent::ShowAllLabels(show) => self.show_all_labels = show,
        }
        *self != before
    }

    pub fn style_for(&self, link_key: &str) -> EdgeStyle {
        edge_style(link_key, self.selected_link_key.as_deref(), self.show_all_labels)
    }

    /// Styles of every rendered edge, in edge order.
    pub fn restyle(&self, graph: &PresentedGraph) -> Vec<(usize, EdgeStyle)> {
        graph
            .edges
            .iter()
            .map(|e| (e.id, self.style_for(&e.link_key)))
            .collect()
    }
}
