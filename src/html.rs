//! Self-contained HTML export.
//!
//! The page carries an inline SVG drawing, the graph state as embedded
//! JSON and the highlight script, so it works offline once saved.

use crate::config::RenderConfig;
use crate::engine::SchemaGraph;
use crate::highlight::{
    BLANK_LABEL, EMPHASIS_COLOR, MUTED_COLOR, NEUTRAL_COLOR, THICK_WIDTH, THIN_WIDTH,
};
use crate::layout::{Layout, LayoutEngine, LayoutNode};
use crate::measure::TextMetrics;
use crate::presentation::{GroupFilter, PresentedGraph};
use crate::rules::Group;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No tables in the selected groups; available groups: {}", available.join(", "))]
    EmptySelection { available: Vec<String> },
    #[error("Cannot embed graph state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Filter, lay out and render a schema graph into a standalone page.
///
/// An empty schema renders a labelled empty page. A non-empty schema whose
/// nodes are all excluded by `filter` is a [`RenderError::EmptySelection`];
/// `graph` stays usable with another filter.
pub fn render_page(
    graph: &SchemaGraph,
    filter: &GroupFilter,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let presented = PresentedGraph::build(graph, filter);
    if presented.is_empty() && !graph.is_empty() {
        let available: Vec<String> = graph.groups().iter().map(|g| g.to_string()).collect();
        warn!("Group filter excludes every table");
        return Err(RenderError::EmptySelection { available });
    }
    let layout = LayoutEngine::from_config(config).layout(&presented);
    debug!(
        "Rendering {} nodes and {} edges on a {}x{} canvas",
        presented.nodes.len(),
        presented.edges.len(),
        layout.width,
        layout.height
    );
    HtmlRenderer::new(config.clone()).render(&presented, &layout)
}

/// Everything the page script needs, serialized once into the document.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddedState<'a> {
    nodes: Vec<EmbeddedNode<'a>>,
    edges: &'a [crate::presentation::PresentedEdge],
    groups: &'a [Group],
    selected_groups: &'a [Group],
    group_colors: BTreeMap<&'static str, &'static str>,
    link_keys: &'a [String],
    field_info: &'a BTreeMap<String, crate::presentation::FieldInfo>,
    style: EmbeddedStyle,
}

#[derive(Serialize)]
struct EmbeddedNode<'a> {
    id: &'a str,
    group: Group,
    title: &'a str,
    columns: &'a [crate::engine::ColumnInfo],
}

#[derive(Serialize)]
struct EmbeddedStyle {
    neutral: &'static str,
    emphasis: &'static str,
    muted: &'static str,
    thin: u32,
    thick: u32,
    blank: &'static str,
}

pub struct HtmlRenderer {
    config: RenderConfig,
    metrics: TextMetrics,
}

impl HtmlRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            metrics: TextMetrics::default(),
        }
    }

    pub fn render(&self, graph: &PresentedGraph, layout: &Layout) -> Result<String, RenderError> {
        let mut html = String::new();
        let title = escape_html(&self.config.title);

        writeln!(html, "<!DOCTYPE html>")?;
        writeln!(html, r#"<html lang="en">"#)?;
        writeln!(html, "<head>")?;
        writeln!(html, r#"<meta charset="utf-8">"#)?;
        writeln!(html, "<title>{title}</title>")?;
        writeln!(html, "<style>{PAGE_CSS}</style>")?;
        writeln!(html, "</head>")?;
        writeln!(html, "<body>")?;
        writeln!(html, "<h1>{title}</h1>")?;

        if graph.is_empty() {
            writeln!(
                html,
                r#"<p class="empty">No tables found. The database is missing or has no readable tables.</p>"#
            )?;
        } else {
            self.render_controls(&mut html, graph)?;
            self.render_svg(&mut html, graph, layout)?;
            writeln!(
                html,
                r#"<div id="table-docs"><h2 id="table-docs-name"></h2><table><thead><tr><th>Column</th><th>Type</th><th>Description</th></tr></thead><tbody id="table-docs-body"></tbody></table></div>"#
            )?;
        }

        self.render_state(&mut html, graph)?;
        if !graph.is_empty() {
            writeln!(html, "<script>{PAGE_JS}</script>")?;
        }
        writeln!(html, "</body>")?;
        writeln!(html, "</html>")?;
        Ok(html)
    }

    fn render_controls(&self, html: &mut String, graph: &PresentedGraph) -> std::fmt::Result {
        writeln!(html, r#"<div id="control-panel">"#)?;
        writeln!(html, r#"<div id="control-panel-header">Field Lens</div>"#)?;
        writeln!(html, r#"<div class="panel-body">"#)?;

        writeln!(html, r#"<select id="field-selector">"#)?;
        writeln!(html, r#"<option value="">(click an edge or choose a field)</option>"#)?;
        for key in &graph.link_keys {
            let key = escape_html(key);
            writeln!(html, r#"<option value="{key}">{key}</option>"#)?;
        }
        writeln!(html, "</select>")?;

        writeln!(
            html,
            r#"<label class="check"><input type="checkbox" id="show-labels-check"> Show edge labels</label>"#
        )?;

        writeln!(html, r#"<div id="field-details-box" hidden>"#)?;
        writeln!(html, r#"<div>Meaning: <span id="field-desc-text"></span></div>"#)?;
        writeln!(html, r#"<div>Tables: <span id="field-table-count"></span></div>"#)?;
        writeln!(html, "</div>")?;

        writeln!(html, r#"<fieldset id="group-filter"><legend>Groups</legend>"#)?;
        // Only groups whose nodes were exported can be toggled back on.
        for group in graph.groups.iter().filter(|g| graph.selected_groups.contains(g)) {
            writeln!(
                html,
                r#"<label class="check"><input type="checkbox" data-group="{g}" checked><span class="swatch" style="background:{color}"></span>{g}</label>"#,
                g = group.as_str(),
                color = group.color(),
            )?;
        }
        writeln!(html, "</fieldset>")?;

        writeln!(html, "</div>")?;
        writeln!(html, "</div>")
    }

    fn render_svg(
        &self,
        html: &mut String,
        graph: &PresentedGraph,
        layout: &Layout,
    ) -> std::fmt::Result {
        writeln!(
            html,
            r#"<svg id="graph" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" preserveAspectRatio="xMidYMid meet">"#,
            w = layout.width,
            h = layout.height
        )?;

        let positions: HashMap<&str, &LayoutNode> =
            layout.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        // Edges first so nodes are drawn on top.
        writeln!(html, r#"<g id="edges">"#)?;
        for edge in &graph.edges {
            let (Some(a), Some(b)) = (
                positions.get(edge.from.as_str()),
                positions.get(edge.to.as_str()),
            ) else {
                continue;
            };
            let key = escape_html(&edge.link_key);
            writeln!(
                html,
                r#"<g class="edge" data-id="{id}" data-key="{key}" data-from="{from}" data-to="{to}">"#,
                id = edge.id,
                from = escape_html(&edge.from),
                to = escape_html(&edge.to),
            )?;
            writeln!(
                html,
                r#"<line class="edge-hit" x1="{}" y1="{}" x2="{}" y2="{}" />"#,
                a.x, a.y, b.x, b.y
            )?;
            writeln!(
                html,
                r#"<line class="edge-line" x1="{}" y1="{}" x2="{}" y2="{}" stroke="{NEUTRAL_COLOR}" stroke-width="{THIN_WIDTH}" />"#,
                a.x, a.y, b.x, b.y
            )?;
            writeln!(
                html,
                r#"<text class="edge-label" x="{}" y="{}" text-anchor="middle">{BLANK_LABEL}</text>"#,
                (a.x + b.x) / 2.0,
                (a.y + b.y) / 2.0 - 4.0
            )?;
            writeln!(html, "</g>")?;
        }
        writeln!(html, "</g>")?;

        writeln!(html, r#"<g id="nodes">"#)?;
        for node in &graph.nodes {
            let Some(pos) = positions.get(node.id.as_str()) else {
                continue;
            };
            let id = escape_html(&node.id);
            writeln!(
                html,
                r#"<g class="node" data-id="{id}" data-group="{}">"#,
                node.group.as_str()
            )?;
            writeln!(html, "<title>{}</title>", escape_html(&node.title))?;
            writeln!(
                html,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{}" />"#,
                pos.x, pos.y, pos.radius, node.color
            )?;
            writeln!(
                html,
                r#"<text class="node-label" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                pos.x,
                pos.y + pos.radius + self.metrics.label_gap + self.metrics.line_height * 0.8,
                escape_html(&node.label)
            )?;
            writeln!(html, "</g>")?;
        }
        writeln!(html, "</g>")?;

        writeln!(html, "</svg>")
    }

    fn render_state(&self, html: &mut String, graph: &PresentedGraph) -> Result<(), RenderError> {
        let state = EmbeddedState {
            nodes: graph
                .nodes
                .iter()
                .map(|n| EmbeddedNode {
                    id: &n.id,
                    group: n.group,
                    title: &n.title,
                    columns: &n.columns,
                })
                .collect(),
            edges: &graph.edges,
            groups: &graph.groups,
            selected_groups: &graph.selected_groups,
            group_colors: Group::ALL.iter().map(|g| (g.as_str(), g.color())).collect(),
            link_keys: &graph.link_keys,
            field_info: &graph.field_info,
            style: EmbeddedStyle {
                neutral: NEUTRAL_COLOR,
                emphasis: EMPHASIS_COLOR,
                muted: MUTED_COLOR,
                thin: THIN_WIDTH,
                thick: THICK_WIDTH,
                blank: BLANK_LABEL,
            },
        };
        let json = serde_json::to_string(&state)?;
        writeln!(
            html,
            r#"<script type="application/json" id="graph-state">{}</script>"#,
            escape_script(&json)
        )?;
        Ok(())
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Keep embedded JSON from closing its script element. These characters
/// only occur inside JSON strings, where unicode escapes are equivalent.
fn escape_script(json: &str) -> String {
    json.replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

const PAGE_CSS: &str = r#"
body { margin: 0; font-family: 'Segoe UI', Arial, sans-serif; background: #fff; color: #2c3e50; }
h1 { font-size: 20px; margin: 12px 20px; }
.empty { margin: 40px 20px; padding: 20px; border: 1px dashed #bbb; border-radius: 8px; color: #777; }
#graph { display: block; width: 100%; height: 80vh; border-top: 1px solid #eee; border-bottom: 1px solid #eee; }
.edge-hit { stroke: transparent; stroke-width: 10; cursor: pointer; }
.edge-line { pointer-events: none; }
.edge-label { font-size: 11px; fill: #555; pointer-events: none; }
.node { cursor: pointer; }
.node circle { stroke: #90a4ae; stroke-width: 1; }
.node-label { font-size: 12px; fill: #000; pointer-events: none; }
#control-panel { position: absolute; top: 60px; left: 20px; z-index: 999; width: 320px; background: rgba(255,255,255,0.95); border: 1px solid #eee; border-radius: 12px; box-shadow: 0 4px 20px rgba(0,0,0,0.15); }
#control-panel-header { padding: 10px 15px; background: #f1f3f5; cursor: move; border-bottom: 1px solid #eee; font-weight: bold; border-radius: 12px 12px 0 0; }
.panel-body { padding: 15px; }
#field-selector { width: 100%; padding: 6px; margin-bottom: 12px; border-radius: 4px; border: 1px solid #ddd; }
.check { display: flex; align-items: center; gap: 6px; font-size: 13px; color: #555; cursor: pointer; margin-bottom: 6px; }
#field-details-box { background: #f8f9fa; padding: 12px; border-radius: 6px; font-size: 13px; border: 1px solid #eee; margin-bottom: 12px; }
#field-desc-text { color: #d32f2f; }
#group-filter { border: 1px solid #eee; border-radius: 6px; font-size: 13px; }
.swatch { display: inline-block; width: 12px; height: 12px; border-radius: 50%; border: 1px solid #90a4ae; }
#table-docs { margin: 16px 20px; display: none; }
#table-docs table { border-collapse: collapse; font-size: 13px; }
#table-docs th, #table-docs td { border: 1px solid #e0e0e0; padding: 4px 10px; text-align: left; }
"#;

const PAGE_JS: &str = r#"
(function () {
  var state = JSON.parse(document.getElementById('graph-state').textContent);
  var S = state.style;
  var selector = document.getElementById('field-selector');
  var labelsCheck = document.getElementById('show-labels-check');
  var detailsBox = document.getElementById('field-details-box');
  var svg = document.getElementById('graph');
  var edgeEls = Array.prototype.slice.call(svg.querySelectorAll('.edge'));
  var nodeEls = Array.prototype.slice.call(svg.querySelectorAll('.node'));
  var nodeById = {};
  state.nodes.forEach(function (n) { nodeById[n.id] = n; });

  function edgeStyle(key, selected, showAll) {
    var color, width;
    if (selected === '') { color = S.neutral; width = S.thin; }
    else if (key === selected) { color = S.emphasis; width = S.thick; }
    else { color = S.muted; width = S.thin; }
    var label = (showAll || (selected !== '' && key === selected)) ? key : S.blank;
    return { color: color, width: width, label: label };
  }

  function updateGraphState() {
    var val = selector.value;
    var showAll = labelsCheck.checked;
    edgeEls.forEach(function (g) {
      var st = edgeStyle(g.getAttribute('data-key'), val, showAll);
      var line = g.querySelector('.edge-line');
      line.setAttribute('stroke', st.color);
      line.setAttribute('stroke-width', st.width);
      g.querySelector('.edge-label').textContent = st.label;
    });
    var info = state.fieldInfo[val];
    if (val && info) {
      detailsBox.hidden = false;
      document.getElementById('field-desc-text').textContent = info.description || val;
      document.getElementById('field-table-count').textContent = info.tables.length;
    } else {
      detailsBox.hidden = true;
    }
  }

  function selectKey(key) {
    selector.value = key;
    updateGraphState();
  }

  function applyGroupFilter() {
    var shown = {};
    Array.prototype.forEach.call(document.querySelectorAll('#group-filter input'), function (box) {
      shown[box.getAttribute('data-group')] = box.checked;
    });
    function visible(id) { var n = nodeById[id]; return !!(n && shown[n.group]); }
    nodeEls.forEach(function (g) {
      g.style.display = visible(g.getAttribute('data-id')) ? '' : 'none';
    });
    edgeEls.forEach(function (g) {
      var both = visible(g.getAttribute('data-from')) && visible(g.getAttribute('data-to'));
      g.style.display = both ? '' : 'none';
    });
  }

  function showTableDocs(id) {
    var node = nodeById[id];
    var docs = document.getElementById('table-docs');
    if (!node) { docs.style.display = 'none'; return; }
    document.getElementById('table-docs-name').textContent = node.id;
    var body = document.getElementById('table-docs-body');
    while (body.firstChild) { body.removeChild(body.firstChild); }
    node.columns.forEach(function (c) {
      var tr = document.createElement('tr');
      [c.name, c.declared_type, c.description].forEach(function (text) {
        var td = document.createElement('td');
        td.textContent = text;
        tr.appendChild(td);
      });
      body.appendChild(tr);
    });
    docs.style.display = 'block';
  }

  svg.addEventListener('click', function (ev) {
    var edge = ev.target.closest('.edge');
    if (edge) { selectKey(edge.getAttribute('data-key')); return; }
    var node = ev.target.closest('.node');
    if (node) { showTableDocs(node.getAttribute('data-id')); return; }
    selectKey('');
    showTableDocs(null);
  });

  function dragElement(el) {
    var dx = 0, dy = 0, lastX = 0, lastY = 0;
    document.getElementById(el.id + '-header').onmousedown = function (e) {
      e.preventDefault();
      lastX = e.clientX; lastY = e.clientY;
      document.onmouseup = function () { document.onmouseup = null; document.onmousemove = null; };
      document.onmousemove = function (e) {
        e.preventDefault();
        dx = lastX - e.clientX; dy = lastY - e.clientY;
        lastX = e.clientX; lastY = e.clientY;
        el.style.top = (el.offsetTop - dy) + 'px';
        el.style.left = (el.offsetLeft - dx) + 'px';
      };
    };
  }

  selector.addEventListener('change', updateGraphState);
  labelsCheck.addEventListener('change', updateGraphState);
  Array.prototype.forEach.call(document.querySelectorAll('#group-filter input'), function (box) {
    box.addEventListener('change', applyGroupFilter);
  });
  dragElement(document.getElementById('control-panel'));
  applyGroupFilter();
  updateGraphState();
})();
"#;
