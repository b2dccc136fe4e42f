use crate::config::RenderConfig;
use crate::measure::TextMetrics;
use crate::presentation::PresentedGraph;
use crate::rules::Group;
use std::collections::HashMap;
use std::f64::consts::TAU;

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub width: f64,
    pub height: f64,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Deterministic force-directed placement. Nodes start in one angular
/// sector per group, then relax under pairwise repulsion, edge springs and
/// a weak pull toward the center.
pub struct LayoutEngine {
    metrics: TextMetrics,
    spring_length: f64,
    iterations: u32,
    min_width: f64,
    min_height: f64,
    margin: f64,
    gravity: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl LayoutEngine {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            metrics: TextMetrics::default(),
            spring_length: f64::from(config.spring_length),
            iterations: config.iterations,
            min_width: f64::from(config.width),
            min_height: f64::from(config.height),
            margin: 40.0,
            gravity: 0.5,
        }
    }

    pub fn layout(&self, graph: &PresentedGraph) -> Layout {
        let n = graph.nodes.len();
        if n == 0 {
            return Layout {
                nodes: Vec::new(),
                width: self.min_width,
                height: self.min_height,
            };
        }

        let mut pos = self.initial_positions(graph);

        let index: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();
        let springs: Vec<(usize, usize)> = graph
            .edges
            .iter()
            .filter_map(|e| Some((*index.get(e.from.as_str())?, *index.get(e.to.as_str())?)))
            .collect();

        let k = self.spring_length;
        for step in 0..self.iterations {
            // Linear cooling caps how far a node may move per step.
            let temperature = k * (1.0 - f64::from(step) / f64::from(self.iterations));
            let mut disp = vec![(0.0_f64, 0.0_f64); n];

            for i in 0..n {
                for j in (i + 1)..n {
                    let (dx, dy, d) = separation(pos[i], pos[j], i, j);
                    let force = k * k / d;
                    let (fx, fy) = (dx / d * force, dy / d * force);
                    disp[i].0 += fx;
                    disp[i].1 += fy;
                    disp[j].0 -= fx;
                    disp[j].1 -= fy;
                }
            }

            for &(a, b) in &springs {
                let (dx, dy, d) = separation(pos[a], pos[b], a, b);
                let force = d * d / k;
                let (fx, fy) = (dx / d * force, dy / d * force);
                disp[a].0 -= fx;
                disp[a].1 -= fy;
                disp[b].0 += fx;
                disp[b].1 += fy;
            }

            for (p, d) in pos.iter_mut().zip(disp.iter_mut()) {
                d.0 -= p.0 * self.gravity;
                d.1 -= p.1 * self.gravity;
                let len = (d.0 * d.0 + d.1 * d.1).sqrt();
                if len > 0.0 {
                    let step_len = len.min(temperature);
                    p.0 += d.0 / len * step_len;
                    p.1 += d.1 / len * step_len;
                }
            }
        }

        self.fit(graph, &pos)
    }

    fn initial_positions(&self, graph: &PresentedGraph) -> Vec<(f64, f64)> {
        let mut groups: Vec<Group> = graph.nodes.iter().map(|n| n.group).collect();
        groups.sort();
        groups.dedup();
        let sector = TAU / groups.len() as f64;

        let mut per_group: HashMap<Group, (usize, usize)> = groups
            .iter()
            .map(|g| (*g, (0, graph.nodes.iter().filter(|n| n.group == *g).count())))
            .collect();

        graph
            .nodes
            .iter()
            .map(|node| {
                let g = groups.iter().position(|g| *g == node.group).unwrap_or(0);
                let slot = per_group.entry(node.group).or_insert((0, 1));
                let (i, count) = *slot;
                slot.0 += 1;
                let angle = sector * (g as f64 + (i as f64 + 0.5) / count as f64);
                let radius = self.spring_length * (1.0 + (i % 3) as f64 * 0.5);
                (radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    /// Translate positions into a canvas with room for node labels.
    fn fit(&self, graph: &PresentedGraph, pos: &[(f64, f64)]) -> Layout {
        let mut min = (f64::MAX, f64::MAX);
        let mut max = (f64::MIN, f64::MIN);
        for (node, &(x, y)) in graph.nodes.iter().zip(pos) {
            let radius = f64::from(node.size);
            let (w, h) = self.metrics.label_box(&node.label, radius);
            min.0 = min.0.min(x - w / 2.0);
            max.0 = max.0.max(x + w / 2.0);
            min.1 = min.1.min(y - radius);
            max.1 = max.1.max(y - radius + h);
        }

        let width = (max.0 - min.0 + self.margin * 2.0).max(self.min_width);
        let height = (max.1 - min.1 + self.margin * 2.0).max(self.min_height);
        // Center the drawing when the canvas minimum exceeds its extent.
        let offset_x = (width - (max.0 - min.0)) / 2.0 - min.0;
        let offset_y = (height - (max.1 - min.1)) / 2.0 - min.1;

        let nodes = graph
            .nodes
            .iter()
            .zip(pos)
            .map(|(node, &(x, y))| LayoutNode {
                id: node.id.clone(),
                x: round(x + offset_x),
                y: round(y + offset_y),
                radius: f64::from(node.size),
            })
            .collect();

        Layout {
            nodes,
            width: round(width),
            height: round(height),
        }
    }
}

/// Vector from `b` to `a` and its length. Coincident nodes are pushed
/// apart along a direction derived from their indices.
fn separation(a: (f64, f64), b: (f64, f64), i: usize, j: usize) -> (f64, f64, f64) {
    let (mut dx, mut dy) = (a.0 - b.0, a.1 - b.1);
    let mut d = (dx * dx + dy * dy).sqrt();
    if d < 0.01 {
        let angle = (i * 31 + j * 17) as f64;
        dx = angle.cos() * 0.01;
        dy = angle.sin() * 0.01;
        d = 0.01;
    }
    (dx, dy, d)
}

fn round(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
