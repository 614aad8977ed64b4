//! Circular (chord) layout
//!
//! Cohorts take consecutive arcs of the unit circle in priority order, each arc
//! proportional to the cohort's category count. Categories are spaced evenly
//! inside their arc, ordered by name. Transitions become quadratic Bézier
//! curves pulled towards the center.

use crate::graph::TransitionGraph;
use crate::style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// Control point = midpoint of the endpoints scaled by this factor
pub const CONTROL_SCALE: f64 = 0.5;

/// Samples per edge curve
pub const CURVE_SAMPLES: usize = 100;

/// A category placed on the circle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub category: String,
    pub x: f64,
    pub y: f64,
    /// Angle in radians, in [0, 2π)
    pub angle: f64,
    pub cohort: String,
    pub color: String,
    pub size: f64,
    /// Distinct identities that visited the category
    pub visits: usize,
}

/// A transition drawn between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub source: String,
    pub target: String,
    pub count: u64,
    pub curve_points: Vec<[f64; 2]>,
    pub width: f64,
    pub opacity: f64,
    /// Source cohort color with the edge opacity applied
    pub color: String,
    pub label: String,
}

/// Legend entry, in priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub cohort: String,
    pub color: String,
    pub categories: usize,
}

/// Complete circular layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChordLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub legend: Vec<LegendEntry>,
}

impl ChordLayout {
    pub fn node(&self, category: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.category == category)
    }
}

/// Lay out every category of the graph and every edge with `count >= min_count`
pub fn chord_layout(graph: &TransitionGraph, min_count: u64) -> ChordLayout {
    let assignment = graph.assignment();
    let total = assignment.category_count();
    if total == 0 {
        return ChordLayout::default();
    }

    let mut nodes = Vec::with_capacity(total);
    let mut legend = Vec::new();
    let mut current_angle = 0.0;
    for cohort in assignment.cohorts().iter().filter(|c| !c.members.is_empty()) {
        let arc = TAU * cohort.members.len() as f64 / total as f64;
        let step = arc / cohort.members.len() as f64;
        for (i, category) in cohort.members.iter().enumerate() {
            let angle = current_angle + i as f64 * step;
            let visits = graph.visit_count(category);
            nodes.push(LayoutNode {
                category: category.clone(),
                x: angle.cos(),
                y: angle.sin(),
                angle,
                cohort: cohort.name.clone(),
                color: cohort.color.clone(),
                size: style::node_size(visits),
                visits,
            });
        }
        legend.push(LegendEntry {
            cohort: cohort.name.clone(),
            color: cohort.color.clone(),
            categories: cohort.members.len(),
        });
        current_angle += arc;
    }

    let positions: BTreeMap<&str, &LayoutNode> =
        nodes.iter().map(|n| (n.category.as_str(), n)).collect();

    let edges = graph
        .edges()
        .filter(|&(_, _, count)| count >= min_count)
        .filter_map(|(source, target, count)| {
            let from = positions.get(source)?;
            let to = positions.get(target)?;
            Some(layout_edge(from, to, count))
        })
        .collect();

    ChordLayout {
        nodes,
        edges,
        legend,
    }
}

fn layout_edge(from: &LayoutNode, to: &LayoutNode, count: u64) -> LayoutEdge {
    let control = [(from.x + to.x) * CONTROL_SCALE, (from.y + to.y) * CONTROL_SCALE];
    let opacity = style::edge_opacity(count);
    let label = if count > 1 {
        format!(
            "{} ({}) → {} ({}): {}",
            from.category, from.cohort, to.category, to.cohort, count
        )
    } else {
        format!("{} → {}: {}", from.category, to.category, count)
    };

    LayoutEdge {
        source: from.category.clone(),
        target: to.category.clone(),
        count,
        curve_points: quadratic_curve([from.x, from.y], control, [to.x, to.y], CURVE_SAMPLES),
        width: style::edge_width(count),
        opacity,
        color: style::rgba(&from.color, opacity),
        label,
    }
}

/// Sample `B(t) = (1-t)²·p0 + 2(1-t)t·c + t²·p1` at `samples` evenly spaced t in [0, 1]
pub fn quadratic_curve(
    p0: [f64; 2],
    control: [f64; 2],
    p1: [f64; 2],
    samples: usize,
) -> Vec<[f64; 2]> {
    if samples == 0 {
        return Vec::new();
    }
    if samples == 1 {
        return vec![p0];
    }
    (0..samples)
        .map(|i| {
            let t = i as f64 / (samples - 1) as f64;
            let u = 1.0 - t;
            let point =
                |axis: usize| u * u * p0[axis] + 2.0 * u * t * control[axis] + t * t * p1[axis];
            [point(0), point(1)]
        })
        .collect()
}
