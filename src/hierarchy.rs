//! Hierarchical (cohort → category) aggregation for treemap rendering
//!
//! A cohort's value is the sum of its children's row counts, so the output
//! honors a "branch value = sum of children" rendering contract.

use crate::graph::TransitionGraph;
use serde::{Deserialize, Serialize};

/// One node of the two-level forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub label: String,
    /// Parent cohort label, empty for cohorts
    pub parent: String,
    pub value: usize,
    pub hover_text: String,
    pub color: String,
}

impl HierarchyNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Flat list of cohort nodes followed by their category children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    pub fn roots(&self) -> impl Iterator<Item = &HierarchyNode> + '_ {
        self.nodes.iter().filter(|n| n.is_root())
    }

    pub fn children<'h>(&'h self, cohort: &'h str) -> impl Iterator<Item = &'h HierarchyNode> + 'h {
        self.nodes.iter().filter(move |n| n.parent == cohort)
    }
}

/// Aggregate row counts, distinct identities and transition totals per cohort
///
/// Every registered cohort appears, even with value 0; the catch-all cohort
/// only when it absorbed at least one category.
pub fn build_hierarchy(graph: &TransitionGraph) -> Hierarchy {
    let cohorts = graph
        .assignment()
        .cohorts()
        .iter()
        .filter(|c| !c.catch_all || !c.members.is_empty());

    let mut roots = Vec::new();
    let mut children = Vec::new();
    for cohort in cohorts {
        let mut total = 0;
        for category in &cohort.members {
            let visits = graph.row_count(category);
            total += visits;
            children.push(HierarchyNode {
                label: category.clone(),
                parent: cohort.name.clone(),
                value: visits,
                hover_text: format!(
                    "Category: {}<br>Total Visits: {}<br>Unique Users: {}<br>\
                     Transitions Out: {}<br>Transitions In: {}",
                    category,
                    visits,
                    graph.visit_count(category),
                    graph.outbound(category),
                    graph.inbound(category)
                ),
                color: cohort.color.clone(),
            });
        }
        roots.push(HierarchyNode {
            label: cohort.name.clone(),
            parent: String::new(),
            value: total,
            hover_text: format!("{}<br>Total Visits: {}", cohort.name, total),
            color: cohort.color.clone(),
        });
    }

    roots.extend(children);
    Hierarchy { nodes: roots }
}
