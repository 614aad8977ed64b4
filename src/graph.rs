//! Transition graph construction
//!
//! Rows are partitioned per identity into chronological sequences (stable
//! sort on datetime, rows without a datetime left out), then every adjacent
//! pair whose category changes is counted as a directed transition.

use crate::cohort::{CohortAssignment, RunCohorts};
use crate::types::{CleanedDataset, EventRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// source → (target → count)
pub type TransitionCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// Per-identity chronological sequences borrowed from a dataset
#[derive(Debug, Clone, Default)]
pub struct UserSequences<'d> {
    by_identity: BTreeMap<&'d str, Vec<&'d EventRecord>>,
}

impl<'d> UserSequences<'d> {
    /// Group rows by identity and sort each group by datetime.
    ///
    /// The sort is stable, so equal datetimes keep their input order.
    pub fn from_dataset(dataset: &'d CleanedDataset) -> Self {
        let mut by_identity: BTreeMap<&'d str, Vec<&'d EventRecord>> = BTreeMap::new();
        for record in dataset.records.iter().filter(|r| r.datetime.is_some()) {
            by_identity
                .entry(record.identity.as_str())
                .or_default()
                .push(record);
        }
        for sequence in by_identity.values_mut() {
            sequence.sort_by_key(|r| r.datetime);
        }
        Self { by_identity }
    }

    pub fn sequence(&self, identity: &str) -> Option<&[&'d EventRecord]> {
        self.by_identity.get(identity).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Every transition across all identities, produced lazily
    pub fn transitions(&self) -> impl Iterator<Item = (&'d str, &'d str)> + '_ {
        self.by_identity
            .values()
            .flat_map(|sequence| adjacent_transitions(sequence))
    }
}

/// Adjacent category changes within one sequence
pub fn adjacent_transitions<'s, 'd>(
    sequence: &'s [&'d EventRecord],
) -> impl Iterator<Item = (&'d str, &'d str)> + 's {
    sequence.windows(2).filter_map(|pair| {
        let (from, to): (&'d EventRecord, &'d EventRecord) = (pair[0], pair[1]);
        if from.category != to.category {
            Some((from.category.as_str(), to.category.as_str()))
        } else {
            None
        }
    })
}

/// Directed category transition graph with visit statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionGraph {
    counts: TransitionCounts,
    /// Distinct identities per category
    visit_counts: BTreeMap<String, usize>,
    /// Rows per category
    row_counts: BTreeMap<String, usize>,
    assignment: CohortAssignment,
    identities: usize,
}

impl TransitionGraph {
    /// Build the graph and assign every observed category to a cohort
    pub fn build(dataset: &CleanedDataset, cohorts: &mut RunCohorts<'_>) -> Self {
        let sequences = UserSequences::from_dataset(dataset);

        let mut counts = TransitionCounts::new();
        for (source, target) in sequences.transitions() {
            *counts
                .entry(source.to_string())
                .or_default()
                .entry(target.to_string())
                .or_default() += 1;
        }

        let mut visitors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut row_counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in &dataset.records {
            visitors
                .entry(record.category.as_str())
                .or_default()
                .insert(record.identity.as_str());
            *row_counts.entry(record.category.clone()).or_default() += 1;
        }
        let visit_counts = visitors
            .into_iter()
            .map(|(category, identities)| (category.to_string(), identities.len()))
            .collect();

        let assignment = cohorts.assign(dataset.categories());

        let graph = Self {
            counts,
            visit_counts,
            row_counts,
            assignment,
            identities: dataset.identities().len(),
        };
        info!(
            categories = graph.category_count(),
            identities = graph.identities,
            sequences = sequences.len(),
            transitions = graph.total_transitions(),
            unregistered = cohorts.unregistered().len(),
            "built transition graph"
        );
        graph
    }

    pub fn counts(&self) -> &TransitionCounts {
        &self.counts
    }

    pub fn count(&self, source: &str, target: &str) -> u64 {
        self.counts
            .get(source)
            .and_then(|targets| targets.get(target))
            .copied()
            .unwrap_or(0)
    }

    /// All edges as (source, target, count), ordered by source then target
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u64)> + '_ {
        self.counts.iter().flat_map(|(source, targets)| {
            targets
                .iter()
                .map(move |(target, &count)| (source.as_str(), target.as_str(), count))
        })
    }

    pub fn total_transitions(&self) -> u64 {
        self.edges().map(|(_, _, count)| count).sum()
    }

    /// Transitions leaving `category` towards other categories
    pub fn outbound(&self, category: &str) -> u64 {
        self.counts
            .get(category)
            .map(|targets| {
                targets
                    .iter()
                    .filter(|(target, _)| target.as_str() != category)
                    .map(|(_, &count)| count)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Transitions arriving at `category` from other categories
    pub fn inbound(&self, category: &str) -> u64 {
        self.edges()
            .filter(|&(source, target, _)| target == category && source != category)
            .map(|(_, _, count)| count)
            .sum()
    }

    pub fn visit_count(&self, category: &str) -> usize {
        self.visit_counts.get(category).copied().unwrap_or(0)
    }

    pub fn row_count(&self, category: &str) -> usize {
        self.row_counts.get(category).copied().unwrap_or(0)
    }

    /// Categories of the dataset, ordered by name
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.row_counts.keys().map(String::as_str)
    }

    pub fn category_count(&self) -> usize {
        self.row_counts.len()
    }

    pub fn assignment(&self) -> &CohortAssignment {
        &self.assignment
    }

    pub fn identity_count(&self) -> usize {
        self.identities
    }
}
