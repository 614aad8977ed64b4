//! Cohort assignment
//!
//! The static cohort table comes from configuration and is never mutated.
//! Categories missing from it are absorbed by the catch-all cohort through a
//! run-scoped overlay ([`RunCohorts`]) that is dropped with the run.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// A cohort of the static table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    pub name: String,
    pub color: String,
    pub categories: Vec<String>,
}

/// Read-only cohort table in priority order
#[derive(Debug, Clone)]
pub struct CohortTable {
    cohorts: Vec<Cohort>,
    catch_all: Cohort,
    index: HashMap<String, usize>,
}

impl CohortTable {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let cohorts: Vec<Cohort> = config
            .cohorts
            .iter()
            .map(|spec| Cohort {
                name: spec.name.clone(),
                color: spec.color.clone(),
                categories: spec.categories.clone(),
            })
            .collect();

        let index = cohorts
            .iter()
            .enumerate()
            .flat_map(|(i, cohort)| cohort.categories.iter().map(move |c| (c.clone(), i)))
            .collect();

        Ok(Self {
            cohorts,
            catch_all: Cohort {
                name: config.catch_all.name.clone(),
                color: config.catch_all.color.clone(),
                categories: Vec::new(),
            },
            index,
        })
    }

    /// Registered cohort of a category, if any
    pub fn lookup(&self, category: &str) -> Option<&Cohort> {
        self.index.get(category).map(|&i| &self.cohorts[i])
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn catch_all(&self) -> &Cohort {
        &self.catch_all
    }
}

/// Run-scoped view of the cohort table with the catch-all overlay
#[derive(Debug)]
pub struct RunCohorts<'a> {
    base: &'a CohortTable,
    unregistered: BTreeSet<String>,
}

impl<'a> RunCohorts<'a> {
    pub fn new(base: &'a CohortTable) -> Self {
        Self {
            base,
            unregistered: BTreeSet::new(),
        }
    }

    /// Cohort name for a category. An unregistered category joins the
    /// catch-all and is logged the first time it is seen in this run.
    pub fn cohort_of(&mut self, category: &str) -> &'a str {
        let base = self.base;
        if let Some(cohort) = base.lookup(category) {
            return &cohort.name;
        }
        if self.unregistered.insert(category.to_string()) {
            warn!(category = %category, "unregistered category");
        }
        &base.catch_all.name
    }

    /// Categories absorbed by the catch-all so far
    pub fn unregistered(&self) -> &BTreeSet<String> {
        &self.unregistered
    }

    /// Assign each category to exactly one cohort
    pub fn assign<'c, I>(&mut self, categories: I) -> CohortAssignment
    where
        I: IntoIterator<Item = &'c str>,
    {
        let base = self.base;
        let mut cohorts: Vec<AssignedCohort> = base
            .cohorts
            .iter()
            .map(|c| AssignedCohort::new(c, false))
            .collect();
        cohorts.push(AssignedCohort::new(&base.catch_all, true));

        let position: HashMap<&'a str, usize> = base
            .cohorts
            .iter()
            .chain(std::iter::once(&base.catch_all))
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();

        let mut by_category = BTreeMap::new();
        let mut members: Vec<BTreeSet<String>> = vec![BTreeSet::new(); cohorts.len()];
        for category in categories {
            let name = self.cohort_of(category);
            let slot = position[name];
            members[slot].insert(category.to_string());
            by_category.insert(category.to_string(), slot);
        }
        for (cohort, members) in cohorts.iter_mut().zip(members) {
            cohort.members = members;
        }

        CohortAssignment {
            cohorts,
            by_category,
        }
    }
}

/// One cohort with the categories of the current dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedCohort {
    pub name: String,
    pub color: String,
    pub catch_all: bool,
    /// Present categories, ordered by name
    pub members: BTreeSet<String>,
}

impl AssignedCohort {
    fn new(cohort: &Cohort, catch_all: bool) -> Self {
        Self {
            name: cohort.name.clone(),
            color: cohort.color.clone(),
            catch_all,
            members: BTreeSet::new(),
        }
    }
}

/// Complete category → cohort assignment of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortAssignment {
    /// Priority order, catch-all last
    cohorts: Vec<AssignedCohort>,
    by_category: BTreeMap<String, usize>,
}

impl CohortAssignment {
    pub fn cohorts(&self) -> &[AssignedCohort] {
        &self.cohorts
    }

    pub fn cohort_of(&self, category: &str) -> Option<&AssignedCohort> {
        self.by_category.get(category).map(|&i| &self.cohorts[i])
    }

    /// Number of assigned categories
    pub fn category_count(&self) -> usize {
        self.by_category.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CATCH_ALL;

    fn table() -> CohortTable {
        CohortTable::from_config(&AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_registered_lookup() {
        let table = table();
        let mut run = RunCohorts::new(&table);
        assert_eq!(run.cohort_of("Paramétrer ma ferme"), "Paramètrer");
        assert_eq!(run.cohort_of("tutorial"), "Tutorial");
        assert!(run.unregistered().is_empty());
    }

    #[test]
    fn test_unregistered_goes_to_catch_all_once() {
        let table = table();
        let mut run = RunCohorts::new(&table);
        assert_eq!(run.cohort_of("brand-new"), DEFAULT_CATCH_ALL);
        assert_eq!(run.cohort_of("brand-new"), DEFAULT_CATCH_ALL);
        assert_eq!(run.unregistered().len(), 1);
    }

    #[test]
    fn test_overlay_does_not_leak_between_runs() {
        let table = table();
        {
            let mut first = RunCohorts::new(&table);
            first.cohort_of("brand-new");
            assert_eq!(first.unregistered().len(), 1);
        }
        let second = RunCohorts::new(&table);
        assert!(second.unregistered().is_empty());
        assert!(table.lookup("brand-new").is_none());
        assert!(table.catch_all().categories.is_empty());
    }

    #[test]
    fn test_assignment_is_complete() {
        let table = table();
        let mut run = RunCohorts::new(&table);
        let categories = ["Mes tâches", "Mon semainier", "zzz", "aaa", "tutorial"];
        let assignment = run.assign(categories);

        assert_eq!(assignment.category_count(), categories.len());
        for category in categories {
            let cohort = assignment.cohort_of(category).unwrap();
            let owners = assignment
                .cohorts()
                .iter()
                .filter(|c| c.members.contains(category))
                .count();
            assert_eq!(owners, 1);
            assert!(cohort.members.contains(category));
        }

        let last = assignment.cohorts().last().unwrap();
        assert!(last.catch_all);
        assert_eq!(
            last.members.iter().cloned().collect::<Vec<_>>(),
            vec!["aaa".to_string(), "zzz".to_string()]
        );
        assert_eq!(assignment.cohorts()[0].name, "Bienvenue");
    }
}
