//! Pipeline orchestration
//!
//! This module provides the public API for Navflow. It runs the batch pipeline
//! from the raw extraction file to the cleaned event log and the rendered
//! chord layout and hierarchy.
//!
//! Every public operation has a `try_*` form returning `Result` and a safe
//! form that logs the failure and returns an empty value instead.

use crate::audit::{AuditLog, Stage};
use crate::cohort::{CohortTable, RunCohorts};
use crate::config::{AnalysisConfig, CleaningRules, InputColumns};
use crate::dedup::deduplicate;
use crate::encoder::ArtifactEncoder;
use crate::error::AnalysisError;
use crate::graph::TransitionGraph;
use crate::hierarchy::{build_hierarchy, Hierarchy};
use crate::layout::{chord_layout, ChordLayout};
use crate::loader;
use crate::normalizer::{canonical_identity, Normalizer};
use crate::resolver::CategoryResolver;
use crate::summary::DatasetSummary;
use crate::types::{CleanedDataset, RawRecord};
use regex::RegexSet;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Cleaned output file name inside the output directory
pub const CLEANED_FILE: &str = "cleaned.csv";
pub const CHORD_FILE: &str = "chord_diagram.json";
pub const HIERARCHY_FILE: &str = "hierarchy.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// Cleaned dataset plus the audit trail of the cleaning stages
#[derive(Debug, Clone, Default)]
pub struct CleaningOutcome {
    pub dataset: CleanedDataset,
    pub audit: AuditLog,
}

/// What a full run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub cleaned_path: PathBuf,
    pub rows: usize,
    pub identities: usize,
    /// `None` when the diagram was skipped or failed
    pub chord_path: Option<PathBuf>,
    pub hierarchy_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub unregistered_categories: Vec<String>,
}

/// Batch analyzer holding the read-only tables of one configuration
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    rules: CleaningRules,
    cohorts: CohortTable,
}

impl Analyzer {
    /// Validate the configuration and compile its tables
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let rules = config.cleaning_rules()?;
        let cohorts = CohortTable::from_config(&config)?;
        Ok(Self {
            config,
            rules,
            cohorts,
        })
    }

    /// Analyzer over the built-in production tables
    pub fn with_defaults() -> Result<Self, AnalysisError> {
        Self::new(AnalysisConfig::default())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Normalize, resolve and deduplicate raw rows
    ///
    /// Stages:
    /// 1. Normalizer - canonical identities, exclusions
    /// 2. Normalizer - date/time split and datetime reconstruction
    /// 3. CategoryResolver - path segment, exclusion patterns, mapping
    /// 4. deduplicate - collapse (identity, category, datetime) triples
    pub fn clean_rows(&self, rows: Vec<RawRecord>) -> CleaningOutcome {
        clean_with(rows, &self.rules)
    }

    /// Load and clean a raw extraction file
    pub fn try_clean_file(&self, input: &Path) -> Result<CleaningOutcome, AnalysisError> {
        let rows = loader::read_raw(input, &self.config.columns)?;
        Ok(self.clean_rows(rows))
    }

    /// Load and clean a raw extraction file; empty dataset on load failure
    pub fn clean_file(&self, input: &Path) -> CleanedDataset {
        match self.try_clean_file(input) {
            Ok(outcome) => outcome.dataset,
            Err(e) => {
                error!(path = %input.display(), error = %e, "failed to clean input");
                CleanedDataset::default()
            }
        }
    }

    /// Re-run cleaning over an already cleaned file.
    ///
    /// The category column holds display names, not raw paths, so path
    /// exclusion patterns are not applied again.
    pub fn try_reclean_file(&self, cleaned: &Path) -> Result<CleaningOutcome, AnalysisError> {
        let rows = loader::read_raw(cleaned, &InputColumns::cleaned())?;
        let rules = CleaningRules {
            excluded_paths: RegexSet::empty(),
            ..self.rules.clone()
        };
        Ok(clean_with(rows, &rules))
    }

    /// Load a cleaned file; empty dataset on failure
    pub fn load_cleaned(&self, path: &Path) -> CleanedDataset {
        loader::read_cleaned(path).unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "failed to load cleaned dataset");
            CleanedDataset::default()
        })
    }

    /// Load a cleaned file as diagram input; `None` when it holds no rows,
    /// in which case diagram generation is skipped.
    pub fn try_load_for_diagrams(
        &self,
        path: &Path,
    ) -> Result<Option<CleanedDataset>, AnalysisError> {
        let dataset = loader::read_cleaned(path)?;
        if dataset.is_empty() {
            warn!(path = %path.display(), "cleaned dataset is empty, skipping diagrams");
            return Ok(None);
        }
        Ok(Some(dataset))
    }

    /// Build the transition graph with a fresh run-scoped cohort overlay
    pub fn build_graph(&self, dataset: &CleanedDataset) -> TransitionGraph {
        let mut run = RunCohorts::new(&self.cohorts);
        TransitionGraph::build(dataset, &mut run)
    }

    pub fn chord_layout(&self, dataset: &CleanedDataset, min_count: u64) -> ChordLayout {
        chord_layout(&self.build_graph(dataset), min_count)
    }

    pub fn hierarchy(&self, dataset: &CleanedDataset) -> Hierarchy {
        build_hierarchy(&self.build_graph(dataset))
    }

    pub fn summary(&self, dataset: &CleanedDataset, top: usize) -> DatasetSummary {
        DatasetSummary::compute(dataset, top)
    }

    /// Full batch: clean, write the cleaned log, then render the diagrams.
    ///
    /// Diagrams are skipped when the cleaned dataset is empty. A failing
    /// diagram is logged and left out of the report; the others still run.
    pub fn try_run(
        &self,
        input: &Path,
        output_dir: &Path,
        min_count: u64,
    ) -> Result<RunReport, AnalysisError> {
        let outcome = self.try_clean_file(input)?;
        let dataset = outcome.dataset;

        fs::create_dir_all(output_dir)?;
        let cleaned_path = output_dir.join(CLEANED_FILE);
        loader::write_cleaned(&cleaned_path, &dataset)?;

        let encoder = ArtifactEncoder::new();
        let mut report = RunReport {
            run_id: encoder.run_id().to_string(),
            cleaned_path,
            rows: dataset.len(),
            identities: dataset.identities().len(),
            chord_path: None,
            hierarchy_path: None,
            summary_path: None,
            unregistered_categories: Vec::new(),
        };

        if dataset.is_empty() {
            warn!("cleaned dataset is empty, skipping diagrams");
            return Ok(report);
        }

        let mut run = RunCohorts::new(&self.cohorts);
        let graph = TransitionGraph::build(&dataset, &mut run);
        report.unregistered_categories = run.unregistered().iter().cloned().collect();

        let source = report.cleaned_path.display().to_string();
        report.chord_path = write_artifact(
            &encoder,
            "chord_layout",
            &source,
            &chord_layout(&graph, min_count),
            &output_dir.join(CHORD_FILE),
        );
        report.hierarchy_path = write_artifact(
            &encoder,
            "hierarchy",
            &source,
            &build_hierarchy(&graph),
            &output_dir.join(HIERARCHY_FILE),
        );
        report.summary_path = write_artifact(
            &encoder,
            "summary",
            &source,
            &self.summary(&dataset, crate::summary::DEFAULT_TOP_CATEGORIES),
            &output_dir.join(SUMMARY_FILE),
        );

        info!(run_id = %report.run_id, rows = report.rows, "run complete");
        Ok(report)
    }

    /// Full batch; `None` when the input could not be loaded or written
    pub fn run(&self, input: &Path, output_dir: &Path, min_count: u64) -> Option<RunReport> {
        match self.try_run(input, output_dir, min_count) {
            Ok(report) => Some(report),
            Err(e) => {
                error!(path = %input.display(), error = %e, "run failed");
                None
            }
        }
    }
}

/// Cleaning stages over `rows` with the given tables
fn clean_with(rows: Vec<RawRecord>, rules: &CleaningRules) -> CleaningOutcome {
    info!(rows = rows.len(), "cleaning rows");

    // Canonical identities, so case and whitespace variants are not
    // reported as exclusions.
    let mut audit = AuditLog::start(
        rows.iter()
            .filter_map(|r| r.identity.as_deref().and_then(canonical_identity))
            .collect(),
    );

    // Stage 1: identities
    let rows = Normalizer::clean_identities(rows, rules);
    audit.checkpoint(
        Stage::IdentityCleaning,
        rows.iter().filter_map(|r| r.identity.clone()).collect(),
    );

    // Stage 2: datetimes
    let rows = Normalizer::reconstruct_datetimes(rows);
    audit.checkpoint(Stage::DatetimeReconstruction, identities_of(&rows, |r| &r.identity));

    // Stage 3: categories
    let rows = CategoryResolver::resolve(rows, rules);
    audit.checkpoint(Stage::CategoryResolution, identities_of(&rows, |r| &r.identity));

    // Stage 4: duplicates
    let rows = deduplicate(rows);
    audit.checkpoint(Stage::Deduplication, identities_of(&rows, |r| &r.identity));

    info!(
        rows = rows.len(),
        initial_identities = audit.initial_count(),
        final_identities = audit.final_count(),
        excluded_identities = audit.total_excluded(),
        "cleaning complete"
    );

    CleaningOutcome {
        dataset: CleanedDataset::new(rows),
        audit,
    }
}

fn identities_of<T>(rows: &[T], identity: impl Fn(&T) -> &String) -> BTreeSet<String> {
    rows.iter().map(|r| identity(r).clone()).collect()
}

fn write_artifact<T: Serialize>(
    encoder: &ArtifactEncoder,
    kind: &str,
    source: &str,
    data: &T,
    path: &Path,
) -> Option<PathBuf> {
    let written = encoder
        .encode_to_json(kind, source, data)
        .and_then(|json| fs::write(path, json).map_err(AnalysisError::from));
    match written {
        Ok(()) => {
            info!(kind, path = %path.display(), "wrote artifact");
            Some(path.to_path_buf())
        }
        Err(e) => {
            error!(kind, error = %e, "failed to write artifact");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventRecord;
    use pretty_assertions::assert_eq;

    const RAW: &str = "\
person.properties.email,properties.$sent_at,properties.$pathname,extra
a@x.com,2024-01-01T10:00:00.000Z,/app/settings,1
A@X.com ,2024-01-01T10:05:00.000Z,/app/itk,2
a@x.com,2024-01-01T10:05:00.000Z,/app/itk,3
b@x.com,2024-01-02T08:00:00Z,/app/ma-ferme/4,4
support.metier@elzeard.co,2024-01-02T09:00:00Z,/app/settings,5
c@x.com,2024-01-02T09:00:00Z,/app/tutorial,6
c@x.com,broken,/app/plan,7
c@x.com,2024-01-02T09:10:00Z,/app/brand-new,8
,2024-01-02T09:10:00Z,/app/plan,9
";

    fn analyzer() -> Analyzer {
        Analyzer::with_defaults().unwrap()
    }

    fn write_raw(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("input.csv");
        fs::write(&path, content).unwrap();
        path
    }

    fn triples(dataset: &CleanedDataset) -> BTreeSet<(String, String, Option<String>)> {
        dataset
            .records
            .iter()
            .map(|r| {
                (
                    r.identity.clone(),
                    r.category.clone(),
                    r.datetime.map(|d| d.to_string()),
                )
            })
            .collect()
    }

    #[test]
    fn test_two_page_example() {
        let rows = vec![
            RawRecord::new("a@x.com", "2024-01-01T10:00:00.000Z", "/app/settings"),
            RawRecord::new("a@x.com", "2024-01-01T10:05:00.000Z", "/app/itk"),
        ];
        let analyzer = analyzer();
        let dataset = analyzer.clean_rows(rows).dataset;

        let categories: Vec<&str> = dataset.records.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Paramétrer ma ferme", "Mes itinéraires de culture"]);

        let graph = analyzer.build_graph(&dataset);
        assert_eq!(graph.count("Paramétrer ma ferme", "Mes itinéraires de culture"), 1);
        assert_eq!(graph.total_transitions(), 1);
    }

    #[test]
    fn test_excluded_identity_contributes_nothing() {
        let rows = vec![
            RawRecord::new("support.metier@elzeard.co", "2024-01-01T10:00:00Z", "/app/settings"),
            RawRecord::new(" Support.Metier@Elzeard.co ", "2024-01-01T10:01:00Z", "/app/itk"),
        ];
        let outcome = analyzer().clean_rows(rows);
        assert!(outcome.dataset.is_empty());
        assert_eq!(
            outcome.audit.excluded_at(Stage::IdentityCleaning),
            ["support.metier@elzeard.co".to_string()].into_iter().collect()
        );
        assert_eq!(outcome.audit.final_count(), 0);
    }

    #[test]
    fn test_clean_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(dir.path(), RAW);
        let outcome = analyzer().try_clean_file(&input).unwrap();
        let dataset = &outcome.dataset;

        assert_eq!(dataset.len(), 5);
        assert_eq!(
            dataset.identities().into_iter().collect::<Vec<_>>(),
            vec!["a@x.com", "c@x.com"]
        );
        let broken = dataset
            .records
            .iter()
            .find(|r| r.category == "Mes planifications")
            .unwrap();
        assert_eq!(broken.datetime, None);
        assert_eq!(broken.start_date.as_deref(), Some("broken"));

        assert_eq!(
            outcome.audit.excluded_at(Stage::CategoryResolution),
            ["b@x.com".to_string()].into_iter().collect()
        );
        assert!(outcome.audit.excluded_at(Stage::Deduplication).is_empty());
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(dir.path(), RAW);
        let analyzer = analyzer();
        let first = analyzer.try_clean_file(&input).unwrap().dataset;

        let cleaned = dir.path().join("cleaned.csv");
        loader::write_cleaned(&cleaned, &first).unwrap();
        let second = analyzer.try_reclean_file(&cleaned).unwrap().dataset;

        assert_eq!(triples(&first), triples(&second));
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn test_recleaning_ignores_path_patterns_matching_display_names() {
        let config = AnalysisConfig {
            excluded_path_patterns: vec!["ferme".to_string()],
            ..AnalysisConfig::default()
        };
        let analyzer = Analyzer::new(config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(
            dir.path(),
            "person.properties.email,properties.$sent_at,properties.$pathname\n\
             a@x.com,2024-01-01T10:00:00Z,/app/settings\n\
             a@x.com,2024-01-01T10:01:00Z,/app/ma-ferme/2\n",
        );

        let first = analyzer.try_clean_file(&input).unwrap().dataset;
        assert_eq!(first.len(), 1);
        assert_eq!(first.records[0].category, "Paramétrer ma ferme");

        let cleaned = dir.path().join("cleaned.csv");
        loader::write_cleaned(&cleaned, &first).unwrap();
        let second = analyzer.try_reclean_file(&cleaned).unwrap().dataset;
        assert_eq!(triples(&first), triples(&second));
    }

    #[test]
    fn test_empty_cleaned_file_skips_diagrams() {
        let analyzer = analyzer();
        let dir = tempfile::tempdir().unwrap();
        let cleaned = dir.path().join("cleaned.csv");
        loader::write_cleaned(&cleaned, &CleanedDataset::default()).unwrap();
        assert_eq!(analyzer.try_load_for_diagrams(&cleaned).unwrap(), None);

        let input = write_raw(dir.path(), RAW);
        let dataset = analyzer.try_clean_file(&input).unwrap().dataset;
        loader::write_cleaned(&cleaned, &dataset).unwrap();
        let loaded = analyzer.try_load_for_diagrams(&cleaned).unwrap().unwrap();
        assert_eq!(loaded.len(), dataset.len());

        assert!(analyzer
            .try_load_for_diagrams(Path::new("/nonexistent/cleaned.csv"))
            .is_err());
    }

    #[test]
    fn test_missing_input_gives_empty_dataset() {
        let analyzer = analyzer();
        let dataset = analyzer.clean_file(Path::new("/nonexistent/input.csv"));
        assert!(dataset.is_empty());
        assert!(analyzer
            .run(Path::new("/nonexistent/input.csv"), Path::new("/tmp"), 1)
            .is_none());
    }

    #[test]
    fn test_missing_column_gives_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(dir.path(), "email,path\na@x.com,/app/itk\n");
        assert!(analyzer().clean_file(&input).is_empty());
        assert!(matches!(
            analyzer().try_clean_file(&input),
            Err(AnalysisError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_run_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(dir.path(), RAW);
        let out = dir.path().join("output");

        let report = analyzer().try_run(&input, &out, 1).unwrap();
        assert_eq!(report.rows, 5);
        assert_eq!(report.identities, 2);
        assert_eq!(report.unregistered_categories, vec!["brand-new".to_string()]);
        assert!(report.cleaned_path.exists());

        let chord: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report.chord_path.unwrap()).unwrap()).unwrap();
        assert_eq!(chord["kind"], "chord_layout");
        assert_eq!(chord["producer"]["run_id"], report.run_id.as_str());
        assert_eq!(chord["data"]["nodes"].as_array().unwrap().len(), 5);

        let hierarchy: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report.hierarchy_path.unwrap()).unwrap())
                .unwrap();
        let nodes = hierarchy["data"]["nodes"].as_array().unwrap();
        assert!(nodes.iter().any(|n| n["label"] == "Other" && n["value"] == 1));
        assert!(report.summary_path.unwrap().exists());
    }

    #[test]
    fn test_run_skips_diagrams_for_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(
            dir.path(),
            "person.properties.email,properties.$sent_at,properties.$pathname\n\
             support.metier@elzeard.co,2024-01-01T10:00:00Z,/app/settings\n",
        );
        let out = dir.path().join("output");

        let report = analyzer().try_run(&input, &out, 1).unwrap();
        assert_eq!(report.rows, 0);
        assert!(report.chord_path.is_none());
        assert!(report.hierarchy_path.is_none());
        assert!(!out.join(CHORD_FILE).exists());
        assert!(report.cleaned_path.exists());
    }

    #[test]
    fn test_catch_all_is_run_scoped() {
        let analyzer = analyzer();
        let with_unknown = CleanedDataset::new(vec![EventRecord {
            identity: "a@x.com".to_string(),
            category: "brand-new".to_string(),
            start_date: None,
            start_time: None,
            datetime: None,
        }]);
        let first = analyzer.build_graph(&with_unknown);
        assert_eq!(first.assignment().cohorts().last().unwrap().members.len(), 1);

        let second = analyzer.build_graph(&CleanedDataset::default());
        assert!(second.assignment().cohorts().last().unwrap().members.is_empty());
    }
}
