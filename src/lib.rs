//! Navflow - navigation analytics over page-view event logs
//!
//! Navflow turns a raw page-view extraction into a cleaned event log and two
//! views of how users move between application sections through a
//! deterministic pipeline: identity cleaning → datetime reconstruction →
//! category resolution → deduplication → transition graph → chord layout and
//! cohort hierarchy.
//!
//! ## Modules
//!
//! - **Cleaning**: [`normalizer`], [`resolver`], [`dedup`] with an [`audit`] trail
//! - **Graph**: [`graph`] transition counts over per-user sequences, [`cohort`] partition
//! - **Rendering inputs**: [`layout`] chord geometry, [`hierarchy`] treemap nodes
//! - **Batch**: [`pipeline::Analyzer`] runs everything from file to artifacts

pub mod audit;
pub mod cohort;
pub mod config;
pub mod dedup;
pub mod encoder;
pub mod error;
pub mod extract;
pub mod graph;
pub mod hierarchy;
pub mod layout;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod style;
pub mod summary;
pub mod types;

pub use audit::{AuditLog, Stage};
pub use cohort::{CohortAssignment, CohortTable, RunCohorts};
pub use config::{AnalysisConfig, CleaningRules, InputColumns};
pub use error::AnalysisError;
pub use extract::{extract_to_csv, QueryCatalog, RowExtractor};
pub use graph::TransitionGraph;
pub use hierarchy::{build_hierarchy, Hierarchy};
pub use layout::{chord_layout, ChordLayout};
pub use pipeline::{Analyzer, CleaningOutcome, RunReport};
pub use summary::DatasetSummary;
pub use types::{CleanedDataset, EventRecord, RawRecord};

/// Navflow version embedded in all artifacts
pub const NAVFLOW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for artifacts
pub const PRODUCER_NAME: &str = "navflow";
