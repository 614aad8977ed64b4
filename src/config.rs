//! Analysis configuration
//!
//! Static tables used by a run: identities to exclude, path patterns to drop,
//! the slug → display name mapping and the cohort partition. The defaults carry
//! the production tables; a JSON file can override any of them.

use crate::error::AnalysisError;
use crate::style::parse_hex_color;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

/// Name of the catch-all cohort for categories missing from the table
pub const DEFAULT_CATCH_ALL: &str = "Other";

/// Column names in the extraction file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputColumns {
    pub identity: String,
    pub timestamp: String,
    pub path: String,
}

impl Default for InputColumns {
    fn default() -> Self {
        Self {
            identity: "person.properties.email".to_string(),
            timestamp: "properties.$sent_at".to_string(),
            path: "properties.$pathname".to_string(),
        }
    }
}

impl InputColumns {
    /// Columns of a cleaned output file, for feeding it back as raw input
    pub fn cleaned() -> Self {
        Self {
            identity: "identity".to_string(),
            timestamp: "datetime".to_string(),
            path: "category".to_string(),
        }
    }
}

/// A named group of categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortSpec {
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// The cohort absorbing every unregistered category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchAllSpec {
    pub name: String,
    pub color: String,
}

impl Default for CatchAllSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_CATCH_ALL.to_string(),
            color: "#B0B0B0".to_string(),
        }
    }
}

/// Complete configuration of one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub columns: InputColumns,
    /// Test and spam accounts, compared after trimming and lower-casing
    pub excluded_identities: BTreeSet<String>,
    /// Regexes matched against the raw path; a match drops the row
    pub excluded_path_patterns: Vec<String>,
    /// Leading path segments skipped before taking the category slug
    pub path_prefixes: Vec<String>,
    /// Raw slug → display name; unknown slugs keep their raw value
    pub category_mapping: BTreeMap<String, String>,
    /// Cohorts in layout priority order
    pub cohorts: Vec<CohortSpec>,
    pub catch_all: CatchAllSpec,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let excluded_identities = [
            "gilles.delaporte@gmail.com",
            "rakor18295@cashbn.com",
            "hetipab931@cpaurl.com",
            "rehamap774@exoular.com",
            "support.metier@elzeard.co",
            "sepesom5@confmin.com",
            "toveri9809@exoular.com",
            "hetipab931@cpauri.com",
            "sacovah899@cironex.com",
            "bamod43309@gianes.com",
            "loyopi5028@acroins.com",
            "doxeyen818@nestivia.com",
            "babaxam809@chainds.com",
            "yehemot246@chainds.com",
            "semoke7668@cantozil.com",
            "darnala.b@gmail.com",
            "gilles.delaporte@elzeard.co",
            "guillaume.caute@elzeard.co",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let category_mapping = [
            ("parametrage", "Dessiner mes parcelles"),
            ("settings", "Paramétrer ma ferme"),
            ("intrants", "Mes intrants"),
            ("mytasks", "Mes tâches"),
            ("itk", "Mes itinéraires de culture"),
            ("plan", "Mes planifications"),
            ("my-farm", "Plan de Culture"),
            ("mes-cultures", "Fiches de culture"),
            ("implantation", "Mes implantations"),
            ("mon-calendrier", "Mon semainier"),
            ("harvest", "Mon prévisionnel de récoltes"),
            ("seeds", "Mes semences et plants"),
            ("tracking", "Ma traçabilité"),
            ("supply", "Gestion de stock"),
            ("intrantdashboard", "Consommations intrants"),
            ("statistics", "Analyse des ventes"),
            ("account", "Mon Compte"),
            ("cultivars", "Semences et plants"),
            ("", "Mon Compte"),
            ("mes-fermes", "mes-fermes"),
        ]
        .into_iter()
        .map(|(slug, name)| (slug.to_string(), name.to_string()))
        .collect();

        let cohort = |name: &str, color: &str, categories: &[&str]| CohortSpec {
            name: name.to_string(),
            color: color.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        };

        let cohorts = vec![
            cohort(
                "Bienvenue",
                "#FF9E9E",
                &["bienvenue", "Mon Compte", "account-confirm", "auth", "mes-fermes"],
            ),
            cohort(
                "Paramètrer",
                "#FFD580",
                &[
                    "Dessiner mes parcelles",
                    "Paramétrer ma ferme",
                    "Mes intrants",
                    "Semences et plants",
                    "Mes tâches",
                ],
            ),
            cohort(
                "Planifier",
                "#A2D5A2",
                &["Mes itinéraires de culture", "Mes planifications"],
            ),
            cohort(
                "Cultiver",
                "#90CAF9",
                &[
                    "Plan de Culture",
                    "Fiches de culture",
                    "Mes implantations",
                    "Mon semainier",
                    "Mon prévisionnel de récoltes",
                    "mes-observations",
                ],
            ),
            cohort(
                "Diffuser",
                "#C1A4D9",
                &[
                    "Mes semences et plants",
                    "Ma traçabilité",
                    "Gestion de stock",
                    "Consommations intrants",
                    "Analyse des ventes",
                ],
            ),
            cohort("Tutorial", "#FF0000", &["tutorial"]),
        ];

        Self {
            columns: InputColumns::default(),
            excluded_identities,
            excluded_path_patterns: vec!["ma-ferme".to_string()],
            path_prefixes: vec!["app".to_string()],
            category_mapping,
            cohorts,
            catch_all: CatchAllSpec::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants the cleaning and cohort stages rely on
    pub fn validate(&self) -> Result<(), AnalysisError> {
        for (label, column) in [
            ("identity", &self.columns.identity),
            ("timestamp", &self.columns.timestamp),
            ("path", &self.columns.path),
        ] {
            if column.trim().is_empty() {
                return Err(AnalysisError::InvalidConfig(format!(
                    "empty {} column name",
                    label
                )));
            }
        }

        let mut names = HashSet::new();
        let mut assigned: BTreeMap<&str, &str> = BTreeMap::new();
        for cohort in &self.cohorts {
            if cohort.name == self.catch_all.name {
                return Err(AnalysisError::InvalidConfig(format!(
                    "cohort '{}' shadows the catch-all cohort",
                    cohort.name
                )));
            }
            if !names.insert(cohort.name.as_str()) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "duplicate cohort '{}'",
                    cohort.name
                )));
            }
            check_color(&cohort.name, &cohort.color)?;
            for category in &cohort.categories {
                if let Some(previous) = assigned.insert(category.as_str(), cohort.name.as_str()) {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "category '{}' assigned to both '{}' and '{}'",
                        category, previous, cohort.name
                    )));
                }
            }
        }
        check_color(&self.catch_all.name, &self.catch_all.color)?;

        RegexSet::new(&self.excluded_path_patterns)?;
        Ok(())
    }

    /// Compile the cleaning tables into their read-only form
    pub fn cleaning_rules(&self) -> Result<CleaningRules, AnalysisError> {
        Ok(CleaningRules {
            excluded_identities: self
                .excluded_identities
                .iter()
                .map(|identity| identity.trim().to_lowercase())
                .collect(),
            excluded_paths: RegexSet::new(&self.excluded_path_patterns)?,
            path_prefixes: self.path_prefixes.clone(),
            category_mapping: self.category_mapping.clone(),
        })
    }
}

fn check_color(owner: &str, color: &str) -> Result<(), AnalysisError> {
    match parse_hex_color(color) {
        Some(_) => Ok(()),
        None => Err(AnalysisError::InvalidConfig(format!(
            "cohort '{}' has invalid color '{}'",
            owner, color
        ))),
    }
}

/// Read-only cleaning tables, compiled once per run
#[derive(Debug, Clone)]
pub struct CleaningRules {
    pub excluded_identities: HashSet<String>,
    pub excluded_paths: RegexSet,
    pub path_prefixes: Vec<String>,
    pub category_mapping: BTreeMap<String, String>,
}
