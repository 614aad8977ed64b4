//! Identity audit trail
//!
//! Each cleaning stage reports the identities still present after it ran; the
//! audit log records which ones disappeared at that stage and logs them. Pure
//! observability: nothing in the data path reads it back.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

/// Cleaning stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    IdentityCleaning,
    DatetimeReconstruction,
    CategoryResolution,
    Deduplication,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::IdentityCleaning => "identity_cleaning",
            Stage::DatetimeReconstruction => "datetime_reconstruction",
            Stage::CategoryResolution => "category_resolution",
            Stage::Deduplication => "deduplication",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identities that vanished at one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageExclusions {
    pub stage: Stage,
    pub excluded: BTreeSet<String>,
}

/// Per-stage record of disappearing identities
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditLog {
    initial: BTreeSet<String>,
    current: BTreeSet<String>,
    stages: Vec<StageExclusions>,
}

impl AuditLog {
    /// Start an audit from the identities present in the loaded file
    pub fn start(initial: BTreeSet<String>) -> Self {
        info!(unique_identities = initial.len(), "loaded identities");
        Self {
            current: initial.clone(),
            initial,
            stages: Vec::new(),
        }
    }

    /// Record the identities remaining after `stage`
    pub fn checkpoint(&mut self, stage: Stage, remaining: BTreeSet<String>) {
        let excluded: BTreeSet<String> = self.current.difference(&remaining).cloned().collect();
        if !excluded.is_empty() {
            info!(stage = %stage, count = excluded.len(), "identities excluded");
            for identity in &excluded {
                info!(stage = %stage, identity = %identity, "excluded identity");
            }
        }
        self.stages.push(StageExclusions { stage, excluded });
        self.current = remaining;
    }

    pub fn stages(&self) -> &[StageExclusions] {
        &self.stages
    }

    /// Identities excluded at `stage`, empty if the stage was not recorded
    pub fn excluded_at(&self, stage: Stage) -> BTreeSet<String> {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .flat_map(|s| s.excluded.iter().cloned())
            .collect()
    }

    pub fn initial_count(&self) -> usize {
        self.initial.len()
    }

    pub fn final_count(&self) -> usize {
        self.current.len()
    }

    /// Identities present at load time but gone by the last checkpoint
    pub fn total_excluded(&self) -> usize {
        self.initial.difference(&self.current).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_checkpoints_record_differences() {
        let mut audit = AuditLog::start(set(&["a", "b", "c", "D "]));
        audit.checkpoint(Stage::IdentityCleaning, set(&["a", "b", "c", "d"]));
        audit.checkpoint(Stage::DatetimeReconstruction, set(&["a", "b", "c", "d"]));
        audit.checkpoint(Stage::CategoryResolution, set(&["a", "c", "d"]));
        audit.checkpoint(Stage::Deduplication, set(&["a", "c", "d"]));

        assert_eq!(audit.excluded_at(Stage::IdentityCleaning), set(&["D "]));
        assert!(audit.excluded_at(Stage::DatetimeReconstruction).is_empty());
        assert_eq!(audit.excluded_at(Stage::CategoryResolution), set(&["b"]));
        assert_eq!(audit.stages().len(), 4);
        assert_eq!(audit.initial_count(), 4);
        assert_eq!(audit.final_count(), 3);
        assert_eq!(audit.total_excluded(), 2);
    }
}
