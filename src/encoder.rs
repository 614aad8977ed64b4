//! Artifact encoding
//!
//! Wraps rendered outputs in an envelope carrying producer and provenance
//! metadata before handing them to the rendering collaborator as JSON.

use crate::error::AnalysisError;
use crate::{NAVFLOW_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    /// Identifies the run that produced the artifact
    pub run_id: String,
}

/// A rendered output with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub kind: String,
    pub producer: Producer,
    /// Input file the artifact was computed from
    pub source: String,
    pub computed_at_utc: String,
    pub data: T,
}

/// Encoder stamping every artifact of a run with the same run id
pub struct ArtifactEncoder {
    run_id: String,
}

impl Default for ArtifactEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactEncoder {
    /// Create a new encoder with a unique run ID
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_run_id(run_id: String) -> Self {
        Self { run_id }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn wrap<T: Serialize>(&self, kind: &str, source: &str, data: T) -> Artifact<T> {
        Artifact {
            kind: kind.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: NAVFLOW_VERSION.to_string(),
                run_id: self.run_id.clone(),
            },
            source: source.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            data,
        }
    }

    /// Encode an artifact as pretty-printed JSON
    pub fn encode_to_json<T: Serialize>(
        &self,
        kind: &str,
        source: &str,
        data: &T,
    ) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(&self.wrap(kind, source, data))?)
    }
}
