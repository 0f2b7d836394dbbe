//! Persistable verification report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::result::{VerificationRunResult, Violation};
use crate::config::ConfigSource;

/// Schema version for verification reports
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for verification reports
pub const REPORT_SCHEMA_ID: &str = "chainwitness/verification_report@1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub schema_version: u32,

    pub schema_id: String,

    pub created_at: DateTime<Utc>,

    pub supply_chain_id: String,

    pub run_is_valid: bool,

    pub violations: Vec<Violation>,

    /// Configuration the run was performed under
    #[serde(default)]
    pub config_sources: Vec<ConfigSource>,
}

impl VerificationReport {
    pub fn new(supply_chain_id: impl Into<String>, result: &VerificationRunResult, config_sources: Vec<ConfigSource>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            supply_chain_id: supply_chain_id.into(),
            run_is_valid: result.run_is_valid,
            violations: result.violations.clone(),
            config_sources,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}
