//! Step records and the persisted run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lifecycle of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    /// Conceptual only: steps never reached after an abort produce no
    /// record at all
    Skipped,
}

impl StepStatus {
    /// Console glyph for progress and summary lines
    pub fn glyph(&self) -> &'static str {
        match self {
            StepStatus::Pending => "[.]",
            StepStatus::Running => "[>]",
            StepStatus::Success => "[OK]",
            StepStatus::Failed => "[ERROR]",
            StepStatus::Skipped => "[-]",
        }
    }
}

/// Outcome of one executed step. Created when the runner begins the
/// step, mutated only by the executor while it runs, immutable once
/// terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    /// Wall-clock seconds from just before invocation to just after
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub started_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            duration: 0.0,
            error: None,
            started_at: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Write-once summary of one pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<StepRecord>,
    pub total_time: f64,
    pub success_count: usize,
    pub failed_count: usize,
}

impl RunReport {
    /// Aggregate the finished records of one run
    pub fn from_records(records: &[StepRecord]) -> Self {
        Self {
            timestamp: Utc::now(),
            total_time: records.iter().map(|r| r.duration).sum(),
            success_count: records
                .iter()
                .filter(|r| r.status == StepStatus::Success)
                .count(),
            failed_count: records.iter().filter(|r| r.is_failed()).count(),
            results: records.to_vec(),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        println!("\n[OK] Report saved to: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: StepStatus, duration: f64) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            status,
            duration,
            error: None,
            started_at: None,
        }
    }

    #[test]
    fn test_aggregation() {
        let records = vec![
            record("find_tools", StepStatus::Success, 0.5),
            record("run_apktool_decompile", StepStatus::Failed, 2.0),
            record("sign_apk", StepStatus::Success, 1.5),
        ];
        let report = RunReport::from_records(&records);

        assert_eq!(report.success_count, 2);
        assert_eq!(report.failed_count, 1);
        assert!((report.total_time - 4.0).abs() < f64::EPSILON);
        assert_eq!(report.results.len(), 3);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&StepStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }

    #[test]
    fn test_error_field_omitted_when_absent() {
        let ok = record("a", StepStatus::Success, 0.1);
        let json = serde_json::to_string(&ok).unwrap();
        assert!(!json.contains("error"));

        let mut failed = record("b", StepStatus::Failed, 0.1);
        failed.error = Some("apktool failed".to_string());
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("apktool failed"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline_report.json");

        let report = RunReport::from_records(&[record("sign_apk", StepStatus::Success, 1.0)]);
        report.save(&path).unwrap();

        let loaded: RunReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.success_count, 1);
        assert_eq!(loaded.results[0].name, "sign_apk");
    }
}
