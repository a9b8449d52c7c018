use serde::Serialize;
use std::fmt::Write;

use crate::models::{BatchSession, JobStatus, SessionId, SessionStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_index: usize,
    pub source: Option<String>,
    pub error: String,
    pub duration_ms: Option<u64>,
}

/// Aggregate statistics for one batch session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub not_processed: usize,
    /// Completed share of processed rows, 0–100.
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub errors: Vec<RowError>,
}

impl BatchReport {
    pub fn from_session(session: &BatchSession) -> Self {
        let processed = session.processed();
        let durations: Vec<u64> = session.jobs.iter().filter_map(|j| j.duration_ms).collect();
        let errors = session
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .map(|j| RowError {
                row_index: j.row_index,
                source: j.source.as_ref().map(|s| s.to_string()),
                error: j.error.clone().unwrap_or_default(),
                duration_ms: j.duration_ms,
            })
            .collect();

        Self {
            session_id: session.id,
            status: session.status,
            total: session.total(),
            completed: session.completed_jobs,
            failed: session.failed_jobs,
            not_processed: session.total() - processed.min(session.total()),
            success_rate: if processed == 0 {
                0.0
            } else {
                session.completed_jobs as f64 * 100.0 / processed as f64
            },
            average_duration_ms: if durations.is_empty() {
                0.0
            } else {
                durations.iter().sum::<u64>() as f64 / durations.len() as f64
            },
            errors,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "# Batch Report");
        let _ = writeln!(output, "Session {} ({})", self.session_id, self.status);
        let _ = writeln!(output);
        let _ = writeln!(output, "## Summary");
        let _ = writeln!(output, "- Rows: {}", self.total);
        let _ = writeln!(output, "- Completed: {}", self.completed);
        let _ = writeln!(output, "- Failed: {}", self.failed);
        if self.not_processed > 0 {
            let _ = writeln!(output, "- Not processed: {}", self.not_processed);
        }
        let _ = writeln!(output, "- Success rate: {:.1}%", self.success_rate);
        let _ = writeln!(output, "- Average duration: {:.0} ms", self.average_duration_ms);
        let _ = writeln!(output);
        let _ = writeln!(output, "## Row Errors");

        if self.errors.is_empty() {
            let _ = writeln!(output, "No rows failed.");
        } else {
            for e in &self.errors {
                let _ = writeln!(
                    output,
                    "- Row {} ({}): {}",
                    e.row_index + 1,
                    e.source.as_deref().unwrap_or("no source"),
                    e.error
                );
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchJob, SourceReference};
    use crate::types::OverrideMetadata;

    fn finished_session() -> BatchSession {
        let mut jobs: Vec<BatchJob> = (0..4)
            .map(|i| BatchJob::new(i, SourceReference::parse(&format!("r{i}.xlsx")), OverrideMetadata::new()))
            .collect();
        for (i, job) in jobs.iter_mut().enumerate().take(3) {
            job.duration_ms = Some(100 * (i as u64 + 1));
            job.status = JobStatus::Completed;
        }
        jobs[2].status = JobStatus::Failed;
        jobs[2].error = Some("fetch failed: Source not found: r2.xlsx".into());

        let mut session = BatchSession::new(jobs);
        session.completed_jobs = 2;
        session.failed_jobs = 1;
        session.status = SessionStatus::Cancelled;
        session
    }

    #[test]
    fn aggregates_counts_and_durations() {
        let report = BatchReport::from_session(&finished_session());
        assert_eq!(report.total, 4);
        assert_eq!(report.not_processed, 1);
        assert!((report.success_rate - 66.666).abs() < 0.01);
        assert_eq!(report.average_duration_ms, 200.0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_index, 2);
        assert_eq!(report.errors[0].source.as_deref(), Some("r2.xlsx"));
    }

    #[test]
    fn renders_markdown_and_json() {
        let report = BatchReport::from_session(&finished_session());
        let md = report.to_markdown();
        assert!(md.starts_with("# Batch Report\n"));
        assert!(md.contains("- Success rate: 66.7%"));
        assert!(md.contains("- Row 3 (r2.xlsx): fetch failed"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "cancelled");
        assert_eq!(json["notProcessed"], 1);
        assert_eq!(json["errors"][0]["rowIndex"], 2);
    }
}
