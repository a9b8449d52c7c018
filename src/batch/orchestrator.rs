//! BatchOrchestrator: runs a session's jobs one at a time.
//!
//! Per row: fetch → load → strict extraction (heuristic fallback) →
//! canonicalize → hybrid row. A failing row marks its job `failed` and the
//! run moves on.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::source::WorkbookFetcher;
use crate::cache::SessionStore;
use crate::error::{BatchError, JobError};
use crate::excel::load_workbook;
use crate::export::{generate_hybrid_row, CombinedExport, ExportContext, HybridRow};
use crate::models::{
    BatchEvent, BatchJob, BatchSession, CanonicalRecord, JobStatus, SessionId, SessionStatus,
};
use crate::services::{canonicalize, empty_record, extract_with_fallback, HeuristicExtractor, StrictExtractor};
use crate::types::ExtractedValues;

pub const DEFAULT_JOB_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause between consecutive jobs; none after the last.
    pub inter_job_delay: Duration,
    pub export_context: ExportContext,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_job_delay: DEFAULT_JOB_DELAY,
            export_context: ExportContext::now(),
        }
    }
}

/// Final session state plus the rows of every completed job.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub session: BatchSession,
    pub export: CombinedExport,
}

struct JobOutput {
    extracted: Option<ExtractedValues>,
    record: CanonicalRecord,
    row: HybridRow,
}

pub struct BatchOrchestrator {
    store: Arc<SessionStore>,
    fetcher: Arc<dyn WorkbookFetcher>,
    strict: StrictExtractor,
    heuristic: HeuristicExtractor,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<SessionStore>, fetcher: Arc<dyn WorkbookFetcher>, config: BatchConfig) -> Self {
        Self {
            store,
            fetcher,
            strict: StrictExtractor::new(),
            heuristic: HeuristicExtractor,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn create_session(&self, jobs: Vec<BatchJob>) -> Result<SessionId, BatchError> {
        let session = BatchSession::new(jobs);
        tracing::info!(session_id = %session.id, total = session.total(), "Batch session created");
        self.store.create(session)
    }

    /// Takes effect before the next row starts.
    pub fn cancel(&self, id: SessionId) -> Result<(), BatchError> {
        tracing::info!(session_id = %id, "Batch cancellation requested");
        self.store.request_cancel(id)
    }

    /// Process every job of an idle session in input order. Events are
    /// delivered synchronously through `on_event`.
    pub async fn run(
        &self,
        id: SessionId,
        on_event: &(dyn Fn(&BatchEvent) + Send + Sync),
    ) -> Result<BatchOutcome, BatchError> {
        self.store.begin_run(id)?;
        let result = self.run_jobs(id, on_event).await;
        if let Err(e) = &result {
            self.abandon(id, e);
        }
        self.store.end_run(id);
        result
    }

    /// Leave a session that errored mid-run in a terminal state: the row in
    /// flight is failed and the session is marked cancelled.
    fn abandon(&self, id: SessionId, error: &BatchError) {
        tracing::error!(session_id = %id, error = %error, "Batch run aborted");
        let message = error.to_string();
        let updated = self.store.update(id, |s| {
            for job in s.jobs.iter_mut().filter(|j| j.status == JobStatus::Processing) {
                job.status = JobStatus::Failed;
                job.error = Some(message.clone());
                s.failed_jobs += 1;
            }
            s.status = SessionStatus::Cancelled;
            s.finished_at = Some(Utc::now());
        });
        if let Err(e) = updated {
            tracing::warn!(session_id = %id, error = %e, "Could not record aborted run");
        }
    }

    async fn run_jobs(
        &self,
        id: SessionId,
        on_event: &(dyn Fn(&BatchEvent) + Send + Sync),
    ) -> Result<BatchOutcome, BatchError> {
        let total = self.store.get(id)?.total();
        let run_start = Instant::now();
        tracing::info!(session_id = %id, total, "Batch run started");
        on_event(&BatchEvent::Started { session_id: id, total });

        let mut cancelled = false;
        for index in 0..total {
            if self.store.is_cancel_requested(id) {
                cancelled = true;
                break;
            }

            let (job, percent_complete) = self.store.update(id, |s| {
                s.jobs[index].status = JobStatus::Processing;
                (s.jobs[index].clone(), s.percent_complete())
            })?;
            on_event(&BatchEvent::Progress {
                session_id: id,
                index,
                total,
                status: JobStatus::Processing,
                percent_complete,
            });

            let started = Instant::now();
            let result = self.process_job(&job).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let (status, error) = self.store.update(id, |s| {
                let slot = &mut s.jobs[index];
                slot.duration_ms = Some(duration_ms);
                match result {
                    Ok(output) => {
                        slot.status = JobStatus::Completed;
                        slot.extracted = output.extracted;
                        slot.record = Some(output.record);
                        slot.output_row = Some(output.row);
                        s.completed_jobs += 1;
                        (JobStatus::Completed, None)
                    }
                    Err(e) => {
                        let message = e.to_string();
                        slot.status = JobStatus::Failed;
                        slot.error = Some(message.clone());
                        s.failed_jobs += 1;
                        (JobStatus::Failed, Some(message))
                    }
                }
            })?;
            match &error {
                Some(e) => tracing::warn!(session_id = %id, index, duration_ms, error = %e, "Batch job failed"),
                None => tracing::debug!(session_id = %id, index, duration_ms, "Batch job completed"),
            }
            on_event(&BatchEvent::JobFinished {
                session_id: id,
                index,
                status,
                error,
                duration_ms,
            });

            if index + 1 < total && !self.config.inter_job_delay.is_zero() {
                tokio::time::sleep(self.config.inter_job_delay).await;
            }
        }

        let session = self.store.update(id, |s| {
            s.status = if cancelled {
                SessionStatus::Cancelled
            } else {
                SessionStatus::Completed
            };
            s.finished_at = Some(Utc::now());
            s.clone()
        })?;

        tracing::info!(
            session_id = %id,
            status = %session.status,
            completed = session.completed_jobs,
            failed = session.failed_jobs,
            elapsed_ms = run_start.elapsed().as_millis() as u64,
            "Batch run finished"
        );
        let (completed_jobs, failed_jobs) = (session.completed_jobs, session.failed_jobs);
        let event = if cancelled {
            BatchEvent::Cancelled {
                session_id: id,
                completed_jobs,
                failed_jobs,
            }
        } else {
            BatchEvent::Completed {
                session_id: id,
                completed_jobs,
                failed_jobs,
            }
        };
        on_event(&event);

        let export = CombinedExport::from_rows(session.jobs.iter().filter_map(|j| j.output_row.as_ref()));
        Ok(BatchOutcome { session, export })
    }

    async fn process_job(&self, job: &BatchJob) -> Result<JobOutput, JobError> {
        let (extracted, record) = match &job.source {
            None => (None, empty_record()),
            Some(source) => {
                let bytes = self.fetcher.fetch(source).await?;
                let workbook = load_workbook(&bytes)?;
                let values = extract_with_fallback(&workbook, &self.strict, &self.heuristic)?;
                let record = canonicalize(&values);
                (Some(values), record)
            }
        };
        let row = generate_hybrid_row(&record, &job.metadata, &self.config.export_context);
        Ok(JobOutput { extracted, record, row })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::excel::workbook_to_xlsx_bytes;
    use crate::models::SourceReference;
    use crate::test_support::sample_workbook;
    use crate::types::OverrideMetadata;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Serves the sample workbook for every path except ones containing "missing".
    struct SampleFetcher {
        bytes: Vec<u8>,
    }

    impl SampleFetcher {
        fn new() -> Self {
            Self {
                bytes: workbook_to_xlsx_bytes(&sample_workbook()).unwrap(),
            }
        }
    }

    #[async_trait]
    impl WorkbookFetcher for SampleFetcher {
        async fn fetch(&self, source: &SourceReference) -> Result<Vec<u8>, FetchError> {
            let name = source.to_string();
            if name.contains("missing") {
                Err(FetchError::NotFound(name))
            } else if name.contains("garbage") {
                Ok(b"not a workbook".to_vec())
            } else {
                Ok(self.bytes.clone())
            }
        }
    }

    fn orchestrator(store: Arc<SessionStore>) -> BatchOrchestrator {
        BatchOrchestrator::new(
            store,
            Arc::new(SampleFetcher::new()),
            BatchConfig {
                inter_job_delay: Duration::ZERO,
                export_context: ExportContext::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            },
        )
    }

    fn job(index: usize, source: &str, client: &str) -> BatchJob {
        let metadata: OverrideMetadata = [("Client", client)].into_iter().collect();
        BatchJob::new(index, SourceReference::parse(source), metadata)
    }

    #[tokio::test]
    async fn runs_jobs_in_order_and_isolates_failures() {
        let store = Arc::new(SessionStore::new());
        let orch = orchestrator(store.clone());
        let id = orch
            .create_session(vec![
                job(0, "a.xlsx", "A"),
                job(1, "missing.xlsx", "B"),
                job(2, "garbage.xlsx", "C"),
                job(3, "", "D"),
            ])
            .unwrap();

        let events = Mutex::new(Vec::new());
        let outcome = orch.run(id, &|e: &BatchEvent| events.lock().unwrap().push(e.clone())).await.unwrap();

        let session = &outcome.session;
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.completed_jobs, 2);
        assert_eq!(session.failed_jobs, 2);
        assert!(session.jobs[1].error.as_deref().unwrap().contains("Source not found"));
        assert!(session.jobs[2].error.as_deref().unwrap().contains("workbook"));
        assert!(session.jobs.iter().all(|j| j.status.is_terminal() && j.duration_ms.is_some()));
        assert_eq!(
            session.jobs[3].record.as_ref().unwrap().metadata.extraction_method,
            crate::types::ExtractionMethod::None
        );

        let clients: Vec<&str> = outcome.export.rows.iter().map(|r| r.last().unwrap().as_str()).collect();
        assert_eq!(clients, vec!["A", "D"]);

        let events = events.into_inner().unwrap();
        assert!(matches!(events.first(), Some(BatchEvent::Started { total: 4, .. })));
        assert!(matches!(events.last(), Some(BatchEvent::Completed { completed_jobs: 2, failed_jobs: 2, .. })));
        let progress: Vec<(usize, u8)> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { index, percent_complete, .. } => Some((*index, *percent_complete)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(0, 0), (1, 25), (2, 50), (3, 75)]);
        assert_eq!(store.active_session(), None);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_row() {
        let store = Arc::new(SessionStore::new());
        let orch = orchestrator(store.clone());
        let jobs = (0..10).map(|i| job(i, &format!("row{i}.xlsx"), &format!("C{i}"))).collect();
        let id = orch.create_session(jobs).unwrap();

        let cancel_store = store.clone();
        let on_event = move |e: &BatchEvent| {
            if let BatchEvent::JobFinished { index: 2, session_id, .. } = e {
                cancel_store.request_cancel(*session_id).unwrap();
            }
        };
        let outcome = orch.run(id, &on_event).await.unwrap();

        let session = outcome.session;
        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(session.processed(), 3);
        assert!(session.jobs[3..].iter().all(|j| j.status == JobStatus::Pending));
        let clients: Vec<&str> = outcome.export.rows.iter().map(|r| r.last().unwrap().as_str()).collect();
        assert_eq!(clients, vec!["C0", "C1", "C2"]);
        assert!(session.finished_at.is_some());
    }

    #[tokio::test]
    async fn session_cannot_run_twice() {
        let store = Arc::new(SessionStore::new());
        let orch = orchestrator(store);
        let id = orch.create_session(vec![job(0, "a.xlsx", "A")]).unwrap();
        orch.run(id, &|_: &BatchEvent| {}).await.unwrap();
        assert!(matches!(orch.run(id, &|_: &BatchEvent| {}).await, Err(BatchError::NotIdle { .. })));
    }

    #[tokio::test]
    async fn aborted_run_leaves_a_terminal_session() {
        let store = Arc::new(SessionStore::new());
        let orch = orchestrator(store.clone());
        let id = orch
            .create_session(vec![job(0, "a.xlsx", "A"), job(1, "b.xlsx", "B")])
            .unwrap();
        store.begin_run(id).unwrap();
        store
            .update(id, |s| s.jobs[0].status = JobStatus::Processing)
            .unwrap();

        orch.abandon(id, &BatchError::StoreUnavailable);
        store.end_run(id);

        let session = store.get(id).unwrap();
        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(session.jobs[0].status, JobStatus::Failed);
        assert!(session.jobs[0].error.is_some());
        assert_eq!(session.jobs[1].status, JobStatus::Pending);
        assert_eq!(session.failed_jobs, 1);
        assert!(session.finished_at.is_some());
        assert_eq!(store.active_session(), None);
        assert!(matches!(orch.run(id, &|_: &BatchEvent| {}).await, Err(BatchError::NotIdle { .. })));
    }
}
