use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::application::{ReviewState, ReviewStore};
use crate::domain::{
    BatchError, BatchFailure, BatchReport, DomainError, ExtractionRecord, Schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A batch run plus, once it completes, the review of its records.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub documents: usize,
    pub schema: Schema,
    pub review: Option<ReviewStore>,
    pub failures: BatchFailure,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(schema: Schema, documents: usize) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0,
            documents,
            schema,
            review: None,
            failures: BatchFailure::new(),
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id,
            status: self.status,
            progress: self.progress,
            documents: self.documents,
            review: self.review.as_ref().map(ReviewStore::state),
            records: self
                .review
                .as_ref()
                .map(|r| r.records().to_vec())
                .unwrap_or_default(),
            failures: self.failures.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub documents: usize,
    pub review: Option<ReviewState>,
    pub records: Vec<ExtractionRecord>,
    pub failures: BatchFailure,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Batch jobs of this process. Locks are never held across an await.
///
/// Finished jobs are dropped once they are older than the retention window;
/// the sweep runs whenever a new job is inserted.
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, BatchJob>>,
    retention: TimeDelta,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_JOB_RETENTION)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn insert(&self, job: BatchJob) -> Result<Uuid, DomainError> {
        let id = job.job_id;
        let mut jobs = self.write()?;
        let evicted = Self::evict_expired(&mut jobs, self.retention);
        if evicted > 0 {
            debug!(evicted, "expired batch jobs dropped");
        }
        jobs.insert(id, job);
        Ok(id)
    }

    /// Drops finished jobs past the retention window; returns how many went.
    pub fn prune(&self) -> Result<usize, DomainError> {
        Ok(Self::evict_expired(&mut *self.write()?, self.retention))
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(jobs: &mut HashMap<Uuid, BatchJob>, retention: TimeDelta) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };
        let before = jobs.len();
        jobs.retain(|_, job| job.completed_at.map_or(true, |done| done > cutoff));
        before - jobs.len()
    }

    pub fn snapshot(&self, id: Uuid) -> Result<JobSnapshot, DomainError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        jobs.get(&id)
            .map(BatchJob::snapshot)
            .ok_or_else(|| DomainError::not_found(format!("Batch job {id}")))
    }

    pub fn remove(&self, id: Uuid) -> Result<BatchJob, DomainError> {
        self.write()?
            .remove(&id)
            .ok_or_else(|| DomainError::not_found(format!("Batch job {id}")))
    }

    /// Runs `f` against the job under the write lock.
    pub fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut BatchJob) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut jobs = self.write()?;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("Batch job {id}")))?;
        f(job)
    }

    pub fn mark_processing(&self, id: Uuid) -> Result<(), DomainError> {
        self.update(id, |job| {
            job.status = JobStatus::Processing;
            Ok(())
        })
    }

    pub fn set_progress(&self, id: Uuid, progress: u8) -> Result<(), DomainError> {
        self.update(id, |job| {
            job.progress = job.progress.max(progress);
            Ok(())
        })
    }

    pub fn finish(&self, id: Uuid, outcome: Result<BatchReport, BatchError>) -> Result<(), DomainError> {
        self.update(id, |job| {
            job.completed_at = Some(Utc::now());
            job.progress = 100;
            match outcome {
                Ok(report) => {
                    job.status = JobStatus::Completed;
                    job.review = Some(ReviewStore::new(job.schema.clone(), report.records));
                    job.failures = report.failures;
                }
                Err(err) => {
                    job.status = JobStatus::Failed;
                    job.error = Some(err.to_string());
                    if let Some(failures) = err.failures() {
                        job.failures = failures.clone();
                    }
                }
            }
            Ok(())
        })
    }

    /// Applies `f` to the review of a completed job.
    pub fn with_review<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ReviewStore) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        self.update(id, |job| match job.review.as_mut() {
            Some(review) => f(review),
            None => Err(DomainError::validation(format!(
                "Batch job {} has no records to review",
                job.job_id
            ))),
        })
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, BatchJob>>, DomainError> {
        self.jobs
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailedDocument;

    fn schema() -> Schema {
        Schema::new(["Nama"]).unwrap()
    }

    #[test]
    fn test_lifecycle_to_completed() {
        let registry = JobRegistry::new();
        let id = registry.insert(BatchJob::new(schema(), 2)).unwrap();
        assert_eq!(registry.snapshot(id).unwrap().status, JobStatus::Pending);

        registry.mark_processing(id).unwrap();
        registry.set_progress(id, 50).unwrap();
        registry.set_progress(id, 20).unwrap();
        assert_eq!(registry.snapshot(id).unwrap().progress, 50);

        let mut failures = BatchFailure::new();
        failures.push(FailedDocument::new("b.png", "timeout"));
        let report = BatchReport {
            records: vec![ExtractionRecord::new().with("Nama", "Budi")],
            failures,
        };
        registry.finish(id, Ok(report)).unwrap();

        let snapshot = registry.snapshot(id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(snapshot.review, Some(ReviewState::Open));
    }

    #[test]
    fn test_failed_job_keeps_failures() {
        let registry = JobRegistry::new();
        let id = registry.insert(BatchJob::new(schema(), 1)).unwrap();
        let mut failures = BatchFailure::new();
        failures.push(FailedDocument::new("a.png", "boom"));

        registry
            .finish(id, Err(BatchError::NothingExtracted { failures }))
            .unwrap();

        let snapshot = registry.snapshot(id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert!(snapshot.error.unwrap().contains("a.png: boom"));
        assert!(snapshot.records.is_empty());
        assert!(registry.with_review(id, |r| r.commit()).is_err());
    }

    #[test]
    fn test_finished_jobs_expire() {
        let registry = JobRegistry::with_retention(Duration::ZERO);
        let done = registry.insert(BatchJob::new(schema(), 1)).unwrap();
        registry
            .finish(done, Err(BatchError::NoDocuments))
            .unwrap();
        let running = registry.insert(BatchJob::new(schema(), 1)).unwrap();

        assert!(matches!(registry.snapshot(done), Err(DomainError::NotFound(_))));
        assert_eq!(registry.snapshot(running).unwrap().status, JobStatus::Pending);
        assert_eq!(registry.prune().unwrap(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_recent_jobs_are_kept() {
        let registry = JobRegistry::new();
        let id = registry.insert(BatchJob::new(schema(), 1)).unwrap();
        registry.finish(id, Err(BatchError::NoDocuments)).unwrap();
        assert_eq!(registry.prune().unwrap(), 0);
        assert!(registry.snapshot(id).is_ok());
    }

    #[test]
    fn test_review_edits_and_removal() {
        let registry = JobRegistry::new();
        let id = registry.insert(BatchJob::new(schema(), 1)).unwrap();
        registry
            .finish(
                id,
                Ok(BatchReport {
                    records: vec![ExtractionRecord::new().with("Nama", "x")],
                    failures: BatchFailure::new(),
                }),
            )
            .unwrap();

        registry.with_review(id, |r| r.edit(0, "Nama", "Siti")).unwrap();
        assert_eq!(registry.snapshot(id).unwrap().records[0].get("Nama"), Some("Siti"));

        registry.remove(id).unwrap();
        assert!(matches!(registry.snapshot(id), Err(DomainError::NotFound(_))));
    }
}
