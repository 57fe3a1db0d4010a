use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::domain::{
    ApplicationId, ApplicationStatus, AuditEntry, AuditEntryId, JobApplication, ScreeningAnswer,
};
use super::repository::{ApplicationDirectory, DirectoryError};
use super::retention::AuditRetentionPolicy;

/// One initial pass plus exactly one retry after a write conflict.
const SAVE_ATTEMPTS: usize = 2;

/// Concurrency-safe write path for the application aggregate. Every save
/// reloads the authoritative copy, merges the caller's changes onto it, and
/// commits optimistically; retention pruning runs on the merged trail before
/// the commit.
pub struct ApplicationStore<D> {
    directory: Arc<D>,
    retention: AuditRetentionPolicy,
}

impl<D> ApplicationStore<D>
where
    D: ApplicationDirectory,
{
    pub fn new(directory: Arc<D>, retention: AuditRetentionPolicy) -> Self {
        Self {
            directory,
            retention,
        }
    }

    /// Persist the caller's aggregate. A conflicting commit triggers one
    /// full reload-and-merge retry; a second conflict surfaces as
    /// [`StoreError::ConflictExhausted`]. A row deleted underneath the
    /// caller is recovered by re-inserting the caller's copy.
    pub async fn save(&self, application: JobApplication) -> Result<JobApplication, StoreError> {
        let id = application.id;

        for attempt in 0..SAVE_ATTEMPTS {
            if attempt > 0 {
                warn!(application = %id, "write conflict on application, retrying merge");
            }

            let now = Utc::now();
            let candidate = match self.directory.find_application_by_id(id).await? {
                Some(fresh) => {
                    let mut merged = merge_aggregate(fresh, &application);
                    self.retention.prune(&mut merged.audit_trail, now);
                    merged
                }
                None => {
                    let mut reinserted = application.clone();
                    self.retention.prune(&mut reinserted.audit_trail, now);
                    match self.directory.insert_application(reinserted).await {
                        Ok(stored) => return Ok(stored),
                        Err(DirectoryError::Conflict) => continue,
                        Err(other) => return Err(other.into()),
                    }
                }
            };

            match self.directory.commit_application(candidate).await {
                Ok(stored) => return Ok(stored),
                Err(DirectoryError::Conflict) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(StoreError::ConflictExhausted(id))
    }

    /// Administrative override: set the status on every targeted row in one
    /// read and one atomic commit, bypassing transition validation. Missing
    /// ids are skipped; the count reflects rows actually updated. Audit
    /// entries for the change are the calling layer's responsibility.
    pub async fn bulk_update(
        &self,
        ids: &[ApplicationId],
        status: ApplicationStatus,
        reason: Option<&str>,
    ) -> Result<usize, StoreError> {
        let mut rows = self.directory.find_applications(ids).await?;
        if rows.is_empty() {
            debug!(requested = ids.len(), "bulk status update matched no rows");
            return Ok(0);
        }

        let now = Utc::now();
        for row in rows.iter_mut() {
            row.apply_status(status, reason.map(str::to_owned), now);
        }

        let count = rows.len();
        self.directory.commit_applications(rows).await?;
        debug!(
            count,
            status = status.label(),
            "bulk status update committed"
        );
        Ok(count)
    }

    /// Append an audit entry. Entries with an application back-reference go
    /// through the merge-save so concurrent appends union and retention
    /// applies; entries without one land on the directory's global feed.
    pub async fn add_audit_entry(&self, entry: AuditEntry) -> Result<(), StoreError> {
        match entry.application {
            Some(application_id) => {
                let mut application = self
                    .directory
                    .find_application_by_id(application_id)
                    .await?
                    .ok_or(StoreError::ApplicationMissing(application_id))?;
                application.audit_trail.push(entry);
                self.save(application).await?;
                Ok(())
            }
            None => Ok(self.directory.append_audit(entry).await?),
        }
    }
}

/// Merge the caller's aggregate onto the freshly loaded copy. Scalars take
/// the caller's values; the audit trail unions; screening answers are
/// replaced wholesale. The fresh copy keeps its revision so the commit's
/// conflict check stays meaningful.
fn merge_aggregate(mut fresh: JobApplication, caller: &JobApplication) -> JobApplication {
    fresh.status = caller.status;
    fresh.submitted_at = caller.submitted_at;
    fresh.rejection_reason = caller.rejection_reason.clone();
    union_audit_trail(&mut fresh.audit_trail, &caller.audit_trail);
    replace_screening_answers(&mut fresh.screening_answers, &caller.screening_answers);
    fresh
}

/// Audit trails only grow: entries the caller holds that the stored copy
/// lacks are appended in the caller's order, keyed by entry id.
fn union_audit_trail(persisted: &mut Vec<AuditEntry>, incoming: &[AuditEntry]) {
    let known: HashSet<AuditEntryId> = persisted.iter().map(|entry| entry.id).collect();
    for entry in incoming {
        if !known.contains(&entry.id) {
            persisted.push(entry.clone());
        }
    }
}

/// Screening answers belong to the latest writer: the engine always supplies
/// the complete list, so the caller's set replaces the stored one outright.
fn replace_screening_answers(persisted: &mut Vec<ScreeningAnswer>, incoming: &[ScreeningAnswer]) {
    persisted.clear();
    persisted.extend_from_slice(incoming);
}

/// Error raised by the application store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("concurrent writes exhausted the merge retry for application {0}")]
    ConflictExhausted(ApplicationId),
    #[error("application {0} no longer exists")]
    ApplicationMissing(ApplicationId),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
