use async_trait::async_trait;

use super::domain::{
    ApplicantId, ApplicantProfile, ApplicationId, AuditEntry, JobApplication, JobId, JobPosting,
};

/// Persistence abstraction consumed by the store, engine, and CV worker so
/// every workflow can be exercised against in-memory doubles. The outer
/// database adapter implements it.
#[async_trait]
pub trait ApplicationDirectory: Send + Sync {
    /// Resolve the (applicant, job) pair to its active application, falling
    /// back to the most recently created withdrawn one. At most one
    /// non-withdrawn application exists per pair.
    async fn find_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<Option<JobApplication>, DirectoryError>;

    async fn find_application_by_id(
        &self,
        id: ApplicationId,
    ) -> Result<Option<JobApplication>, DirectoryError>;

    /// Load the targeted rows in one read. Ids without a row are silently
    /// absent from the result.
    async fn find_applications(
        &self,
        ids: &[ApplicationId],
    ) -> Result<Vec<JobApplication>, DirectoryError>;

    async fn insert_application(
        &self,
        application: JobApplication,
    ) -> Result<JobApplication, DirectoryError>;

    /// Optimistic commit: fails with [`DirectoryError::Conflict`] unless the
    /// stored revision still matches the submitted one, and bumps the
    /// revision on success.
    async fn commit_application(
        &self,
        application: JobApplication,
    ) -> Result<JobApplication, DirectoryError>;

    /// Commit a batch with the same revision check per row, all-or-nothing.
    async fn commit_applications(
        &self,
        applications: Vec<JobApplication>,
    ) -> Result<(), DirectoryError>;

    async fn find_applicant(
        &self,
        id: ApplicantId,
    ) -> Result<Option<ApplicantProfile>, DirectoryError>;

    /// Last-writer-wins profile write; only the application aggregate gets
    /// the merge protocol.
    async fn save_applicant(&self, profile: ApplicantProfile) -> Result<(), DirectoryError>;

    async fn get_job_posting(&self, id: JobId) -> Result<Option<JobPosting>, DirectoryError>;

    /// Record an entry on the global audit feed. Entries tied to an
    /// application go through the store instead so the merge and retention
    /// rules apply.
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("write conflict")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing the outbound applicant-notification hook (the real
/// e-mail adapter lives outside this crate).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
