//! Job-application lifecycle: the status rule table, the five
//! candidate-facing operations, the concurrency-safe store with its merge
//! protocol, and audit retention.

pub mod domain;
pub mod engine;
pub mod repository;
pub mod retention;
pub mod store;


pub use domain::{
    ApplicantId, ApplicantProfile, ApplicationId, ApplicationStatus, AuditActor, AuditEntry,
    AuditEntryId, CvRecord, JobApplication, JobId, JobPosting, ScreeningAnswer, StorageToken,
};
pub use engine::{
    ApplicationEngine, EngineError, LifecycleOutcome, RefusalReason, ScreeningAnswerCommand,
    MANDATORY_REQUIREMENT_REJECTION,
};
pub use repository::{ApplicationDirectory, DirectoryError, Notifier, NotifyError};
pub use retention::AuditRetentionPolicy;
pub use store::{ApplicationStore, StoreError};
