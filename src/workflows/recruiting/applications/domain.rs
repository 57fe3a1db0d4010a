use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier wrapper for job applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for candidate profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub Uuid);

impl ApplicantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApplicantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for audit entries; the merge union is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque handle to CV bytes held by the upload backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageToken(pub String);

impl fmt::Display for StorageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status tracked for every job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    Interview,
    Offer,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Whether a status change is permitted. Self-transitions are always
    /// legal so retried operations stay idempotent.
    pub fn can_transition_to(self, target: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        if self == target {
            return true;
        }

        matches!(
            (self, target),
            (Draft, Submitted)
                | (Draft, Withdrawn)
                | (Draft, Rejected)
                | (Submitted, Withdrawn)
                | (Submitted, Rejected)
                | (Submitted, Interview)
                | (Submitted, Offer)
                | (Interview, Offer)
                | (Interview, Rejected)
                | (Offer, Rejected)
                | (Offer, Withdrawn)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }
}

/// Who performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditActor {
    Applicant(ApplicantId),
    System,
    Staff(String),
}

impl fmt::Display for AuditActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditActor::Applicant(id) => write!(f, "applicant:{id}"),
            AuditActor::System => write!(f, "system"),
            AuditActor::Staff(name) => write!(f, "staff:{name}"),
        }
    }
}

/// Immutable record of one lifecycle action. Entries tied to an application
/// carry its id; applicant-level events (CV scans) leave it empty and land
/// on the global feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor: AuditActor,
    pub action: String,
    pub recorded_at: DateTime<Utc>,
    pub application: Option<ApplicationId>,
}

impl AuditEntry {
    pub fn applicant(
        applicant: ApplicantId,
        action: impl Into<String>,
        application: Option<ApplicationId>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            actor: AuditActor::Applicant(applicant),
            action: action.into(),
            recorded_at: Utc::now(),
            application,
        }
    }

    pub fn system(action: impl Into<String>, application: Option<ApplicationId>) -> Self {
        Self {
            id: AuditEntryId::new(),
            actor: AuditActor::System,
            action: action.into(),
            recorded_at: Utc::now(),
            application,
        }
    }
}

/// One screening answer, keyed by the posting's question order. The
/// requirement verdict stays tri-state: records written by outer layers may
/// not have been evaluated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningAnswer {
    pub order: usize,
    pub question: String,
    pub answer: String,
    pub meets_requirement: Option<bool>,
}

/// Aggregate root for one candidate's pursuit of one posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub job_id: JobId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub screening_answers: Vec<ScreeningAnswer>,
    pub audit_trail: Vec<AuditEntry>,
    /// Optimistic-concurrency token owned by the directory; bumped on every
    /// successful commit.
    pub revision: u64,
}

impl JobApplication {
    pub fn new(applicant_id: ApplicantId, job_id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            id: ApplicationId::new(),
            applicant_id,
            job_id,
            status: ApplicationStatus::Draft,
            created_at: now,
            submitted_at: None,
            rejection_reason: None,
            screening_answers: Vec::new(),
            audit_trail: Vec::new(),
            revision: 0,
        }
    }

    /// Apply a status change together with its timestamp and reason
    /// bookkeeping. `submitted_at` is stamped the first time the application
    /// reaches a submitted-or-later status and never cleared afterwards; the
    /// rejection reason only survives while the status is Rejected.
    pub fn apply_status(
        &mut self,
        status: ApplicationStatus,
        rejection_reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;

        let reached_submission = matches!(
            status,
            ApplicationStatus::Submitted | ApplicationStatus::Interview | ApplicationStatus::Offer
        );
        if reached_submission && self.submitted_at.is_none() {
            self.submitted_at = Some(now);
        }

        self.rejection_reason = if status == ApplicationStatus::Rejected {
            rejection_reason
        } else {
            None
        };
    }

    /// Replace the answer at the same question order, or insert it keeping
    /// the list ordered.
    pub fn upsert_screening_answer(&mut self, answer: ScreeningAnswer) {
        match self
            .screening_answers
            .iter_mut()
            .find(|existing| existing.order == answer.order)
        {
            Some(existing) => *existing = answer,
            None => {
                self.screening_answers.push(answer);
                self.screening_answers.sort_by_key(|entry| entry.order);
            }
        }
    }

    pub fn has_failed_screening(&self) -> bool {
        self.screening_answers
            .iter()
            .any(|answer| answer.meets_requirement == Some(false))
    }
}

/// Candidate profile as the engine and CV worker see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub id: ApplicantId,
    pub full_name: String,
    pub email: String,
    pub cv: Option<CvRecord>,
}

/// Uploaded CV metadata. `parsed_summary` stays empty until the background
/// pipeline has scanned and parsed the bytes behind the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvRecord {
    pub storage_token: StorageToken,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub parsed_summary: Option<String>,
}

/// Read-only posting snapshot provided by the job-board side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub active: bool,
    pub closing_date: Option<DateTime<Utc>>,
    pub screening_questions: Vec<String>,
}

impl JobPosting {
    pub fn question_count(&self) -> usize {
        self.screening_questions.len()
    }
}
