use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::domain::{
    ApplicantId, ApplicationStatus, AuditEntry, JobApplication, JobId, JobPosting, ScreeningAnswer,
};
use super::repository::{ApplicationDirectory, DirectoryError, Notifier};
use super::retention::AuditRetentionPolicy;
use super::store::{ApplicationStore, StoreError};

/// Rejection reason recorded when a mandatory screening requirement fails.
pub const MANDATORY_REQUIREMENT_REJECTION: &str = "Did not meet mandatory requirement";

/// Candidate-facing lifecycle operations over one posting and one applicant.
/// Business refusals come back in-band as [`LifecycleOutcome::Refused`];
/// only infrastructure failures surface as [`EngineError`].
pub struct ApplicationEngine<D, N> {
    directory: Arc<D>,
    store: ApplicationStore<D>,
    notifier: Arc<N>,
}

/// Input for [`ApplicationEngine::submit_screening_answer`]. The requirement
/// verdict arrives pre-computed: the intake surface compares the answer
/// against the posting's expectations before calling in.
#[derive(Debug, Clone)]
pub struct ScreeningAnswerCommand {
    pub applicant: ApplicantId,
    pub job: JobId,
    pub question_index: usize,
    pub answer: String,
    pub meets_requirement: bool,
    pub save_as_draft: bool,
}

/// What a lifecycle operation decided.
#[derive(Debug, Clone)]
pub enum LifecycleOutcome {
    /// The operation ran to completion; idempotent no-ops and the
    /// auto-rejection outcome land here as well.
    Applied {
        application: JobApplication,
        question_passed: Option<bool>,
    },
    /// A business rule stopped the operation before any state changed.
    Refused { reason: RefusalReason },
}

impl LifecycleOutcome {
    fn applied(application: JobApplication) -> Self {
        LifecycleOutcome::Applied {
            application,
            question_passed: None,
        }
    }

    fn applied_with_verdict(application: JobApplication, passed: bool) -> Self {
        LifecycleOutcome::Applied {
            application,
            question_passed: Some(passed),
        }
    }

    fn refused(reason: RefusalReason) -> Self {
        LifecycleOutcome::Refused { reason }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, LifecycleOutcome::Applied { .. })
    }

    pub fn application(&self) -> Option<&JobApplication> {
        match self {
            LifecycleOutcome::Applied { application, .. } => Some(application),
            LifecycleOutcome::Refused { .. } => None,
        }
    }

    pub fn refusal(&self) -> Option<&RefusalReason> {
        match self {
            LifecycleOutcome::Applied { .. } => None,
            LifecycleOutcome::Refused { reason } => Some(reason),
        }
    }
}

/// Why an operation was refused. `summary` renders the candidate-facing
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefusalReason {
    JobNotFound,
    PositionClosed {
        closed_on: DateTime<Utc>,
    },
    PositionInactive,
    ApplicationNotFound,
    AlreadySubmitted,
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    ScreeningRequired {
        question_count: usize,
    },
    QuestionOutOfRange {
        index: usize,
        question_count: usize,
    },
    ScreeningIncomplete {
        answered: usize,
        required: usize,
    },
    RequirementsNotMet,
}

impl RefusalReason {
    pub fn summary(&self) -> String {
        match self {
            RefusalReason::JobNotFound => "job posting not found".to_string(),
            RefusalReason::PositionClosed { closed_on } => {
                format!("position closed on {}", closed_on.format("%B %d, %Y"))
            }
            RefusalReason::PositionInactive => "position is not accepting applications".to_string(),
            RefusalReason::ApplicationNotFound => {
                "no application on file for this position".to_string()
            }
            RefusalReason::AlreadySubmitted => {
                "application has already been submitted".to_string()
            }
            RefusalReason::IllegalTransition { from, to } => {
                format!(
                    "cannot move application from {} to {}",
                    from.label(),
                    to.label()
                )
            }
            RefusalReason::ScreeningRequired { question_count } => {
                format!(
                    "direct submission is unavailable: the posting has {question_count} screening questions"
                )
            }
            RefusalReason::QuestionOutOfRange {
                index,
                question_count,
            } => {
                format!(
                    "screening question {index} is out of range for a posting with {question_count} questions"
                )
            }
            RefusalReason::ScreeningIncomplete { answered, required } => {
                format!("screening incomplete: {answered} of {required} questions answered")
            }
            RefusalReason::RequirementsNotMet => {
                "a mandatory screening requirement was not met".to_string()
            }
        }
    }
}

enum PostingGate {
    Open(JobPosting),
    Refused(RefusalReason),
}

impl<D, N> ApplicationEngine<D, N>
where
    D: ApplicationDirectory + 'static,
    N: Notifier + 'static,
{
    pub fn new(directory: Arc<D>, notifier: Arc<N>, retention: AuditRetentionPolicy) -> Self {
        let store = ApplicationStore::new(Arc::clone(&directory), retention);
        Self {
            directory,
            store,
            notifier,
        }
    }

    /// Open a Draft application for the pair, or hand back the one already
    /// on file unchanged. A withdrawn application does not block starting
    /// over.
    pub async fn start_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<LifecycleOutcome, EngineError> {
        if let Some(existing) = self.directory.find_application(applicant, job).await? {
            if existing.status != ApplicationStatus::Withdrawn {
                debug!(application = %existing.id, "start is a no-op, application already on file");
                return Ok(LifecycleOutcome::applied(existing));
            }
        }

        let now = Utc::now();
        let posting = match self.posting_gate(job, now).await? {
            PostingGate::Open(posting) => posting,
            PostingGate::Refused(reason) => return Ok(LifecycleOutcome::refused(reason)),
        };

        let application = JobApplication::new(applicant, job, now);
        let stored = self.directory.insert_application(application).await?;
        info!(application = %stored.id, job = %posting.id, "draft application created");
        Ok(LifecycleOutcome::applied(stored))
    }

    /// One-step submission for postings without screening questions.
    pub async fn submit_direct(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<LifecycleOutcome, EngineError> {
        let now = Utc::now();
        let posting = match self.posting_gate(job, now).await? {
            PostingGate::Open(posting) => posting,
            PostingGate::Refused(reason) => return Ok(LifecycleOutcome::refused(reason)),
        };
        if posting.question_count() > 0 {
            return Ok(LifecycleOutcome::refused(RefusalReason::ScreeningRequired {
                question_count: posting.question_count(),
            }));
        }

        let mut application = self.resolve_application(applicant, job, now).await?;
        // Submitted -> Submitted is a legal self-transition, but
        // re-submitting is a user error rather than a retry.
        if application.status == ApplicationStatus::Submitted {
            return Ok(LifecycleOutcome::refused(RefusalReason::AlreadySubmitted));
        }
        if let Some(reason) = check_transition(&application, ApplicationStatus::Submitted) {
            return Ok(LifecycleOutcome::refused(reason));
        }

        let application_id = application.id;
        application.apply_status(ApplicationStatus::Submitted, None, now);
        application.audit_trail.push(AuditEntry::applicant(
            applicant,
            "Application submitted",
            Some(application_id),
        ));

        let stored = self.store.save(application).await?;
        info!(application = %stored.id, job = %posting.id, "application submitted directly");
        self.dispatch_notice(applicant, submission_notice(&posting));
        Ok(LifecycleOutcome::applied(stored))
    }

    /// Record one screening answer. A failing mandatory requirement rejects
    /// the application on the spot; a draft save parks it without a verdict.
    pub async fn submit_screening_answer(
        &self,
        command: ScreeningAnswerCommand,
    ) -> Result<LifecycleOutcome, EngineError> {
        let now = Utc::now();
        let posting = match self.posting_gate(command.job, now).await? {
            PostingGate::Open(posting) => posting,
            PostingGate::Refused(reason) => return Ok(LifecycleOutcome::refused(reason)),
        };
        if command.question_index >= posting.question_count() {
            return Ok(LifecycleOutcome::refused(RefusalReason::QuestionOutOfRange {
                index: command.question_index,
                question_count: posting.question_count(),
            }));
        }

        let mut application = self
            .resolve_application(command.applicant, command.job, now)
            .await?;

        let target = if command.save_as_draft {
            ApplicationStatus::Draft
        } else if !command.meets_requirement {
            ApplicationStatus::Rejected
        } else {
            application.status
        };
        if let Some(reason) = check_transition(&application, target) {
            return Ok(LifecycleOutcome::refused(reason));
        }

        let application_id = application.id;
        application.upsert_screening_answer(ScreeningAnswer {
            order: command.question_index,
            question: posting.screening_questions[command.question_index].clone(),
            answer: command.answer,
            meets_requirement: Some(command.meets_requirement),
        });

        if command.save_as_draft {
            application.apply_status(ApplicationStatus::Draft, None, now);
            application.audit_trail.push(AuditEntry::applicant(
                command.applicant,
                format!(
                    "Screening answer for question {} saved as draft",
                    command.question_index
                ),
                Some(application_id),
            ));
            let stored = self.store.save(application).await?;
            return Ok(LifecycleOutcome::applied(stored));
        }

        if !command.meets_requirement {
            application.apply_status(
                ApplicationStatus::Rejected,
                Some(MANDATORY_REQUIREMENT_REJECTION.to_string()),
                now,
            );
            application.audit_trail.push(AuditEntry::system(
                "Application rejected: mandatory screening requirement not met",
                Some(application_id),
            ));
            let stored = self.store.save(application).await?;
            info!(application = %stored.id, question = command.question_index, "application auto-rejected by screening");
            self.dispatch_notice(command.applicant, rejection_notice(&posting));
            return Ok(LifecycleOutcome::applied_with_verdict(stored, false));
        }

        application.audit_trail.push(AuditEntry::applicant(
            command.applicant,
            format!(
                "Screening answer recorded for question {}",
                command.question_index
            ),
            Some(application_id),
        ));
        let stored = self.store.save(application).await?;
        Ok(LifecycleOutcome::applied_with_verdict(stored, true))
    }

    /// Final submission once every screening question has been answered and
    /// none failed.
    pub async fn submit_screened_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<LifecycleOutcome, EngineError> {
        let now = Utc::now();
        let posting = match self.posting_gate(job, now).await? {
            PostingGate::Open(posting) => posting,
            PostingGate::Refused(reason) => return Ok(LifecycleOutcome::refused(reason)),
        };

        let Some(mut application) = self.directory.find_application(applicant, job).await? else {
            return Ok(LifecycleOutcome::refused(RefusalReason::ApplicationNotFound));
        };
        if application.status == ApplicationStatus::Withdrawn {
            return Ok(LifecycleOutcome::refused(RefusalReason::ApplicationNotFound));
        }
        if application.status == ApplicationStatus::Submitted {
            return Ok(LifecycleOutcome::refused(RefusalReason::AlreadySubmitted));
        }

        let answered = application.screening_answers.len();
        let required = posting.question_count();
        if answered != required {
            return Ok(LifecycleOutcome::refused(RefusalReason::ScreeningIncomplete {
                answered,
                required,
            }));
        }
        if application.has_failed_screening() {
            return Ok(LifecycleOutcome::refused(RefusalReason::RequirementsNotMet));
        }
        if let Some(reason) = check_transition(&application, ApplicationStatus::Submitted) {
            return Ok(LifecycleOutcome::refused(reason));
        }

        let application_id = application.id;
        application.apply_status(ApplicationStatus::Submitted, None, now);
        application.audit_trail.push(AuditEntry::applicant(
            applicant,
            "Application submitted after screening",
            Some(application_id),
        ));

        let stored = self.store.save(application).await?;
        info!(application = %stored.id, job = %posting.id, "screened application submitted");
        self.dispatch_notice(applicant, submission_notice(&posting));
        Ok(LifecycleOutcome::applied(stored))
    }

    /// Withdraw the pair's application. Withdrawing twice is a no-op, and a
    /// closed posting does not stop a withdrawal.
    pub async fn withdraw_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
        reason: Option<String>,
    ) -> Result<LifecycleOutcome, EngineError> {
        let now = Utc::now();
        let Some(mut application) = self.directory.find_application(applicant, job).await? else {
            return Ok(LifecycleOutcome::refused(RefusalReason::ApplicationNotFound));
        };
        if application.status == ApplicationStatus::Withdrawn {
            debug!(application = %application.id, "withdraw is a no-op, application already withdrawn");
            return Ok(LifecycleOutcome::applied(application));
        }
        if let Some(refusal) = check_transition(&application, ApplicationStatus::Withdrawn) {
            return Ok(LifecycleOutcome::refused(refusal));
        }

        let application_id = application.id;
        application.apply_status(ApplicationStatus::Withdrawn, None, now);
        let action = match &reason {
            Some(text) => format!("Application withdrawn: {text}"),
            None => "Application withdrawn".to_string(),
        };
        application.audit_trail.push(AuditEntry::applicant(
            applicant,
            action,
            Some(application_id),
        ));

        let stored = self.store.save(application).await?;
        info!(application = %stored.id, "application withdrawn");

        let title = match self.directory.get_job_posting(job).await {
            Ok(Some(posting)) => Some(posting.title),
            Ok(None) => None,
            Err(err) => {
                debug!(%job, "posting lookup for withdrawal notice failed: {err}");
                None
            }
        };
        self.dispatch_notice(applicant, withdrawal_notice(title.as_deref()));
        Ok(LifecycleOutcome::applied(stored))
    }

    /// Check the posting exists and its availability window is open. The
    /// closing date wins over the active flag so candidates see the date.
    async fn posting_gate(
        &self,
        job: JobId,
        now: DateTime<Utc>,
    ) -> Result<PostingGate, EngineError> {
        let Some(posting) = self.directory.get_job_posting(job).await? else {
            return Ok(PostingGate::Refused(RefusalReason::JobNotFound));
        };
        if let Some(closing) = posting.closing_date {
            if now >= closing {
                return Ok(PostingGate::Refused(RefusalReason::PositionClosed {
                    closed_on: closing,
                }));
            }
        }
        if !posting.active {
            return Ok(PostingGate::Refused(RefusalReason::PositionInactive));
        }
        Ok(PostingGate::Open(posting))
    }

    /// Load the pair's active application, creating a fresh Draft when none
    /// exists or the previous one was withdrawn.
    async fn resolve_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
        now: DateTime<Utc>,
    ) -> Result<JobApplication, EngineError> {
        match self.directory.find_application(applicant, job).await? {
            Some(application) if application.status != ApplicationStatus::Withdrawn => {
                Ok(application)
            }
            _ => {
                let fresh = JobApplication::new(applicant, job, now);
                Ok(self.directory.insert_application(fresh).await?)
            }
        }
    }

    /// Fire-and-forget applicant notification: the outcome of the lifecycle
    /// operation never depends on the transport.
    fn dispatch_notice(&self, applicant: ApplicantId, notice: Notice) {
        let directory = Arc::clone(&self.directory);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let recipient = match directory.find_applicant(applicant).await {
                Ok(Some(profile)) => profile.email,
                Ok(None) => {
                    debug!(%applicant, "skipping notification, applicant profile missing");
                    return;
                }
                Err(err) => {
                    warn!(%applicant, "skipping notification, applicant lookup failed: {err}");
                    return;
                }
            };
            if let Err(err) = notifier.send(&recipient, &notice.subject, &notice.body).await {
                warn!(%applicant, "applicant notification failed: {err}");
            }
        });
    }
}

fn check_transition(
    application: &JobApplication,
    target: ApplicationStatus,
) -> Option<RefusalReason> {
    if application.status.can_transition_to(target) {
        None
    } else {
        Some(RefusalReason::IllegalTransition {
            from: application.status,
            to: target,
        })
    }
}

struct Notice {
    subject: String,
    body: String,
}

fn submission_notice(posting: &JobPosting) -> Notice {
    Notice {
        subject: "Application received".to_string(),
        body: format!(
            "Your application for {} has been submitted successfully.",
            posting.title
        ),
    }
}

fn rejection_notice(posting: &JobPosting) -> Notice {
    Notice {
        subject: "Update on your application".to_string(),
        body: format!(
            "Your application for {} was not successful: a mandatory requirement was not met.",
            posting.title
        ),
    }
}

fn withdrawal_notice(title: Option<&str>) -> Notice {
    let body = match title {
        Some(title) => format!("Your application for {title} has been withdrawn."),
        None => "Your application has been withdrawn.".to_string(),
    };
    Notice {
        subject: "Application withdrawn".to_string(),
        body,
    }
}

/// Error raised by the application engine for infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
