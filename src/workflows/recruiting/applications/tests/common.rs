use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as Days, Utc};

use crate::workflows::recruiting::applications::domain::{
    ApplicantId, ApplicantProfile, ApplicationId, ApplicationStatus, AuditActor, AuditEntry,
    AuditEntryId, JobApplication, JobId, JobPosting,
};
use crate::workflows::recruiting::applications::repository::{
    ApplicationDirectory, DirectoryError, Notifier, NotifyError,
};
use crate::workflows::recruiting::applications::{ApplicationEngine, AuditRetentionPolicy};

pub(super) fn open_posting(questions: &[&str]) -> JobPosting {
    JobPosting {
        id: JobId::new(),
        title: "Senior Platform Engineer".to_string(),
        active: true,
        closing_date: Some(Utc::now() + Days::days(14)),
        screening_questions: questions.iter().map(|q| q.to_string()).collect(),
    }
}

pub(super) fn closed_posting() -> JobPosting {
    JobPosting {
        closing_date: Some(Utc::now() - Days::days(3)),
        ..open_posting(&[])
    }
}

pub(super) fn inactive_posting() -> JobPosting {
    JobPosting {
        active: false,
        closing_date: None,
        ..open_posting(&[])
    }
}

pub(super) fn applicant(name: &str) -> ApplicantProfile {
    ApplicantProfile {
        id: ApplicantId::new(),
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_ascii_lowercase().replace(' ', ".")),
        cv: None,
    }
}

pub(super) fn draft_application(applicant: ApplicantId, job: JobId) -> JobApplication {
    JobApplication::new(applicant, job, Utc::now())
}

pub(super) fn audit_entry_at(action: &str, recorded_at: DateTime<Utc>) -> AuditEntry {
    AuditEntry {
        id: AuditEntryId::new(),
        actor: AuditActor::System,
        action: action.to_string(),
        recorded_at,
        application: None,
    }
}

pub(super) fn build_engine() -> (
    ApplicationEngine<InMemoryDirectory, RecordingNotifier>,
    Arc<InMemoryDirectory>,
    Arc<RecordingNotifier>,
) {
    let directory = Arc::new(InMemoryDirectory::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = ApplicationEngine::new(
        directory.clone(),
        notifier.clone(),
        AuditRetentionPolicy::disabled(),
    );
    (engine, directory, notifier)
}

pub(super) fn engine_with<D, N>(directory: Arc<D>, notifier: Arc<N>) -> ApplicationEngine<D, N>
where
    D: ApplicationDirectory + 'static,
    N: Notifier + 'static,
{
    ApplicationEngine::new(directory, notifier, AuditRetentionPolicy::disabled())
}

/// Poll until the condition holds; notifications are dispatched on detached
/// tasks, so assertions on them need a little patience.
pub(super) async fn wait_for(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {description}");
}

#[derive(Default)]
pub(super) struct InMemoryDirectory {
    pub(super) applications: Mutex<HashMap<ApplicationId, JobApplication>>,
    pub(super) applicants: Mutex<HashMap<ApplicantId, ApplicantProfile>>,
    pub(super) postings: Mutex<HashMap<JobId, JobPosting>>,
    pub(super) global_feed: Mutex<Vec<AuditEntry>>,
}

impl InMemoryDirectory {
    pub(super) fn add_posting(&self, posting: JobPosting) {
        self.postings
            .lock()
            .expect("directory mutex poisoned")
            .insert(posting.id, posting);
    }

    pub(super) fn add_applicant(&self, profile: ApplicantProfile) {
        self.applicants
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.id, profile);
    }

    pub(super) fn stored_application(&self, id: ApplicationId) -> Option<JobApplication> {
        self.applications
            .lock()
            .expect("directory mutex poisoned")
            .get(&id)
            .cloned()
    }

    pub(super) fn application_count(&self) -> usize {
        self.applications
            .lock()
            .expect("directory mutex poisoned")
            .len()
    }

    pub(super) fn remove_application(&self, id: ApplicationId) {
        self.applications
            .lock()
            .expect("directory mutex poisoned")
            .remove(&id);
    }

    pub(super) fn global_feed(&self) -> Vec<AuditEntry> {
        self.global_feed
            .lock()
            .expect("directory mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl ApplicationDirectory for InMemoryDirectory {
    async fn find_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<Option<JobApplication>, DirectoryError> {
        let guard = self.applications.lock().expect("directory mutex poisoned");
        let mut matches: Vec<&JobApplication> = guard
            .values()
            .filter(|app| app.applicant_id == applicant && app.job_id == job)
            .collect();
        if let Some(active) = matches
            .iter()
            .find(|app| app.status != ApplicationStatus::Withdrawn)
        {
            return Ok(Some((*active).clone()));
        }
        matches.sort_by_key(|app| app.created_at);
        Ok(matches.last().map(|app| (*app).clone()))
    }

    async fn find_application_by_id(
        &self,
        id: ApplicationId,
    ) -> Result<Option<JobApplication>, DirectoryError> {
        Ok(self.stored_application(id))
    }

    async fn find_applications(
        &self,
        ids: &[ApplicationId],
    ) -> Result<Vec<JobApplication>, DirectoryError> {
        let guard = self.applications.lock().expect("directory mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn insert_application(
        &self,
        application: JobApplication,
    ) -> Result<JobApplication, DirectoryError> {
        let mut guard = self.applications.lock().expect("directory mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(DirectoryError::Conflict);
        }
        let mut stored = application;
        stored.revision = 1;
        guard.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn commit_application(
        &self,
        application: JobApplication,
    ) -> Result<JobApplication, DirectoryError> {
        let mut guard = self.applications.lock().expect("directory mutex poisoned");
        match guard.get(&application.id) {
            None => Err(DirectoryError::NotFound),
            Some(stored) if stored.revision != application.revision => {
                Err(DirectoryError::Conflict)
            }
            Some(_) => {
                let mut saved = application;
                saved.revision += 1;
                guard.insert(saved.id, saved.clone());
                Ok(saved)
            }
        }
    }

    async fn commit_applications(
        &self,
        applications: Vec<JobApplication>,
    ) -> Result<(), DirectoryError> {
        let mut guard = self.applications.lock().expect("directory mutex poisoned");
        for application in &applications {
            match guard.get(&application.id) {
                Some(stored) if stored.revision == application.revision => {}
                _ => return Err(DirectoryError::Conflict),
            }
        }
        for mut application in applications {
            application.revision += 1;
            guard.insert(application.id, application);
        }
        Ok(())
    }

    async fn find_applicant(
        &self,
        id: ApplicantId,
    ) -> Result<Option<ApplicantProfile>, DirectoryError> {
        let guard = self.applicants.lock().expect("directory mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    async fn save_applicant(&self, profile: ApplicantProfile) -> Result<(), DirectoryError> {
        let mut guard = self.applicants.lock().expect("directory mutex poisoned");
        guard.insert(profile.id, profile);
        Ok(())
    }

    async fn get_job_posting(&self, id: JobId) -> Result<Option<JobPosting>, DirectoryError> {
        let guard = self.postings.lock().expect("directory mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DirectoryError> {
        self.global_feed
            .lock()
            .expect("directory mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Wraps the in-memory directory and reports a conflict for a set number of
/// commits before letting them through.
pub(super) struct FlakyDirectory {
    pub(super) inner: InMemoryDirectory,
    conflicts: AtomicUsize,
}

impl FlakyDirectory {
    pub(super) fn failing(conflicts: usize) -> Self {
        Self {
            inner: InMemoryDirectory::default(),
            conflicts: AtomicUsize::new(conflicts),
        }
    }

    fn take_conflict(&self) -> bool {
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl ApplicationDirectory for FlakyDirectory {
    async fn find_application(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<Option<JobApplication>, DirectoryError> {
        self.inner.find_application(applicant, job).await
    }

    async fn find_application_by_id(
        &self,
        id: ApplicationId,
    ) -> Result<Option<JobApplication>, DirectoryError> {
        self.inner.find_application_by_id(id).await
    }

    async fn find_applications(
        &self,
        ids: &[ApplicationId],
    ) -> Result<Vec<JobApplication>, DirectoryError> {
        self.inner.find_applications(ids).await
    }

    async fn insert_application(
        &self,
        application: JobApplication,
    ) -> Result<JobApplication, DirectoryError> {
        self.inner.insert_application(application).await
    }

    async fn commit_application(
        &self,
        application: JobApplication,
    ) -> Result<JobApplication, DirectoryError> {
        if self.take_conflict() {
            return Err(DirectoryError::Conflict);
        }
        self.inner.commit_application(application).await
    }

    async fn commit_applications(
        &self,
        applications: Vec<JobApplication>,
    ) -> Result<(), DirectoryError> {
        if self.take_conflict() {
            return Err(DirectoryError::Conflict);
        }
        self.inner.commit_applications(applications).await
    }

    async fn find_applicant(
        &self,
        id: ApplicantId,
    ) -> Result<Option<ApplicantProfile>, DirectoryError> {
        self.inner.find_applicant(id).await
    }

    async fn save_applicant(&self, profile: ApplicantProfile) -> Result<(), DirectoryError> {
        self.inner.save_applicant(profile).await
    }

    async fn get_job_posting(&self, id: JobId) -> Result<Option<JobPosting>, DirectoryError> {
        self.inner.get_job_posting(id).await
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DirectoryError> {
        self.inner.append_audit(entry).await
    }
}

pub(super) struct UnavailableDirectory;

impl UnavailableDirectory {
    fn offline<T>() -> Result<T, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }
}

#[async_trait]
impl ApplicationDirectory for UnavailableDirectory {
    async fn find_application(
        &self,
        _applicant: ApplicantId,
        _job: JobId,
    ) -> Result<Option<JobApplication>, DirectoryError> {
        Self::offline()
    }

    async fn find_application_by_id(
        &self,
        _id: ApplicationId,
    ) -> Result<Option<JobApplication>, DirectoryError> {
        Self::offline()
    }

    async fn find_applications(
        &self,
        _ids: &[ApplicationId],
    ) -> Result<Vec<JobApplication>, DirectoryError> {
        Self::offline()
    }

    async fn insert_application(
        &self,
        _application: JobApplication,
    ) -> Result<JobApplication, DirectoryError> {
        Self::offline()
    }

    async fn commit_application(
        &self,
        _application: JobApplication,
    ) -> Result<JobApplication, DirectoryError> {
        Self::offline()
    }

    async fn commit_applications(
        &self,
        _applications: Vec<JobApplication>,
    ) -> Result<(), DirectoryError> {
        Self::offline()
    }

    async fn find_applicant(
        &self,
        _id: ApplicantId,
    ) -> Result<Option<ApplicantProfile>, DirectoryError> {
        Self::offline()
    }

    async fn save_applicant(&self, _profile: ApplicantProfile) -> Result<(), DirectoryError> {
        Self::offline()
    }

    async fn get_job_posting(&self, _id: JobId) -> Result<Option<JobPosting>, DirectoryError> {
        Self::offline()
    }

    async fn append_audit(&self, _entry: AuditEntry) -> Result<(), DirectoryError> {
        Self::offline()
    }
}

#[derive(Debug, Clone)]
pub(super) struct SentNotice {
    pub(super) recipient: String,
    pub(super) subject: String,
    pub(super) body: String,
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    messages: Mutex<Vec<SentNotice>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<SentNotice> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push(SentNotice {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

pub(super) struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}
