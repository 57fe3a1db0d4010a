use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::workflows::recruiting::applications::domain::AuditEntry;
use crate::workflows::recruiting::applications::repository::{
    ApplicationDirectory, DirectoryError,
};

use super::queue::{CvIntakeQueue, CvParseJob};
use super::scanner::{ContentScanner, VirusScanner};
use super::storage::{BlobError, CvBlobStore};

/// Cadence settings for the parse worker.
#[derive(Debug, Clone, Copy)]
pub struct CvWorkerConfig {
    /// How long the worker sleeps when the queue is empty.
    pub poll_interval: Duration,
}

impl CvWorkerConfig {
    pub fn from_settings(settings: &crate::config::CvWorkerSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
        }
    }
}

impl Default for CvWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Single background consumer of the CV intake queue. Each job is scanned in
/// two stages, parsed, and written back onto the applicant profile unless the
/// upload was replaced in the meantime. One bad job never stops the loop.
pub struct CvParseWorker<D, V, C, B> {
    directory: Arc<D>,
    antivirus: Arc<V>,
    content: Arc<C>,
    blobs: Arc<B>,
    queue: Arc<CvIntakeQueue>,
    shutdown: Arc<Notify>,
    config: CvWorkerConfig,
}

impl<D, V, C, B> CvParseWorker<D, V, C, B>
where
    D: ApplicationDirectory + 'static,
    V: VirusScanner + 'static,
    C: ContentScanner + 'static,
    B: CvBlobStore + 'static,
{
    pub fn new(
        directory: Arc<D>,
        antivirus: Arc<V>,
        content: Arc<C>,
        blobs: Arc<B>,
        queue: Arc<CvIntakeQueue>,
        config: CvWorkerConfig,
    ) -> Self {
        Self {
            directory,
            antivirus,
            content,
            blobs,
            queue,
            shutdown: Arc::new(Notify::new()),
            config,
        }
    }

    /// Ask the loop to stop. Observed while the worker is idle and between
    /// jobs; a job already being processed finishes first.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run until shutdown. Processing failures are logged and the loop moves
    /// on to the next job.
    pub async fn run(&self) {
        info!("cv parse worker started");
        loop {
            let job = tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("cv parse worker stopping");
                    return;
                }
                job = self.next_job() => job,
            };

            if let Err(err) = self.process(&job).await {
                error!(
                    applicant = %job.applicant_id,
                    file = %job.file_name,
                    "cv processing failed: {err}"
                );
            }
        }
    }

    async fn next_job(&self) -> CvParseJob {
        loop {
            if let Some(job) = self.queue.try_dequeue() {
                return job;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn process(&self, job: &CvParseJob) -> Result<(), CvWorkerError> {
        let mut applicant = match self.directory.find_applicant(job.applicant_id).await? {
            Some(profile) => profile,
            None => {
                debug!(applicant = %job.applicant_id, "dropping cv job, applicant no longer exists");
                return Ok(());
            }
        };

        if !self.antivirus.is_clean(job).await {
            warn!(applicant = %job.applicant_id, file = %job.file_name, "cv failed av scan");
            self.directory
                .append_audit(AuditEntry::system("CV failed AV scan", None))
                .await?;
            return Ok(());
        }

        let bytes = self.blobs.open_read(&job.storage_token).await?;
        if !self.content.is_safe(&bytes) {
            warn!(applicant = %job.applicant_id, file = %job.file_name, "cv failed content scan");
            self.directory
                .append_audit(AuditEntry::system("CV failed background scan", None))
                .await?;
            return Ok(());
        }

        let summary = parse_summary(&job.file_name, &bytes);

        // The applicant may have replaced the upload while this job waited;
        // results only apply to the token they were produced from.
        match applicant.cv {
            Some(ref mut record) if record.storage_token == job.storage_token => {
                record.parsed_summary = Some(summary);
            }
            _ => {
                debug!(applicant = %job.applicant_id, "discarding stale cv parse result");
                return Ok(());
            }
        }

        self.directory.save_applicant(applicant).await?;
        info!(applicant = %job.applicant_id, file = %job.file_name, "cv parsed");
        Ok(())
    }
}

/// Stand-in for the real text extraction: a deterministic one-line summary
/// for the recruiter view.
fn parse_summary(file_name: &str, bytes: &[u8]) -> String {
    format!(
        "Automated intake summary for {file_name}: document cleared scanning ({} bytes).",
        bytes.len()
    )
}

/// Error raised while processing one CV job.
#[derive(Debug, thiserror::Error)]
pub enum CvWorkerError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Blob(#[from] BlobError),
}
