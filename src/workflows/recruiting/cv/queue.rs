use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::workflows::recruiting::applications::domain::{ApplicantId, StorageToken};

/// Unit of background CV work handed over by the profile-update surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvParseJob {
    pub storage_token: StorageToken,
    pub applicant_id: ApplicantId,
    pub file_name: String,
}

/// Unbounded in-memory FIFO between the profile handlers (any number of
/// producers) and the single parse worker. Jobs live only in this process:
/// whatever is still queued at shutdown is lost and the applicant re-uploads.
#[derive(Debug, Default)]
pub struct CvIntakeQueue {
    jobs: Mutex<VecDeque<CvParseJob>>,
}

impl CvIntakeQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Hand a job to the worker. Never blocks beyond the internal lock.
    pub fn enqueue(&self, job: CvParseJob) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push_back(job);
        }
    }

    /// Take the oldest queued job, if any. Never blocks beyond the internal
    /// lock.
    pub fn try_dequeue(&self) -> Option<CvParseJob> {
        self.jobs.lock().ok().and_then(|mut jobs| jobs.pop_front())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
