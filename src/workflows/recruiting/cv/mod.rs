//! Background CV intake: an in-memory job queue, layered safety scanning,
//! and a single parse worker that writes summaries back onto applicant
//! profiles.

pub mod queue;
pub mod scanner;
pub mod storage;
pub mod worker;

pub use queue::{CvIntakeQueue, CvParseJob};
pub use scanner::{ContentScanner, MagicByteScanner, PassthroughVirusScanner, VirusScanner};
pub use storage::{BlobError, CvBlobStore};
pub use worker::{CvParseWorker, CvWorkerConfig, CvWorkerError};
