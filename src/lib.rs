//! Core lifecycle engine for the hireflow application-intake portal.
//!
//! The crate holds the pieces the portal's outer surfaces plug into: the
//! application status rules and the five candidate-facing lifecycle
//! operations, the concurrency-safe application store with audit retention,
//! and the background CV intake pipeline. Persistence, e-mail delivery, and
//! blob storage stay behind narrow traits so every workflow can run against
//! in-memory doubles.

pub mod config;
pub mod telemetry;
pub mod workflows;
