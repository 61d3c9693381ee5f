// src/core/mod.rs

// The `core` module holds everything that does not depend on how the
// orchestrator is exposed (HTTP, terminal UI, CLI).

/// Data structures shared across the crate: job records, scan results,
/// categories and options.
pub mod models;

/// Typed error hierarchy, one enum per failure domain.
pub mod error;

/// Validation and DNS resolution of scan targets.
pub mod target;

/// Adapters around the external security tools.
pub mod scanner;

/// The category -> adapters matrix and the concurrent adapter runner.
pub mod dispatch;

/// Persistence of job records.
pub mod store;

/// Job admission, background execution and status reads.
pub mod orchestrator;
