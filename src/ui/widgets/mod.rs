// src/ui/widgets/mod.rs

// Module declarations for the console widgets.

pub mod disclaimer_popup; // Legal notice shown at startup.
pub mod footer; // Key bindings for the current state.
pub mod input; // Target field and category selector.
pub mod log_view; // Tail of the log file.
pub mod results; // Per-scanner results of the current job.
pub mod summary; // Job status overview.
