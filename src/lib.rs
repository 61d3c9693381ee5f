// src/lib.rs

//! Scan job orchestration: accepts scan requests for a domain or IPv4 target,
//! runs the external security tools selected by the scan category and keeps
//! a pollable job record of the outcome.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod logging;
