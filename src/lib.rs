//! Shellward - workspace-confined execution of commands found in LLM output
//!
//! This crate provides:
//! - Pattern detection of shell blocks, prompt lines, python blocks and
//!   directory/file creation verbs in free-form text
//! - A path guard that keeps every filesystem change inside one workspace root
//! - A process runner with a hard timeout and captured output
//! - A box-drawn snapshot of the workspace for diagnostics

pub mod cli;
pub mod concurrency;
pub mod config;
pub mod executor;
pub mod paths;

pub use config::Config;
pub use executor::CommandExecutor;
