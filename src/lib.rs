//! Shared-storage coordination for short-lived InvokeAI workers.
//!
//! Workers mount one storage volume holding models, plugin repositories and
//! the canonical database. [`locks::StaleLock`] gives cross-process mutual
//! exclusion that survives crashed holders, and
//! [`storage::StorageCoordinator`] sequences installs and database syncs
//! under that lock.

pub mod cli;
pub mod commands;
pub mod config;
pub mod deps;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod locks;
pub mod registry;
pub mod request;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
