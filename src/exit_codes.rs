//! Exit code constants for the invoke-storage CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, malformed request or settings)
//! - 2: Model install failure
//! - 3: Repository clone failure
//! - 4: Lock acquisition failure
//! - 5: Dependency install failure
//! - 6: Filesystem failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, malformed input files, invalid node URIs.
pub const USER_ERROR: i32 = 1;

/// The model registry reported a list, install or wait failure.
pub const INSTALL_FAILURE: i32 = 2;

/// Cloning a plugin repository failed.
pub const CLONE_FAILURE: i32 = 3;

/// The shared storage lock could not be acquired in time.
pub const LOCK_FAILURE: i32 = 4;

/// Installing plugin dependencies into the worker environment failed.
pub const DEPENDENCY_FAILURE: i32 = 5;

/// An unexpected filesystem error (permissions, missing paths).
pub const FILESYSTEM_FAILURE: i32 = 6;
