//! Shared storage coordination.
//!
//! Many short-lived workers point at one storage root. Models and plugin
//! repositories are used in place from that root. The database is copied
//! into each worker's ephemeral root when the job starts and back out when
//! it ends. Every mutation of the shared root runs inside the root's
//! [`StaleLock`](crate::locks::StaleLock); a worker whose storage root is
//! its own ephemeral root skips locking altogether.

mod coordinator;
mod database;
mod layout;
mod models;
mod nodes;


pub use coordinator::StorageCoordinator;
pub use layout::{DATABASE_FILE_NAME, StorageLayout};
pub use nodes::repo_dir_name;
