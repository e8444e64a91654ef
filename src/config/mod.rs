//! Configuration for invoke-storage.
//!
//! Two documents live here:
//! - [`Settings`]: operator settings (lock timings, backend tuning), read
//!   from an optional YAML file. Unknown fields are ignored for forward
//!   compatibility and every field has a default.
//! - [`BackendConfig`]: the generation backend's `invokeai.yaml`, projected
//!   from the storage layout and rewritten wholesale on every sync.

mod backend;
mod settings;


pub use backend::{BACKEND_CONFIG_FILE_NAME, BackendConfig};
pub use settings::{DEFAULT_SCHEMA_VERSION, SETTINGS_ENV_VAR, Settings};
