//! KDL configuration parsing for buildq.
//!
//! This crate handles parsing of:
//! - The repository registry (repos.kdl)
//! - Worker settings (buildq.kdl), with environment overrides

pub mod error;
pub mod registry;
pub mod settings;

mod kdl_util;

pub use error::{ConfigError, ConfigResult};
pub use registry::{Registry, load_registry, parse_registry};
pub use settings::{WorkerSettings, load_settings, parse_settings};
