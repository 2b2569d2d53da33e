//! Core domain types and traits for the buildq build queue.
//!
//! This crate contains:
//! - Task names and the queue key
//! - Task records, build specs and the queue document
//! - Repository configuration (the registry entries tasks are built from)
//! - The `TaskStore` trait implemented by store adapters
//! - The `CommandRunner` trait used to spawn external tools

pub mod error;
pub mod executor;
pub mod id;
pub mod repository;
pub mod store;
pub mod task;

pub use error::{Error, Result};
pub use id::{QueueKey, TaskName};
