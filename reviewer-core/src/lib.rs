//! Reviewer Core - pull request reviewer assignment
//!
//! This crate holds the domain models, the reviewer selection policy,
//! the entity store abstraction and the workflow service that ties them
//! together. Storage backends and the HTTP surface live in sibling crates.

pub mod assignment;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod service;
pub mod store;

pub use assignment::AssignmentPolicy;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use events::{EventSink, TracingSink, WorkflowEvent, WorkflowMetrics};
pub use service::ReviewService;
pub use store::{EntityStore, MemoryStore};
