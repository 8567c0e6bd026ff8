//! Pod health status derivation for podstatus
//!
//! This crate turns a pod's container status tree into the one-line summary
//! shown in the pod table, following the conventions kubectl uses for its
//! STATUS column.

mod age;
mod engine;

pub use age::{age_since, short_human_duration};
pub use engine::StatusEngine;

// Re-export types used in our public API
pub use podstatus_types::{DisplaySummary, PodSnapshot};
