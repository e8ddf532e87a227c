//! Girder - a concurrent issue ingestion and hierarchy engine.
//!
//! Girder fetches issues from a project-tracking API over a date range,
//! builds an in-memory hierarchical model (Epics → Stories/Tasks →
//! Subtasks), flags items whose parent link is missing or broken, and
//! serves the resulting snapshot to concurrent readers.
//!
//! # Architecture
//!
//! - [`model`] - canonical issue shape and record normalization
//! - [`fetch`] - bounded worker pool over a shared cursor queue
//! - [`hierarchy`] - parent/child resolution and unlinked classification
//! - [`snapshot`] - the immutable resolved view and its query types
//! - [`cache`] - atomic publication of the current snapshot
//! - [`refresh`] - the fetch → resolve → publish pipeline
//! - [`config`] - environment credentials and runtime parameters
//! - [`cli`] - clap command surface for the `girder` binary
//! - [`error`] - error and warning types

#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hierarchy;
pub mod model;
pub mod refresh;
pub mod snapshot;

pub use error::{Error, Result, RunWarning};
