//! A paginated client for Atlassian-style issue search APIs.
//!
//! This library provides the remote-access layer for the girder engine:
//! page and cursor types, the [`PageSource`] trait that pagination
//! consumers are written against, and an HTTP implementation with
//! bounded-exponential-backoff retry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod page;
pub mod retry;
pub mod source;

pub use error::{Error, Result};
pub use page::{DateWindow, PageQuery, PageToken, RawPage};
pub use retry::RetryPolicy;
pub use source::{HttpPageSource, PageSource};
