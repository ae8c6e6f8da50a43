//! Core types and utilities for the strato control-plane client.
//!
//! This crate provides the foundational types shared by the client crates:
//!
//! - **Host registry**: logical host tags resolved to base URLs
//! - **Job outcomes**: the common terminal/pending classification used by
//!   every poller, with one adapter per backend status vocabulary
//! - **Poll policies**: outer retry budgets and inner transport-retry policies
//!
//! # Example
//!
//! ```
//! use strato_core::{HostRegistry, HostTag, JobOutcome, PollPolicy};
//! use std::time::Duration;
//!
//! let hosts = HostRegistry::default();
//! let base = hosts.resolve(HostTag::Management).unwrap();
//! assert!(base.starts_with("https://"));
//!
//! // A completed generic job
//! let outcome = JobOutcome::from_tri_state(1, "");
//! assert!(outcome.is_terminal());
//!
//! let policy = PollPolicy::new(60, Duration::from_secs(10));
//! assert_eq!(policy.retries, 60);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod hosts;
pub mod outcome;

pub use error::{CoreError, Result};
pub use hosts::{HostRegistry, HostTag};
pub use outcome::{JobOutcome, OperationHandle, PollPolicy, TransportRetry};
