//! The API-key subsystem: secret codec, lifecycle manager, daily rate
//! limiter, and usage recorder.

pub mod codec;
pub mod lifecycle;
pub mod rate_limit;
pub mod usage;

pub use lifecycle::{IssueError, IssueOptions, KeyService};
