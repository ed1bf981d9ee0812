//! Client-side status reconciliation.
//!
//! [`StatusPoller`] repeatedly reads a job's status until it reaches a
//! terminal state. It is the fallback read path for clients that cannot
//! rely on being notified when a render finishes.

pub mod http;
pub mod poller;

pub use http::HttpStatusSource;
pub use poller::{PollError, StatusPoller, StatusSource, DEFAULT_POLL_INTERVAL};
