//! Client for the external Manim execution service.
//!
//! The service renders scene code into a video either synchronously
//! (`POST /execute`, response carries the result) or asynchronously
//! (`POST /execute/async`, result arrives later on the callback URL).

pub mod api;
pub mod backend;

pub use api::{RenderApiError, RenderServiceApi};
pub use backend::{ExecuteRequest, RenderBackend, RenderResult, StartRequest};
