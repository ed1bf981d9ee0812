//! Domain logic for the ManimFlow render-job lifecycle.
//!
//! Everything here is pure (no I/O): the job status machine, terminal
//! outcome invariants, the client-facing status view, callback URL
//! resolution, and presentation-only classification of render errors.

pub mod callback_url;
pub mod error;
pub mod hashing;
pub mod render_errors;
pub mod render_job;
pub mod status_view;
pub mod types;
