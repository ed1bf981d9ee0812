//! Render execution engine.
//!
//! Contains the dispatcher that moves a job into `RENDERING` and hands it to
//! the execution service, either waiting for the result or delegating the
//! outcome to the callback receiver.

pub mod dispatcher;
