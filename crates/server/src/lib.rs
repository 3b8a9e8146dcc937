//! HTTP front end for pipestream.

pub mod api;
pub mod metrics;
pub mod state;
