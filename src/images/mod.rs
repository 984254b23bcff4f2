//! Upload-and-classify pipeline.

pub mod services;
