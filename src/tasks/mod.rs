//! Background Tasks Module
//!
//! # Tasks
//! - Url sweep: removes expired signed URLs at a fixed interval

mod cleanup;

pub use cleanup::CleanupTask;
