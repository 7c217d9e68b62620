//! Request and Response models for the signed URL API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::FailureReport;
pub use responses::{
    HealthResponse, MessageResponse, RecoveryResponse, StatsResponse, UrlResponse,
};
