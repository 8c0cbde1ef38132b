//! Backend REST API - client and wire types

mod client;
mod error;
pub mod types;

pub use client::BackendClient;
pub use error::ApiError;
pub use types::{FileKind, SchedulerStatus};
