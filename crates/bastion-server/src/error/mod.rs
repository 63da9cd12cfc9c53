//! Error handling for the Bastion server.

pub mod response;
pub mod types;

pub use types::{ApiError, ApiResult, LookupError};
