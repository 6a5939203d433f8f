//! Outbound HTTP with bearer credentials and the refresh-and-retry interceptor.

pub mod api_client;
pub mod descriptor;
pub mod error;
mod refresh;

pub use api_client::ApiClient;
pub use descriptor::{ApiResponse, Attempt, RequestDescriptor};
pub use error::ClientError;
