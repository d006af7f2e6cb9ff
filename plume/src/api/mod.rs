mod client;
mod error;
mod gateway;

pub use client::HttpGateway;
pub use error::{ApiError, ApiResult};
pub use gateway::PostGateway;
