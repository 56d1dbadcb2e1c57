//! No-as-a-Service: random rejection reasons over HTTP, throttled per client
//! with an in-memory fixed-window limiter.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod key_extractor;
pub mod middleware;
pub mod rate_limiter;
pub mod reasons;
pub mod registry;
pub mod response;
pub mod server;

pub use config::Config;
pub use error::{NaasError, Result};
pub use middleware::RequestGate;
pub use rate_limiter::{AdmitDecision, LimiterState, RateLimitPolicy};
pub use registry::LimiterRegistry;
pub use server::{create_app, Server};
