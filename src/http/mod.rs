//! Venue HTTP plumbing - transport seam and retry policy

pub mod retry;
pub mod transport;

pub use retry::{RetryConfig, with_retry};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
