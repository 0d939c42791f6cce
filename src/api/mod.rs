//! HTTP boundary (axum). Handlers translate requests into service calls and
//! map error kinds onto status codes; no domain rules live here.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use error::AppError;
pub use router::build_router;
