//! Axum-based caching proxy for the swcache controller.
//!
//! The proxy stands where a service worker would: every request that is not
//! addressed to the `/__sw/*` control plane becomes a fetch event served by
//! the active cache generation.
//!
//! # Components
//!
//! - `handlers`: control-plane endpoints and the fetch-event fallback.
//! - `middleware`: request ids and per-request metrics.
//! - `routes`: the router tying everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthResponse, HealthStatus, MessageResponse};
pub use middleware::{SOURCE_HEADER, STRATEGY_HEADER};
pub use routes::{create_router, AppState};
