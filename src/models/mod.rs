//! Data models for intercepted fetches.
//!
//! This module contains the types that flow between the proxy, the cache
//! controller and the platform:
//! - Intercepted requests and their fetch mode (`request`)
//! - Immutable response snapshots stored in cache partitions (`response`)
//! - Messages accepted from the host page (`message`)

// Author: kelexine (https://github.com/kelexine)

pub mod message;
pub mod request;
pub mod response;

pub use message::WorkerMessage;
pub use request::{Request, RequestMode};
pub use response::ResponseSnapshot;
