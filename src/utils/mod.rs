//! Utility functions and helpers for the swcache proxy.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and URL redaction for log output.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
