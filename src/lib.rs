// swcache - versioned multi-strategy offline cache controller
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod platform;
pub mod server;
pub mod utils;
pub mod worker;
