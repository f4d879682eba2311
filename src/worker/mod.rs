//! The cache controller.
//!
//! # Components
//!
//! - `controller`: one generation: its settings, routing table and state.
//! - `lifecycle`: install (pre-cache the manifest) and activate (sweep stale
//!   generations, claim clients).
//! - `router`: ordered `(predicate, strategy)` classification table.
//! - `strategy`: the strategy executors and their fallbacks.
//! - `registration`: active/waiting generations and the cutover between them.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod controller;
mod lifecycle;
mod registration;
pub mod router;
mod strategy;

pub use controller::CacheController;
pub use lifecycle::{ActivationReport, WorkerState};
pub use registration::{RegisterOutcome, Registration};
pub use router::{HostPattern, Predicate, Router, Rule, Strategy};
pub use strategy::{Served, ServedFrom};
