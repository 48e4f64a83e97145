//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the pipeline
//! orchestrator: jobs, store keys, timing policies, run outcomes, the
//! `SharedStore` and `Worker` traits and the pipeline configuration model.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Exchange model
//! - The orchestrator writes the job input to the shared store
//! - The worker writes its artifacts, then a completion marker
//! - Artifacts are only read once the marker has been observed

mod error;
mod job;
mod key;
mod outcome;
mod pipeline;
mod policy;
mod store;
mod worker;

pub use error::*;
pub use job::*;
pub use key::{JobNamespace, StoreKey};
pub use outcome::*;
pub use pipeline::*;
pub use policy::*;
pub use store::{LocalSharedStore, SharedStore};
pub use worker::*;
