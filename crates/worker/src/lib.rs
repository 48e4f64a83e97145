//! # Worker
//!
//! External worker implementations.
//!
//! Responsibilities:
//! - Drive the container runtime CLI (`docker`)
//! - Start, stop and collect logs of compose projects and single containers
//! - Reach a shared store that lives inside a container (`docker exec`)
//! - Provide a simulated worker for tests and dry runs

pub mod compose;
pub mod container;
pub mod container_store;
pub mod docker;
pub mod mock;

pub use compose::{ComposeConfig, ComposeWorker};
pub use container::{ContainerConfig, ContainerWorker};
pub use container_store::ContainerStore;
pub use contracts::{Worker, WorkerContext, WorkerError};
pub use docker::{CommandOutput, DockerCli};
pub use mock::{MockWorker, MockWorkerConfig};
