//! Fleet orchestration: agent launching, the worker pool, and the poll loop.

pub mod liveness;
pub mod poller;
pub mod task;
pub mod worker_pool;

pub use poller::{CycleReport, Poller};
pub use task::{ShellTask, TaskRunner};
pub use worker_pool::WorkerPool;
