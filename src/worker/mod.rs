//! Worker lifecycle: timed periodic work with cooperative shutdown

pub mod handle;
pub mod pool;
pub mod stop_signal;
pub mod work_unit;

pub use handle::{Worker, WorkerState, DEFAULT_INTERVAL};
pub use pool::{default_worker_name, WorkerPool, WorkerPoolBuilder};
pub use stop_signal::StopSignal;
pub use work_unit::{TracedWork, WorkUnit};
