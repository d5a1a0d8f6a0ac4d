//! Background processing: jobs, the assembly pipeline, and the pool.

pub mod job;
pub mod pipeline;
pub mod pool;

pub use job::{parse_order_data, Job, JobResult};
pub use pipeline::Pipeline;
pub use pool::WorkerPool;
