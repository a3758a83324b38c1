//! Resource Manager (C8) and priority Job Queue (C9): spec.md §4.8-§4.9.
//!
//! Deliberately has no dependency on `automation-core` — job execution is
//! injected via [`JobHandler`], implemented by `automation-api` at startup.

mod error;
mod handler;
mod queue;
mod resources;
mod scheduler;
mod snapshot;

pub use error::{QueueError, Result};
pub use handler::JobHandler;
pub use queue::{JobQueue, QueueCounts};
pub use resources::{ResourceCapacity, ResourceManager};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use snapshot::JobStore;
