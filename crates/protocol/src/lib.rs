//! Wire and domain types shared across the calibration automation engine.
//!
//! This crate has no behavior of its own — it is the vocabulary every other
//! crate speaks: work orders and dispensers (the scraped domain), jobs and
//! progress events (the automation pipeline), and the API error envelope
//! that everything eventually collapses into at the HTTP boundary.

pub mod dispenser;
pub mod error;
pub mod job;
pub mod progress;
pub mod recovery;
pub mod work_order;
pub mod ws;

pub use dispenser::{Dispenser, FuelGrade};
pub use error::{ApiError, ApiErrorKind};
pub use job::{DependencyMode, Job, JobKind, JobState, Priority, QueueKind, ResourceRequirement};
pub use progress::{Phase, ProgressEvent};
pub use recovery::{ErrorKind, RecoveryContext};
pub use work_order::{Address, ScrapingHistoryRecord, ServiceCode, WorkOrder, WorkOrderStatus};
pub use ws::WsFrame;
