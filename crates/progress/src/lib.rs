//! Progress Bus (C10): publish-subscribe of `ProgressEvent`s keyed by
//! job_id/user_id (spec.md §4.6).

mod bus;
mod cancel;
mod context;

pub use bus::{ProgressBus, Subscription};
pub use cancel::CancelToken;
pub use context::JobContext;
