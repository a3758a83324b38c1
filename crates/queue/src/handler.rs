//! The scheduler's only dependency on "what a job actually does" — kept as
//! a trait so `automation-queue` never depends on `automation-core`
//! directly (SPEC_FULL §9 Design Notes: shared interfaces injected at
//! construction rather than a cyclic reference). `automation-api` wires the
//! concrete implementation at startup.

use async_trait::async_trait;
use automation_progress::JobContext;
use automation_protocol::job::Job;
use serde_json::Value;

/// Executes one job to completion or failure. Implementations are expected
/// to poll `ctx.is_cancelled()` between natural suspension points (spec.md
/// §5: "workers poll a cancel flag at each natural boundary").
#[async_trait]
pub trait JobHandler: Send + Sync {
	async fn handle(&self, job: &Job, ctx: JobContext) -> Result<Value, String>;
}
