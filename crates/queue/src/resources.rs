//! Resource Manager (C8): tracks the global session/memory/cpu budget and
//! grants or denies per-job allocations (spec.md §4.8).

use std::collections::HashMap;

use automation_protocol::job::ResourceRequirement;
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceCapacity {
	pub sessions: u32,
	pub memory_mb: u32,
	pub cpu: f64,
}

impl Default for ResourceCapacity {
	/// `{sessions: 5, memory_mb: 4096, cpu: 4.0}` (spec.md §4.8).
	fn default() -> Self {
		Self { sessions: 5, memory_mb: 4096, cpu: 4.0 }
	}
}

#[derive(Debug, Default, Clone, Copy)]
struct InUse {
	sessions: u32,
	memory_mb: u32,
	cpu: f64,
}

/// All operations serialized by one mutex (spec.md §4.8, §5 "Shared-resource
/// policy"). Allocation is non-blocking: it either succeeds immediately or
/// returns `false`.
pub struct ResourceManager {
	capacity: ResourceCapacity,
	state: Mutex<(InUse, HashMap<Uuid, ResourceRequirement>)>,
}

impl ResourceManager {
	pub fn new(capacity: ResourceCapacity) -> Self {
		Self { capacity, state: Mutex::new((InUse::default(), HashMap::new())) }
	}

	pub fn can_allocate(&self, req: &ResourceRequirement) -> bool {
		let (in_use, _) = &*self.state.lock();
		self.fits(in_use, req)
	}

	fn fits(&self, in_use: &InUse, req: &ResourceRequirement) -> bool {
		in_use.sessions + req.sessions <= self.capacity.sessions
			&& in_use.memory_mb + req.memory_mb <= self.capacity.memory_mb
			&& in_use.cpu + req.cpu <= self.capacity.cpu
	}

	/// All-or-nothing allocation (spec.md §4.8). Re-allocating the same
	/// `job_id` without an intervening `deallocate` replaces its prior
	/// reservation rather than adding to it, so a caller can safely retry.
	pub fn allocate(&self, job_id: Uuid, req: ResourceRequirement) -> bool {
		let mut guard = self.state.lock();
		let (in_use, reservations) = &mut *guard;

		let mut probe = *in_use;
		if let Some(prior) = reservations.get(&job_id) {
			probe.sessions -= prior.sessions;
			probe.memory_mb -= prior.memory_mb;
			probe.cpu -= prior.cpu;
		}
		if !self.fits(&probe, &req) {
			return false;
		}

		if let Some(prior) = reservations.remove(&job_id) {
			in_use.sessions -= prior.sessions;
			in_use.memory_mb -= prior.memory_mb;
			in_use.cpu -= prior.cpu;
		}
		in_use.sessions += req.sessions;
		in_use.memory_mb += req.memory_mb;
		in_use.cpu += req.cpu;
		reservations.insert(job_id, req);
		true
	}

	pub fn deallocate(&self, job_id: Uuid) {
		let mut guard = self.state.lock();
		let (in_use, reservations) = &mut *guard;
		if let Some(req) = reservations.remove(&job_id) {
			in_use.sessions = in_use.sessions.saturating_sub(req.sessions);
			in_use.memory_mb = in_use.memory_mb.saturating_sub(req.memory_mb);
			in_use.cpu = (in_use.cpu - req.cpu).max(0.0);
		}
	}

	pub fn utilization(&self) -> ResourceCapacity {
		let (in_use, _) = &*self.state.lock();
		ResourceCapacity { sessions: in_use.sessions, memory_mb: in_use.memory_mb, cpu: in_use.cpu }
	}
}

impl Default for ResourceManager {
	fn default() -> Self {
		Self::new(ResourceCapacity::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn req(sessions: u32, memory_mb: u32, cpu: f64) -> ResourceRequirement {
		ResourceRequirement { sessions, memory_mb, cpu, max_duration_secs: 600 }
	}

	#[test]
	fn allocation_is_all_or_nothing() {
		let mgr = ResourceManager::new(ResourceCapacity { sessions: 1, memory_mb: 100, cpu: 1.0 });
		assert!(mgr.allocate(Uuid::new_v4(), req(1, 50, 0.5)));
		// a second job needing 1 more session should be denied entirely, not
		// partially granted.
		assert!(!mgr.allocate(Uuid::new_v4(), req(1, 10, 0.1)));
		let utilization = mgr.utilization();
		assert_eq!(utilization.sessions, 1);
	}

	#[test]
	fn deallocate_frees_capacity_for_the_next_job() {
		let mgr = ResourceManager::new(ResourceCapacity { sessions: 1, memory_mb: 100, cpu: 1.0 });
		let job_a = Uuid::new_v4();
		assert!(mgr.allocate(job_a, req(1, 100, 1.0)));
		assert!(!mgr.can_allocate(&req(1, 0, 0.0)));
		mgr.deallocate(job_a);
		assert!(mgr.can_allocate(&req(1, 100, 1.0)));
	}

	#[test]
	fn default_capacity_matches_documented_budget() {
		let capacity = ResourceCapacity::default();
		assert_eq!(capacity.sessions, 5);
		assert_eq!(capacity.memory_mb, 4096);
		assert_eq!(capacity.cpu, 4.0);
	}
}
