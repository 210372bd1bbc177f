//! Progress Reporter (C7): tracks in-flight upload operations and emits
//! throttled, transport-neutral progress events.
//!
//! Unlike a single-operation CLI progress display, this server tracks many
//! concurrent operations at once, so state lives in a [`DashMap`] keyed by
//! operation id rather than behind one shared mutex.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::types::UploadProgressCounters;

/// Bytes of progress that must accumulate for one file before another
/// notification is emitted for it, per the backpressure requirement.
const BYTES_PER_NOTIFICATION: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
	pub operation_id: Uuid,
	pub description: String,
	pub stage: String,
	pub counters: UploadProgressCounters,
	pub elapsed_ms: u128,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
	pub active: bool,
}

struct OperationState {
	description: String,
	stage: std::sync::Mutex<String>,
	started: Instant,
	counters: std::sync::Mutex<UploadProgressCounters>,
	errors: std::sync::Mutex<Vec<String>>,
	warnings: std::sync::Mutex<Vec<String>>,
	active: std::sync::atomic::AtomicBool,
	bytes_since_notify: AtomicU64,
}

/// Tracks every active upload operation's progress. One instance is shared
/// across the upload manager and any transport surfacing progress (RPC
/// notifications, polling reads).
#[derive(Default)]
pub struct ProgressReporter {
	operations: DashMap<Uuid, OperationState>,
}

impl ProgressReporter {
	pub fn new() -> Self {
		ProgressReporter { operations: DashMap::new() }
	}

	pub fn start(&self, operation_id: Uuid, description: impl Into<String>) {
		self.operations.insert(
			operation_id,
			OperationState {
				description: description.into(),
				stage: std::sync::Mutex::new("initiated".to_string()),
				started: Instant::now(),
				counters: std::sync::Mutex::new(UploadProgressCounters::default()),
				errors: std::sync::Mutex::new(Vec::new()),
				warnings: std::sync::Mutex::new(Vec::new()),
				active: std::sync::atomic::AtomicBool::new(true),
				bytes_since_notify: AtomicU64::new(0),
			},
		);
	}

	pub fn set_stage(&self, operation_id: Uuid, stage: impl Into<String>) {
		if let Some(state) = self.operations.get(&operation_id) {
			*state.stage.lock().unwrap() = stage.into();
		}
	}

	/// Updates counters for one operation, reporting whether this update
	/// should cross the byte-progress notification threshold for the
	/// current file. Callers decide whether to actually emit a
	/// transport-level event based on the return value.
	pub fn update(&self, operation_id: Uuid, counters: UploadProgressCounters, bytes_delta: u64) -> bool {
		let Some(state) = self.operations.get(&operation_id) else { return false };
		*state.counters.lock().unwrap() = counters;

		let accumulated = state.bytes_since_notify.fetch_add(bytes_delta, Ordering::Relaxed) + bytes_delta;
		if accumulated >= BYTES_PER_NOTIFICATION {
			state.bytes_since_notify.store(0, Ordering::Relaxed);
			true
		} else {
			false
		}
	}

	pub fn record_error(&self, operation_id: Uuid, message: impl Into<String>) {
		if let Some(state) = self.operations.get(&operation_id) {
			state.errors.lock().unwrap().push(message.into());
		}
	}

	pub fn record_warning(&self, operation_id: Uuid, message: impl Into<String>) {
		if let Some(state) = self.operations.get(&operation_id) {
			state.warnings.lock().unwrap().push(message.into());
		}
	}

	pub fn complete(&self, operation_id: Uuid) {
		if let Some(state) = self.operations.get(&operation_id) {
			state.active.store(false, Ordering::Relaxed);
		}
	}

	pub fn snapshot(&self, operation_id: Uuid) -> Option<ProgressSnapshot> {
		self.operations.get(&operation_id).map(|state| ProgressSnapshot {
			operation_id,
			description: state.description.clone(),
			stage: state.stage.lock().unwrap().clone(),
			counters: state.counters.lock().unwrap().clone(),
			elapsed_ms: state.started.elapsed().as_millis(),
			errors: state.errors.lock().unwrap().clone(),
			warnings: state.warnings.lock().unwrap().clone(),
			active: state.active.load(Ordering::Relaxed),
		})
	}

	pub fn active_operations(&self) -> Vec<Uuid> {
		self.operations.iter().filter(|entry| entry.active.load(Ordering::Relaxed)).map(|entry| *entry.key()).collect()
	}

	/// Drops tracking state for a finished operation once its final
	/// snapshot has been consumed by callers.
	pub fn forget(&self, operation_id: Uuid) {
		self.operations.remove(&operation_id);
	}
}
