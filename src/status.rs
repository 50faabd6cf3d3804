use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::context::ServiceKind;
use crate::ProcessId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub process_id: ProcessId,
    pub next_execution: Option<DateTime<Utc>>,
    pub armed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Snapshot of a running service, served by the status endpoints.
///
/// # Fields
///
/// - `instance_id`: The service instance.
/// - `kind`: The service type.
/// - `start_time`: When the service context was created.
/// - `running`: Whether the dispatcher is running.
/// - `timers`: The scheduled processes, ordered by process id.
/// - `queued`: Executions waiting for the dispatcher.
/// - `in_progress`: Executions dispatched and not finished yet.
/// - `pending_tasks`: Tasks waiting for a worker.
/// - `num_workers`: Workers of the pool.
/// - `timestamp`: When the snapshot was taken.
pub struct ServiceStatus {
    pub instance_id: u32,
    pub kind: ServiceKind,
    pub start_time: DateTime<Utc>,
    pub running: bool,
    pub timers: Vec<TimerStatus>,
    pub queued: usize,
    pub in_progress: usize,
    pub pending_tasks: usize,
    pub num_workers: usize,
    pub timestamp: DateTime<Utc>,
}

impl ServiceStatus {
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|err| err.to_string())
    }
}
