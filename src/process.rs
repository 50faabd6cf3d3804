use crate::schedule::Schedule;
use crate::ProcessId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Current configuration of a schedulable process (collector, analysis, view, alert or map).
///
/// # Fields
///
/// - `id`: Identifier of the process, unique within its service type.
/// - `name`: (Optional) Human readable name used in the logs.
/// - `service_instance_id`: The service instance responsible for running the process.
/// - `active`: Inactive processes are never scheduled nor queued. Default: true
/// - `handler`: Name of the handler registered in the task registry that runs the process.
/// - `schedule`: (Optional) When the process runs. Processes without schedule only run on demand.
/// - `parameters`: (Optional) Free form parameters passed to the handler.
pub struct ProcessConfig {
    pub id: ProcessId,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub name: Option<String>,
    pub service_instance_id: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub handler: String,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub parameters: Option<HashMap<String,Value>>,
}

fn default_active() -> bool {
    true
}

impl ProcessConfig {
    pub fn new(id: ProcessId, service_instance_id: u32, handler: &str) -> Self {
        Self {
            id,
            name: None,
            service_instance_id,
            active: true,
            handler: handler.to_string(),
            schedule: None,
            parameters: None,
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Name used in the log lines.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})",name,self.id),
            None => self.id.to_string()
        }
    }
}

/// Source of the current process configurations of a service.
pub trait ProcessRegistry: Send + Sync {
    fn find_process(&self, process_id: ProcessId) -> Option<ProcessConfig>;
    fn processes(&self) -> Vec<ProcessConfig>;
    /// Inserts or replaces the configuration, returning the previous one.
    fn upsert(&self, process: ProcessConfig) -> Option<ProcessConfig>;
    fn remove(&self, process_id: ProcessId) -> Option<ProcessConfig>;
}

#[derive(Debug, Default)]
pub struct InMemoryProcessRegistry {
    items: RwLock<HashMap<ProcessId, ProcessConfig>>
}

impl InMemoryProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processes(processes: Vec<ProcessConfig>) -> Self {
        let registry: Self = Self::new();
        for process in processes {
            registry.upsert(process);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ProcessId, ProcessConfig>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ProcessId, ProcessConfig>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessRegistry for InMemoryProcessRegistry {
    fn find_process(&self, process_id: ProcessId) -> Option<ProcessConfig> {
        self.read().get(&process_id).cloned()
    }

    fn processes(&self) -> Vec<ProcessConfig> {
        let mut items: Vec<ProcessConfig> = self.read().values().cloned().collect();
        items.sort_by_key(|item| item.id);
        items
    }

    fn upsert(&self, process: ProcessConfig) -> Option<ProcessConfig> {
        self.write().insert(process.id, process)
    }

    fn remove(&self, process_id: ProcessId) -> Option<ProcessConfig> {
        self.write().remove(&process_id)
    }
}
