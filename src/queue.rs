use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use crate::{ProcessId, RegisterId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One scheduled invocation of a process.
///
/// # Fields
///
/// - `process_id`: The process to run.
/// - `execution_date`: The instant this run is for. This is the logical data time, not the dispatch time.
/// - `register_id`: (Optional) The process logger handle of the run, assigned once the run started.
pub struct ExecutionPackage {
    pub process_id: ProcessId,
    pub execution_date: DateTime<Utc>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub register_id: Option<RegisterId>,
}

impl ExecutionPackage {
    pub fn new(process_id: ProcessId, execution_date: DateTime<Utc>) -> Self {
        Self {
            process_id,
            execution_date,
            register_id: None,
        }
    }
}

/// FIFO of pending executions. Duplicates of a process id are kept.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    items: VecDeque<ExecutionPackage>
}

impl ExecutionQueue {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, package: ExecutionPackage) {
        self.items.push_back(package);
    }

    pub fn pop(&mut self) -> Option<ExecutionPackage> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&ExecutionPackage> {
        self.items.front()
    }

    /// Removes every pending execution of `process_id`, returning how many were removed.
    pub fn remove(&mut self, process_id: ProcessId) -> usize {
        let before: usize = self.items.len();
        self.items.retain(|item| item.process_id != process_id);
        before - self.items.len()
    }

    pub fn contains(&self, process_id: ProcessId) -> bool {
        self.items.iter().any(|item| item.process_id == process_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every pending execution, returning how many were dropped.
    pub fn purge(&mut self) -> usize {
        let total: usize = self.items.len();
        self.items.clear();
        total
    }
}
