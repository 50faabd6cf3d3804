use core::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use crate::context::ConnectionInfo;
use crate::{ProcessId, RegisterId};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum LogStatus {
    Start,
    Done,
    Error,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f,"Start"),
            Self::Done => write!(f,"Done"),
            Self::Error => write!(f,"Error"),
        }
    }
}

/// Persistence contract recording the executions of the processes.
///
/// Implementations are shared across threads, but every running task asks for
/// its own handle through [`ProcessLogger::clone_logger`].
pub trait ProcessLogger: Send + Sync {
    /// Registers the start of an execution and returns its handle.
    fn start(&self, process_id: ProcessId) -> Result<RegisterId, String>;
    /// Marks the execution as finished, `timestamp` being the data time it produced.
    fn done(&self, timestamp: DateTime<Utc>, register_id: RegisterId) -> Result<(), String>;
    fn error(&self, description: String, register_id: RegisterId) -> Result<(), String>;
    /// Data time of the last successful execution of the process.
    fn last_process_timestamp(&self, process_id: ProcessId) -> Result<Option<DateTime<Utc>>, String>;
    fn set_connection_info(&self, info: ConnectionInfo);
    fn clone_logger(&self) -> Arc<dyn ProcessLogger>;
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogEntry {
    pub register_id: RegisterId,
    pub process_id: ProcessId,
    pub status: LogStatus,
    pub start_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub data_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub end_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default)]
struct LogStore {
    entries: Vec<LogEntry>,
    last_register_id: RegisterId,
    handles: usize,
}

/// Process logger keeping its entries in memory, shared by every cloned handle.
#[derive(Debug, Clone)]
pub struct InMemoryProcessLogger {
    store: Arc<Mutex<LogStore>>,
    connection: Arc<Mutex<Option<ConnectionInfo>>>,
}

impl Default for InMemoryProcessLogger {
    fn default() -> Self {
        Self {
            store: Arc::new(Mutex::new(LogStore {
                handles: 1,
                ..Default::default()
            })),
            connection: Arc::new(Mutex::new(None)),
        }
    }
}

impl InMemoryProcessLogger {

    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, LogStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, register_id: RegisterId, apply: impl FnOnce(&mut LogEntry)) -> Result<(), String> {
        let mut store = self.store();
        match store.entries.iter_mut().find(|entry| entry.register_id == register_id) {
            Some(entry) => {
                apply(entry);
                Ok(())
            }
            None => Err(format!("unable to find log entry with register id: {}",register_id))
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.store().entries.clone()
    }

    pub fn entries_of(&self, process_id: ProcessId) -> Vec<LogEntry> {
        self.store().entries.iter().filter(|entry| entry.process_id == process_id).cloned().collect()
    }

    /// Number of handles created so far, the original included.
    pub fn handles(&self) -> usize {
        self.store().handles
    }

    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection.lock().ok().and_then(|info| info.clone())
    }
}

impl ProcessLogger for InMemoryProcessLogger {
    fn start(&self, process_id: ProcessId) -> Result<RegisterId, String> {
        let mut store = self.store();
        store.last_register_id += 1;
        let register_id: RegisterId = store.last_register_id;
        store.entries.push(LogEntry {
            register_id,
            process_id,
            status: LogStatus::Start,
            start_timestamp: Utc::now(),
            data_timestamp: None,
            end_timestamp: None,
            message: None,
        });
        Ok(register_id)
    }

    fn done(&self, timestamp: DateTime<Utc>, register_id: RegisterId) -> Result<(), String> {
        self.update(register_id, |entry| {
            entry.status = LogStatus::Done;
            entry.data_timestamp = Some(timestamp);
            entry.end_timestamp = Some(Utc::now());
        })
    }

    fn error(&self, description: String, register_id: RegisterId) -> Result<(), String> {
        self.update(register_id, |entry| {
            entry.status = LogStatus::Error;
            entry.message = Some(description);
            entry.end_timestamp = Some(Utc::now());
        })
    }

    fn last_process_timestamp(&self, process_id: ProcessId) -> Result<Option<DateTime<Utc>>, String> {
        Ok(self.store().entries.iter()
            .filter(|entry| entry.process_id == process_id && entry.status == LogStatus::Done)
            .filter_map(|entry| entry.data_timestamp)
            .max())
    }

    fn set_connection_info(&self, info: ConnectionInfo) {
        if let Ok(mut connection) = self.connection.lock() {
            *connection = Some(info);
        }
    }

    fn clone_logger(&self) -> Arc<dyn ProcessLogger> {
        self.store().handles += 1;
        let connection: Option<ConnectionInfo> = self.connection_info();
        Arc::new(Self {
            store: self.store.clone(),
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}
