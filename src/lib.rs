use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;

pub mod error;
pub mod schedule;
pub mod cron_schedule;
pub mod timer;
pub mod queue;
pub mod worker;
pub mod process;
pub mod logger;
pub mod context;
pub mod task;
pub mod supervisor;
pub mod status;
pub mod control;
pub mod manager;

#[cfg(test)]
mod tests;

/// Identifier of a process, unique within its service type.
pub type ProcessId = u32;

/// Handle returned by a process logger once an execution has been registered.
pub type RegisterId = u64;

/// Instructions accepted by a running [`manager::Manager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Queue an execution of the process, as if its timer had fired.
    StartProcess {
        process_id: ProcessId,
        execution_date: Option<DateTime<Utc>>
    },
    /// Register the process (or replace its configuration) and (re)schedule it.
    AddProcess(process::ProcessConfig),
    /// Unschedule the process and forget its configuration.
    RemoveProcess(ProcessId),
    UpdateNumberOfThreads(usize),
    Shutdown,
}

/// Installs the fmt subscriber used by the services.
///
/// Calling it more than once is harmless, only the first call installs a subscriber.
pub fn init_tracing(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_line_number(true)
        .try_init();
}
