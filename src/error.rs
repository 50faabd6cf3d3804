use crate::ProcessId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("process {0} not found")]
    UnknownProcess(ProcessId),
    #[error("{0} not found in the task registry")]
    UnknownHandler(String),
    #[error("control channel: {0}")]
    Control(String),
    #[error("service: {0}")]
    Service(String),
}
