//! Frames of the inter-process control channel.
//!
//! A frame is a big-endian `u32` length, followed by a big-endian `u32` signal code
//! and a UTF-8 JSON payload. The length counts the signal code and the payload and
//! may not exceed [`MAX_FRAME_SIZE`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::ScheduleError;
use crate::process::ProcessConfig;
use crate::{Command, ProcessId};

const HEADER_SIZE: usize = 4;
const SIGNAL_SIZE: usize = 4;
/// Largest accepted frame, length header excluded.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Terminate,
    Status,
    AddData,
    StartProcess,
    RemoveData,
    UpdateService,
}

impl Signal {
    pub fn code(&self) -> u32 {
        match self {
            Self::Terminate => 0,
            Self::Status => 1,
            Self::AddData => 2,
            Self::StartProcess => 3,
            Self::RemoveData => 5,
            Self::UpdateService => 7,
        }
    }
}

impl TryFrom<u32> for Signal {
    type Error = ScheduleError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Terminate),
            1 => Ok(Self::Status),
            2 => Ok(Self::AddData),
            3 => Ok(Self::StartProcess),
            5 => Ok(Self::RemoveData),
            7 => Ok(Self::UpdateService),
            _ => Err(ScheduleError::Control(format!("unknown signal code {}",code)))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StartProcessPayload {
    process_id: ProcessId,
    #[serde(default)]
    execution_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UpdateServicePayload {
    threads: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub signal: Signal,
    pub payload: Value,
}

impl Frame {

    pub fn new(signal: Signal, payload: Value) -> Self {
        Self { signal, payload }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ScheduleError> {
        let payload: Vec<u8> = if self.payload.is_null() {
            Vec::new()
        }
        else {
            serde_json::to_vec(&self.payload).map_err(|err| ScheduleError::Control(err.to_string()))?
        };
        if SIGNAL_SIZE + payload.len() > MAX_FRAME_SIZE {
            return Err(ScheduleError::Control(format!("payload of {} bytes exceeds the {} bytes frame limit",payload.len(),MAX_FRAME_SIZE)));
        }
        let size: u32 = u32::try_from(SIGNAL_SIZE + payload.len())
            .map_err(|_| ScheduleError::Control(format!("payload of {} bytes is too large",payload.len())))?;
        let mut bytes: Vec<u8> = Vec::with_capacity(HEADER_SIZE + size as usize);
        bytes.extend_from_slice(&size.to_be_bytes());
        bytes.extend_from_slice(&self.signal.code().to_be_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decodes the first frame of `buffer`.
    ///
    /// Returns `Ok(None)` while the frame is incomplete, otherwise the frame and the
    /// number of bytes it used.
    pub fn decode(buffer: &[u8]) -> Result<Option<(Self, usize)>, ScheduleError> {
        if buffer.len() < HEADER_SIZE {
            return Ok(None);
        }
        let size: usize = read_u32(&buffer[..HEADER_SIZE]) as usize;
        if size < SIGNAL_SIZE {
            return Err(ScheduleError::Control(format!("frame size {} is smaller than the signal code",size)));
        }
        if size > MAX_FRAME_SIZE {
            return Err(ScheduleError::Control(format!("frame size {} exceeds the {} bytes limit",size,MAX_FRAME_SIZE)));
        }
        let total: usize = HEADER_SIZE + size;
        if buffer.len() < total {
            return Ok(None);
        }
        let signal: Signal = Signal::try_from(read_u32(&buffer[HEADER_SIZE..HEADER_SIZE + SIGNAL_SIZE]))?;
        let body: &[u8] = &buffer[HEADER_SIZE + SIGNAL_SIZE..total];
        let payload: Value = if body.is_empty() {
            Value::Null
        }
        else {
            serde_json::from_slice(body).map_err(|err| ScheduleError::Control(format!("invalid {:?} payload: {}",signal,err)))?
        };
        Ok(Some((Self { signal, payload }, total)))
    }

    pub fn start_process(process_id: ProcessId, execution_date: Option<DateTime<Utc>>) -> Result<Self, ScheduleError> {
        let payload: Value = serde_json::to_value(StartProcessPayload { process_id, execution_date })
            .map_err(|err| ScheduleError::Control(err.to_string()))?;
        Ok(Self::new(Signal::StartProcess, payload))
    }

    /// Commands carried by the frame. Status requests carry none.
    pub fn into_commands(self) -> Result<Vec<Command>, ScheduleError> {
        let signal: Signal = self.signal;
        let invalid = |err: serde_json::Error| ScheduleError::Control(format!("invalid {:?} payload: {}",signal,err));
        match signal {
            Signal::Terminate => Ok(vec![Command::Shutdown]),
            Signal::Status => Ok(Vec::new()),
            Signal::AddData => {
                let processes: Vec<ProcessConfig> = serde_json::from_value(self.payload).map_err(invalid)?;
                Ok(processes.into_iter().map(Command::AddProcess).collect())
            }
            Signal::StartProcess => {
                let payload: StartProcessPayload = serde_json::from_value(self.payload).map_err(invalid)?;
                Ok(vec![Command::StartProcess {
                    process_id: payload.process_id,
                    execution_date: payload.execution_date,
                }])
            }
            Signal::RemoveData => {
                let ids: Vec<ProcessId> = serde_json::from_value(self.payload).map_err(invalid)?;
                Ok(ids.into_iter().map(Command::RemoveProcess).collect())
            }
            Signal::UpdateService => {
                let payload: UpdateServicePayload = serde_json::from_value(self.payload).map_err(invalid)?;
                Ok(vec![Command::UpdateNumberOfThreads(payload.threads)])
            }
        }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut value: [u8; 4] = [0; 4];
    value.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(value)
}
