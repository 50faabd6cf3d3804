use crate::error::ScheduleError;
use crate::schedule::Schedule;
use crate::ProcessId;
use chrono::{DateTime, Utc};
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Callback invoked every time a timer fires, with the process id and the fire instant.
pub type DueCallback = Arc<dyn Fn(ProcessId, DateTime<Utc>) + Send + Sync>;

/// Self re-arming wake source of one scheduled process.
///
/// Every interval is computed from the instant the timer actually fired, so a slow
/// wake never accumulates drift. Cancelling is terminal.
pub struct Timer {
    process_id: ProcessId,
    next_execution: Arc<Mutex<DateTime<Utc>>>,
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("process_id", &self.process_id)
            .field("next_execution", &self.next_execution())
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Timer {

    /// Computes the first due instant and arms the timer.
    ///
    /// # Parameters
    ///
    /// - `schedule`: the schedule of the process. Configuration errors are returned before anything is armed.
    /// - `process_id`: the id passed to `on_due`.
    /// - `last_execution`: (Optional) the last known execution of the process. When `None` a frequency schedule fires immediately.
    /// - `on_due`: called on the timer thread every time the process becomes due.
    pub fn new(schedule: Schedule, process_id: ProcessId, last_execution: Option<DateTime<Utc>>, on_due: DueCallback) -> Result<Self, ScheduleError> {
        let first: DateTime<Utc> = schedule.next_execution(last_execution)?;
        let next_execution: Arc<Mutex<DateTime<Utc>>> = Arc::new(Mutex::new(first));
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let shared_next = next_execution.clone();
        let handle = thread::Builder::new()
            .name(format!("timer-{}",process_id))
            .spawn(move || {
                let mut due: DateTime<Utc> = first;
                loop {
                    let delay: Duration = (due - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    match cancel_rx.recv_timeout(delay) {
                        Err(RecvTimeoutError::Timeout) => {
                            let fired_at: DateTime<Utc> = Utc::now();
                            debug!("process {} is due",process_id);
                            on_due(process_id, fired_at);
                            match schedule.next_execution(Some(fired_at)) {
                                Ok(next) => {
                                    due = next;
                                    if let Ok(mut value) = shared_next.lock() {
                                        *value = next;
                                    }
                                }
                                Err(err) => {
                                    error!("timer of process {} stopped: {}",process_id,err);
                                    break;
                                }
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break
                    }
                }
                debug!("timer of process {} disarmed",process_id);
            })
            .map_err(|err| ScheduleError::Service(format!("unable to spawn timer thread for process {}: {}",process_id,err)))?;
        Ok(Self {
            process_id,
            next_execution,
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Instant of the next wake, as computed after the last fire.
    pub fn next_execution(&self) -> Option<DateTime<Utc>> {
        self.next_execution.lock().ok().map(|value| *value)
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().map(|handle| !handle.is_finished()).unwrap_or(false)
    }

    /// Disarms the timer and waits for its thread, unless called from that thread.
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!("timer thread of process {} panicked",self.process_id);
            }
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
