use chrono::Utc;
use crossbeam::channel::{Receiver, Sender};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use crate::context::{ServiceConfig, ServiceContext, ServiceKind};
use crate::control::{Frame, Signal};
use crate::error::ScheduleError;
use crate::logger::ProcessLogger;
use crate::process::{ProcessConfig, ProcessRegistry};
use crate::supervisor::{Supervisor, SupervisorOptions};
use crate::task::TaskBuilder;
use crate::{init_tracing, Command};

/// Runs one service: loads its processes and applies the commands it receives.
pub struct Manager<B: TaskBuilder> {
    supervisor: Supervisor<B>,
    threads: usize,
}

impl<B: TaskBuilder> Manager<B> {

    /// Initializes tracing, the service context and the supervisor from `config`.
    pub fn new(kind: ServiceKind, config: ServiceConfig, builder: B, logger: Arc<dyn ProcessLogger>, registry: Arc<dyn ProcessRegistry>) -> Self {
        init_tracing(config.tracing_level());
        let context: ServiceContext = ServiceContext::new(kind, &config, logger, registry);
        Self {
            supervisor: Supervisor::new(context, builder, SupervisorOptions::from(&config)),
            threads: config.threads,
        }
    }

    pub fn supervisor(&self) -> &Supervisor<B> {
        &self.supervisor
    }

    /// Starts the service and schedules every process of the registry, returns how many got scheduled.
    pub fn start(&self) -> Result<usize, ScheduleError> {
        let workers: usize = self.supervisor.start(self.threads)?;
        let processes: Vec<ProcessConfig> = self.supervisor.context().registry.processes();
        let scheduled: usize = self.supervisor.add_processes(&processes);
        info!("{} service running with {} worker(s), {} of {} process(es) scheduled",self.supervisor.context().kind,workers,scheduled,processes.len());
        Ok(scheduled)
    }

    /// Applies `command`, returns false once the service was asked to shut down.
    pub fn apply(&self, command: Command) -> bool {
        let registry: &Arc<dyn ProcessRegistry> = &self.supervisor.context().registry;
        match command {
            Command::StartProcess { process_id, execution_date } => {
                self.supervisor.add_to_queue(process_id, execution_date.unwrap_or(Utc::now()));
            }
            Command::AddProcess(process) => {
                registry.upsert(process.clone());
                if let Err(err) = self.supervisor.update_process_schedule(&process) {
                    warn!("process {} registered but not scheduled: {}",process.label(),err);
                }
            }
            Command::RemoveProcess(process_id) => {
                self.supervisor.remove_process_from_schedule(process_id);
                registry.remove(process_id);
            }
            Command::UpdateNumberOfThreads(threads) => {
                match self.supervisor.update_number_of_threads(threads) {
                    Ok(workers) => info!("{} service resized to {} worker(s)",self.supervisor.context().kind,workers),
                    Err(err) => warn!("unable to resize the worker pool: {}",err)
                }
            }
            Command::Shutdown => return false
        }
        true
    }

    /// Applies a control frame, answering status requests with a status frame.
    pub fn handle_frame(&self, frame: Frame) -> Result<Option<Frame>, ScheduleError> {
        if frame.signal == Signal::Status {
            let status: Value = serde_json::to_value(self.supervisor.status())
                .map_err(|err| ScheduleError::Control(err.to_string()))?;
            return Ok(Some(Frame::new(Signal::Status, status)));
        }
        for command in frame.into_commands()? {
            if !self.apply(command) {
                self.supervisor.stop();
                break;
            }
        }
        Ok(None)
    }

    /// Applies the commands received on `rx` until a shutdown is requested or every sender is gone,
    /// then stops the service.
    #[instrument(skip_all)]
    pub fn watch(&self, rx: Receiver<Command>) {
        loop {
            match rx.recv() {
                Ok(command) => {
                    if !self.apply(command) {
                        info!("shutdown requested");
                        break;
                    }
                }
                Err(_) => {
                    warn!("command channel closed");
                    break;
                }
            }
        }
        self.supervisor.stop();
    }

    pub fn send_command(&self, command: Command, tx: &Sender<Command>) -> Result<(), String> {
        tx.send(command).map_err(|err| {
            error!("unable to send command: {}",err);
            err.to_string()
        })
    }
}
