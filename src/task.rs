use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::context::{ServiceContext, ServiceKind};
use crate::error::ScheduleError;
use crate::logger::ProcessLogger;
use crate::process::ProcessConfig;
use crate::queue::ExecutionPackage;
use crate::worker::Task;
use crate::RegisterId;

/// Domain work of a process: retrieving data, running an analysis, rendering a view...
pub trait TaskHandler: Send + Sync {
    fn run(&self, process: &ProcessConfig, package: &ExecutionPackage) -> Result<(), String>;
}

/// Builds the runnable task of one due execution.
///
/// This is the only part a concrete service supplies to the supervisor.
pub trait TaskBuilder: Send + Sync + 'static {
    fn prepare_task(&self, process: ProcessConfig, package: ExecutionPackage, context: &ServiceContext) -> Result<Task, ScheduleError>;
}

/// Handlers available to a service, by name.
#[derive(Default, Clone)]
pub struct TaskRegistry {
    items: HashMap<String, Arc<dyn TaskHandler>>
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.items.keys().collect();
        keys.sort();
        f.debug_struct("TaskRegistry").field("items", &keys).finish()
    }
}

impl TaskRegistry {

    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `key`, returns false when it replaced another handler.
    pub fn register(&mut self, key: &str, handler: Arc<dyn TaskHandler>) -> bool {
        self.items.insert(key.to_string(), handler).is_none()
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn TaskHandler>, ScheduleError> {
        match self.items.get(key) {
            Some(item) => Ok(item.clone()),
            None => Err(ScheduleError::UnknownHandler(key.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Task builder of the collector, analysis, view, alert and maps services.
///
/// Every task it builds runs the process handler through [`execute_logged`] with
/// its own logger handle.
#[derive(Debug, Clone)]
pub struct ServiceTaskBuilder {
    kind: ServiceKind,
    handlers: TaskRegistry,
}

impl ServiceTaskBuilder {

    pub fn new(kind: ServiceKind, handlers: TaskRegistry) -> Self {
        Self { kind, handlers }
    }

    pub fn collector(handlers: TaskRegistry) -> Self {
        Self::new(ServiceKind::Collector, handlers)
    }

    pub fn analysis(handlers: TaskRegistry) -> Self {
        Self::new(ServiceKind::Analysis, handlers)
    }

    pub fn view(handlers: TaskRegistry) -> Self {
        Self::new(ServiceKind::View, handlers)
    }

    pub fn alert(handlers: TaskRegistry) -> Self {
        Self::new(ServiceKind::Alert, handlers)
    }

    pub fn maps(handlers: TaskRegistry) -> Self {
        Self::new(ServiceKind::Maps, handlers)
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }
}

impl TaskBuilder for ServiceTaskBuilder {
    fn prepare_task(&self, process: ProcessConfig, package: ExecutionPackage, context: &ServiceContext) -> Result<Task, ScheduleError> {
        let handler: Arc<dyn TaskHandler> = self.handlers.get(process.handler.as_str())?;
        let logger: Arc<dyn ProcessLogger> = context.logger().clone_logger();
        let kind: ServiceKind = self.kind;
        Ok(Box::new(move || {
            execute_logged(kind, handler.as_ref(), &process, package, logger.as_ref());
        }))
    }
}

/// Runs `handler` for `package`, recording start, done or error in `logger`.
///
/// Errors and panics of the handler never leave this function, they are logged
/// and reported to the logger when the execution could be registered.
pub fn execute_logged(kind: ServiceKind, handler: &dyn TaskHandler, process: &ProcessConfig, mut package: ExecutionPackage, logger: &dyn ProcessLogger) {
    let label: String = process.label();
    let register_id: Option<RegisterId> = match logger.start(process.id) {
        Ok(register_id) => Some(register_id),
        Err(err) => {
            error!("{} process {} could not be registered: {}",kind,label,err);
            None
        }
    };
    package.register_id = register_id;
    info!("{} process {} started for {}",kind,label,package.execution_date);
    let outcome: Result<(), String> = match panic::catch_unwind(AssertUnwindSafe(|| handler.run(process, &package))) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload.as_ref()))
    };
    match outcome {
        Ok(()) => {
            info!("{} process {} finished",kind,label);
            if let Some(register_id) = register_id {
                let data_timestamp: DateTime<Utc> = package.execution_date;
                if let Err(err) = logger.done(data_timestamp, register_id) {
                    error!("{} process {} could not be logged as done: {}",kind,label,err);
                }
            }
        }
        Err(description) => {
            error!("{} process {} finished with error(s): {}",kind,label,description);
            match register_id {
                Some(register_id) => {
                    if let Err(err) = logger.error(description, register_id) {
                        error!("{} process {} could not be logged as failed: {}",kind,label,err);
                    }
                }
                None => warn!("{} process {} failure was not persisted",kind,label)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}",message)
    }
    else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}",message)
    }
    else {
        "panicked".to_string()
    }
}
