use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, instrument, warn};
use crate::context::{ServiceConfig, ServiceContext};
use crate::error::ScheduleError;
use crate::logger::ProcessLogger;
use crate::process::ProcessConfig;
use crate::queue::{ExecutionPackage, ExecutionQueue};
use crate::status::{ServiceStatus, TimerStatus};
use crate::task::TaskBuilder;
use crate::timer::{DueCallback, Timer};
use crate::worker::{Task, WorkerPool};
use crate::ProcessId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Queue an execution even when one of the same process is queued or running.
    pub allow_overlap: bool,
    /// Queue an immediate execution whenever a process gets scheduled.
    pub run_on_schedule: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            allow_overlap: true,
            run_on_schedule: true,
        }
    }
}

impl From<&ServiceConfig> for SupervisorOptions {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            allow_overlap: config.allow_overlap,
            run_on_schedule: config.run_on_schedule,
        }
    }
}

#[derive(Debug, Default)]
struct SupervisorState {
    queue: ExecutionQueue,
    timers: HashMap<ProcessId, Timer>,
    in_progress: HashMap<ProcessId, usize>,
    stop: bool,
}

struct Inner<B: TaskBuilder> {
    context: ServiceContext,
    builder: B,
    options: SupervisorOptions,
    state: Mutex<SupervisorState>,
    condvar: Condvar,
    pool: WorkerPool,
}

/// Marks the end of a dispatched execution, even when its task panicked.
struct InProgressGuard<B: TaskBuilder> {
    inner: Weak<Inner<B>>,
    process_id: ProcessId,
}

impl<B: TaskBuilder> Drop for InProgressGuard<B> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.finish(self.process_id);
        }
    }
}

impl<B: TaskBuilder> Inner<B> {

    fn lock(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn owns(&self, process: &ProcessConfig) -> bool {
        process.active && process.service_instance_id == self.context.instance_id
    }

    fn add_to_queue(&self, process_id: ProcessId, execution_date: DateTime<Utc>) -> bool {
        let process: ProcessConfig = match self.context.registry.find_process(process_id) {
            Some(process) => process,
            None => {
                debug!("{} service does not know process {}, execution ignored",self.context.kind,process_id);
                return false;
            }
        };
        if !self.owns(&process) {
            debug!("process {} is inactive or assigned to another instance, execution ignored",process.label());
            return false;
        }
        {
            let mut state = self.lock();
            if !self.options.allow_overlap
                && (state.queue.contains(process_id) || state.in_progress.contains_key(&process_id)) {
                info!("process {} is already queued or running, execution for {} skipped",process.label(),execution_date);
                return false;
            }
            state.queue.push(ExecutionPackage::new(process_id, execution_date));
        }
        self.condvar.notify_one();
        debug!("process {} queued for {}",process.label(),execution_date);
        true
    }

    fn finish(&self, process_id: ProcessId) {
        let mut state = self.lock();
        if let Some(count) = state.in_progress.get_mut(&process_id) {
            *count -= 1;
            if *count == 0 {
                state.in_progress.remove(&process_id);
            }
        }
    }

    fn prepare_task(self: &Arc<Self>, package: ExecutionPackage) -> Result<Task, ScheduleError> {
        let process_id: ProcessId = package.process_id;
        let guard: InProgressGuard<B> = InProgressGuard {
            inner: Arc::downgrade(self),
            process_id,
        };
        let process: ProcessConfig = self.context.registry.find_process(process_id)
            .ok_or(ScheduleError::UnknownProcess(process_id))?;
        if !self.owns(&process) {
            return Err(ScheduleError::Service(format!("process {} is inactive or assigned to another instance",process.label())));
        }
        let task: Task = self.builder.prepare_task(process, package, &self.context)?;
        Ok(Box::new(move || {
            let _guard = guard;
            task();
        }))
    }

    fn process_next_data(self: &Arc<Self>) -> bool {
        let (package, remaining) = {
            let mut state = self.lock();
            match state.queue.pop() {
                Some(package) => {
                    *state.in_progress.entry(package.process_id).or_insert(0) += 1;
                    (package, state.queue.len())
                }
                None => return false
            }
        };
        let process_id: ProcessId = package.process_id;
        match self.prepare_task(package) {
            Ok(task) => self.pool.push(task),
            Err(err) => warn!("{} service skipped an execution of process {}: {}",self.context.kind,process_id,err)
        }
        remaining > 0
    }

    fn due_callback(self: &Arc<Self>) -> DueCallback {
        let inner: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |process_id: ProcessId, fired_at: DateTime<Utc>| {
            if let Some(inner) = inner.upgrade() {
                inner.add_to_queue(process_id, fired_at);
            }
        })
    }

    fn add_process_to_schedule(self: &Arc<Self>, process: &ProcessConfig) -> Result<bool, ScheduleError> {
        if !self.owns(process) {
            debug!("process {} is inactive or assigned to another instance, not scheduled",process.label());
            return Ok(false);
        }
        if self.context.registry.find_process(process.id).is_none() {
            warn!("process {} is not in the {} registry, not scheduled",process.label(),self.context.kind);
            return Ok(false);
        }
        let schedule = match &process.schedule {
            Some(schedule) => schedule.clone(),
            None => {
                debug!("process {} has no schedule, it only runs on demand",process.label());
                return Ok(false);
            }
        };
        let now: DateTime<Utc> = Utc::now();
        let last_execution: Option<DateTime<Utc>> = if self.options.run_on_schedule {
            Some(now)
        }
        else {
            match self.context.logger().last_process_timestamp(process.id) {
                Ok(value) => value,
                Err(err) => {
                    warn!("unable to read the last execution of process {}: {}",process.label(),err);
                    None
                }
            }
        };
        let timer: Timer = match Timer::new(schedule, process.id, last_execution, self.due_callback()) {
            Ok(timer) => timer,
            Err(err) => {
                error!("process {} not scheduled: {}",process.label(),err);
                return Err(err);
            }
        };
        let next_execution: Option<DateTime<Utc>> = timer.next_execution();
        let previous: Option<Timer> = self.lock().timers.insert(process.id, timer);
        drop(previous);
        if self.options.run_on_schedule {
            self.add_to_queue(process.id, now);
        }
        info!("process {} scheduled, next execution at {:?}",process.label(),next_execution);
        Ok(true)
    }

    fn remove_process_from_schedule(&self, process_id: ProcessId) -> bool {
        let timer: Option<Timer> = self.lock().timers.remove(&process_id);
        let scheduled: bool = timer.is_some();
        // Joins the timer thread, a fire in progress has queued its execution once this returns.
        drop(timer);
        let removed: usize = self.lock().queue.remove(process_id);
        if scheduled || removed > 0 {
            info!("process {} unscheduled, {} pending execution(s) removed",process_id,removed);
        }
        scheduled
    }

    /// Raises the stop flag, cancels every timer and drops what was never dispatched.
    fn shutdown(&self) {
        let timers: HashMap<ProcessId, Timer> = {
            let mut state = self.lock();
            state.stop = true;
            std::mem::take(&mut state.timers)
        };
        self.condvar.notify_all();
        drop(timers);
        let discarded: usize = self.lock().queue.purge();
        if discarded > 0 {
            warn!("{} service stopping, {} queued execution(s) discarded",self.context.kind,discarded);
        }
    }
}

#[instrument(skip_all)]
fn watch<B: TaskBuilder>(inner: Arc<Inner<B>>) {
    info!("{} dispatcher started",inner.context.kind);
    loop {
        {
            let mut state = inner.lock();
            while state.queue.is_empty() && !state.stop {
                state = inner.condvar.wait(state).unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            if state.stop {
                break;
            }
        }
        inner.process_next_data();
    }
    info!("{} dispatcher stopped",inner.context.kind);
}

/// Scheduling engine shared by the collector, analysis, view, alert and maps services.
///
/// Owns the timers of the scheduled processes, the execution queue, the dispatcher
/// thread and the worker pool. A service only supplies its [`TaskBuilder`].
pub struct Supervisor<B: TaskBuilder> {
    inner: Arc<Inner<B>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<B: TaskBuilder> Supervisor<B> {

    pub fn new(context: ServiceContext, builder: B, options: SupervisorOptions) -> Self {
        let pool: WorkerPool = WorkerPool::new(format!("{}-{}",context.kind,context.instance_id).as_str());
        Self {
            inner: Arc::new(Inner {
                context,
                builder,
                options,
                state: Mutex::new(SupervisorState::default()),
                condvar: Condvar::new(),
                pool,
            }),
            dispatcher: Mutex::new(None),
        }
    }

    fn dispatcher(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.dispatcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn context(&self) -> &ServiceContext {
        &self.inner.context
    }

    /// Starts the worker pool and the dispatcher, returns the number of workers.
    ///
    /// # Parameters
    ///
    /// - `thread_count`: number of workers, `0` uses the hardware concurrency.
    pub fn start(&self, thread_count: usize) -> Result<usize, ScheduleError> {
        let mut dispatcher = self.dispatcher();
        if dispatcher.is_some() {
            return Err(ScheduleError::Service(format!("{} service is already running",self.inner.context.kind)));
        }
        self.inner.lock().stop = false;
        let workers: usize = self.inner.pool.start(thread_count);
        let inner: Arc<Inner<B>> = self.inner.clone();
        match thread::Builder::new()
            .name(format!("{}-dispatcher",self.inner.context.kind))
            .spawn(move || watch(inner)) {
            Ok(handle) => {
                *dispatcher = Some(handle);
                info!("{} service {} started",self.inner.context.kind,self.inner.context.instance_id);
                Ok(workers)
            }
            Err(err) => {
                self.inner.pool.stop();
                Err(ScheduleError::Service(format!("unable to spawn the dispatcher: {}",err)))
            }
        }
    }

    /// Stops the service.
    ///
    /// Timers are cancelled and queued executions dropped. Returns once the dispatcher and every
    /// worker have been joined, executions already running finish first.
    pub fn stop(&self) {
        self.inner.shutdown();
        if let Some(handle) = self.dispatcher().take() {
            if handle.join().is_err() {
                error!("{} dispatcher terminated abnormally",self.inner.context.kind);
            }
        }
        self.inner.pool.stop();
    }

    pub fn is_running(&self) -> bool {
        self.dispatcher().is_some()
    }

    /// Restarts the worker pool of the running service with `thread_count` workers.
    /// Tasks waiting for a worker are kept.
    pub fn update_number_of_threads(&self, thread_count: usize) -> Result<usize, ScheduleError> {
        let dispatcher = self.dispatcher();
        if dispatcher.is_none() {
            return Err(ScheduleError::Service(format!("{} service is not running",self.inner.context.kind)));
        }
        Ok(self.inner.pool.update_number_of_threads(thread_count))
    }

    pub fn set_logger(&self, logger: Arc<dyn ProcessLogger>) {
        self.inner.context.set_logger(logger);
    }

    /// Queues an execution of the process for `execution_date`.
    ///
    /// Unknown processes, processes of another instance and, when overlapping is not
    /// allowed, processes already queued or running are silently ignored.
    pub fn add_to_queue(&self, process_id: ProcessId, execution_date: DateTime<Utc>) -> bool {
        self.inner.add_to_queue(process_id, execution_date)
    }

    /// Drops every queued execution of the process, returning how many were dropped.
    pub fn remove_from_queue(&self, process_id: ProcessId) -> usize {
        self.inner.lock().queue.remove(process_id)
    }

    pub fn has_data_on_queue(&self) -> bool {
        !self.inner.lock().queue.is_empty()
    }

    /// Dispatches the oldest queued execution to the worker pool, returns whether more remain.
    pub fn process_next_data(&self) -> bool {
        self.inner.process_next_data()
    }

    /// Arms the timer of the process and, unless disabled, queues an immediate execution.
    ///
    /// Returns `Ok(false)` when the process is inactive, belongs to another instance or has no
    /// schedule. Schedule errors are logged and returned, nothing gets armed in that case.
    /// The process must be known by the registry of the context for its executions to be queued.
    pub fn add_process_to_schedule(&self, process: &ProcessConfig) -> Result<bool, ScheduleError> {
        self.inner.add_process_to_schedule(process)
    }

    /// Schedules every process, skipping the ones that cannot be scheduled.
    /// Returns how many got scheduled.
    pub fn add_processes(&self, processes: &[ProcessConfig]) -> usize {
        let mut scheduled: usize = 0;
        for process in processes {
            match self.add_process_to_schedule(process) {
                Ok(true) => scheduled += 1,
                Ok(false) => {}
                Err(err) => warn!("process {} skipped: {}",process.label(),err)
            }
        }
        scheduled
    }

    /// Cancels the timer of the process and drops its queued executions.
    pub fn remove_process_from_schedule(&self, process_id: ProcessId) -> bool {
        self.inner.remove_process_from_schedule(process_id)
    }

    pub fn update_process_schedule(&self, process: &ProcessConfig) -> Result<bool, ScheduleError> {
        self.inner.remove_process_from_schedule(process.id);
        self.inner.add_process_to_schedule(process)
    }

    /// Ids of the processes with a timer, ascending.
    pub fn scheduled_processes(&self) -> Vec<ProcessId> {
        let mut ids: Vec<ProcessId> = self.inner.lock().timers.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn status(&self) -> ServiceStatus {
        let (mut timers, queued, in_progress) = {
            let state = self.inner.lock();
            let timers: Vec<TimerStatus> = state.timers.values().map(|timer| TimerStatus {
                process_id: timer.process_id(),
                next_execution: timer.next_execution(),
                armed: timer.is_armed(),
            }).collect();
            (timers, state.queue.len(), state.in_progress.values().sum())
        };
        timers.sort_by_key(|timer| timer.process_id);
        ServiceStatus {
            instance_id: self.inner.context.instance_id,
            kind: self.inner.context.kind,
            start_time: self.inner.context.start_time,
            running: self.is_running(),
            timers,
            queued,
            in_progress,
            pending_tasks: self.inner.pool.pending(),
            num_workers: self.inner.pool.num_workers(),
            timestamp: Utc::now(),
        }
    }
}

impl<B: TaskBuilder> Drop for Supervisor<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
