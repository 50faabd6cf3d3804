use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, instrument, warn};

/// Unit of work executed by the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct PoolState {
    tasks: VecDeque<Task>,
    stop: bool,
}

#[derive(Default)]
struct PoolShared {
    state: Mutex<PoolState>,
    condvar: Condvar,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Resolves the number of workers to spawn.
///
/// `0` asks for the detected hardware concurrency, and an undetectable or zero
/// concurrency falls back to a single worker.
pub fn resolve_thread_count(requested: usize, detected: Option<usize>) -> usize {
    if requested > 0 {
        return requested;
    }
    match detected {
        Some(value) if value > 0 => value,
        _ => 1
    }
}

fn hardware_concurrency() -> Option<usize> {
    thread::available_parallelism().ok().map(|value| value.get())
}

/// Fixed size set of threads consuming a FIFO task queue.
pub struct WorkerPool {
    name: String,
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("num_workers", &self.num_workers())
            .field("pending", &self.pending())
            .finish()
    }
}

impl WorkerPool {

    /// Creates an idle pool, `name` prefixes the worker thread names.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shared: Arc::new(PoolShared::default()),
            workers: Mutex::new(Vec::new()),
        }
    }

    fn workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawns the workers and returns how many were started.
    ///
    /// # Parameters
    ///
    /// - `thread_count`: number of workers. `0` uses the hardware concurrency, or 1 when it cannot be determined.
    pub fn start(&self, thread_count: usize) -> usize {
        let thread_count: usize = resolve_thread_count(thread_count, hardware_concurrency());
        self.shared.lock().stop = false;
        let mut workers = self.workers();
        for index in 0..thread_count {
            let shared: Arc<PoolShared> = self.shared.clone();
            let worker_name: String = format!("{}-worker-{}",self.name,index);
            match thread::Builder::new()
                .name(worker_name.clone())
                .spawn(move || watch(shared, worker_name)) {
                Ok(handle) => workers.push(handle),
                Err(err) => error!("unable to spawn worker {} of {}: {}",index,self.name,err)
            }
        }
        info!("{} started with {} worker(s)",self.name,workers.len());
        workers.len()
    }

    /// Appends a task and wakes one idle worker.
    pub fn push(&self, task: Task) {
        self.shared.lock().tasks.push_back(task);
        self.shared.condvar.notify_one();
    }

    /// Number of tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    pub fn num_workers(&self) -> usize {
        self.workers().len()
    }

    fn join_workers(&self) {
        {
            self.shared.lock().stop = true;
        }
        self.shared.condvar.notify_all();
        let handles: Vec<JoinHandle<()>> = self.workers().drain(..).collect();
        for handle in handles {
            let name: String = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("{} terminated abnormally",name);
            }
        }
    }

    /// Restarts the pool with `thread_count` workers.
    ///
    /// In-flight tasks run to completion before the old workers exit; queued tasks
    /// are kept for the new workers.
    pub fn update_number_of_threads(&self, thread_count: usize) -> usize {
        self.join_workers();
        self.start(thread_count)
    }

    /// Stops every worker and discards the tasks that never started.
    ///
    /// Returns once every worker has been joined.
    pub fn stop(&self) {
        self.join_workers();
        // Discarded tasks must be dropped without holding the pool lock.
        let tasks: VecDeque<Task> = std::mem::take(&mut self.shared.lock().tasks);
        let discarded: usize = tasks.len();
        drop(tasks);
        if discarded > 0 {
            warn!("{} stopped, {} queued task(s) discarded",self.name,discarded);
        }
        else {
            info!("{} stopped",self.name);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers().is_empty() {
            self.stop();
        }
    }
}

#[instrument(skip(shared))]
fn watch(shared: Arc<PoolShared>, worker_name: String) {
    loop {
        let task: Task = {
            let mut state = shared.lock();
            while state.tasks.is_empty() && !state.stop {
                state = shared.condvar.wait(state).unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            if state.stop {
                break;
            }
            match state.tasks.pop_front() {
                Some(task) => task,
                None => continue
            }
        };
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            error!("{} caught a panicking task, continuing",worker_name);
        }
    }
    debug!("{} exited",worker_name);
}
