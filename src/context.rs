use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tracing::Level;
use crate::logger::ProcessLogger;
use crate::process::ProcessRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Collector,
    Analysis,
    View,
    Alert,
    Maps,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collector => write!(f,"collector"),
            Self::Analysis => write!(f,"analysis"),
            Self::View => write!(f,"view"),
            Self::Alert => write!(f,"alert"),
            Self::Maps => write!(f,"maps"),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|value| value.parse::<T>().ok()).unwrap_or(default)
}

/// Where the process logger persists its entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            host: env::var("TEMPORA_LOG_HOST").unwrap_or(String::from("127.0.0.1")),
            port: env_or("TEMPORA_LOG_PORT", 5432),
            username: env::var("TEMPORA_LOG_USER").unwrap_or(String::new()),
            password: env::var("TEMPORA_LOG_PASSWORD").unwrap_or(String::new()),
            database: env::var("TEMPORA_LOG_DATABASE").unwrap_or(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Settings of one service instance.
///
/// # Fields
///
/// - `instance_id`: Identifier of this service instance. Only processes assigned to it are run. Env: `TEMPORA_INSTANCE_ID`, Default: 1
/// - `threads`: Number of workers, `0` uses the hardware concurrency. Env: `TEMPORA_THREADS`, Default: 0
/// - `allow_overlap`: Whether an execution may be queued while another one of the same process is queued or running. Env: `TEMPORA_ALLOW_OVERLAP`, Default: true
/// - `run_on_schedule`: Whether scheduling a process also queues an immediate execution. When false the first execution follows the last logged one. Env: `TEMPORA_RUN_ON_SCHEDULE`, Default: true
/// - `log_level`: Maximum tracing level. Env: `TEMPORA_LOG_LEVEL`, Default: info
/// - `connection`: Connection of the process logger.
pub struct ServiceConfig {
    pub instance_id: u32,
    pub threads: usize,
    pub allow_overlap: bool,
    pub run_on_schedule: bool,
    pub log_level: String,
    pub connection: ConnectionInfo,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_id: env_or("TEMPORA_INSTANCE_ID", 1),
            threads: env_or("TEMPORA_THREADS", 0),
            allow_overlap: env_or("TEMPORA_ALLOW_OVERLAP", true),
            run_on_schedule: env_or("TEMPORA_RUN_ON_SCHEDULE", true),
            log_level: env::var("TEMPORA_LOG_LEVEL").unwrap_or(String::from("info")),
            connection: ConnectionInfo::default(),
        }
    }
}

impl ServiceConfig {
    pub fn tracing_level(&self) -> Level {
        Level::from_str(self.log_level.as_str()).unwrap_or(Level::INFO)
    }
}

/// State shared by the supervisor, its timers and its tasks.
#[derive(Clone)]
pub struct ServiceContext {
    pub instance_id: u32,
    pub kind: ServiceKind,
    pub start_time: DateTime<Utc>,
    pub registry: Arc<dyn ProcessRegistry>,
    pub connection: ConnectionInfo,
    logger: Arc<RwLock<Arc<dyn ProcessLogger>>>,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("instance_id", &self.instance_id)
            .field("kind", &self.kind)
            .field("start_time", &self.start_time)
            .finish()
    }
}

impl ServiceContext {

    /// Builds the context and hands the logger its connection.
    pub fn new(kind: ServiceKind, config: &ServiceConfig, logger: Arc<dyn ProcessLogger>, registry: Arc<dyn ProcessRegistry>) -> Self {
        logger.set_connection_info(config.connection.clone());
        Self {
            instance_id: config.instance_id,
            kind,
            start_time: Utc::now(),
            registry,
            connection: config.connection.clone(),
            logger: Arc::new(RwLock::new(logger)),
        }
    }

    pub fn logger(&self) -> Arc<dyn ProcessLogger> {
        match self.logger.read() {
            Ok(logger) => logger.clone(),
            Err(poisoned) => poisoned.into_inner().clone()
        }
    }

    /// Replaces the logger, handing it the connection of the service first.
    pub fn set_logger(&self, logger: Arc<dyn ProcessLogger>) {
        logger.set_connection_info(self.connection.clone());
        match self.logger.write() {
            Ok(mut current) => *current = logger,
            Err(poisoned) => *poisoned.into_inner() = logger
        }
    }
}
