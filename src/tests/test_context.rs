#[cfg(test)]
mod test_context {
    use crate::context::{ServiceConfig, ServiceContext, ServiceKind};
    use crate::logger::{InMemoryProcessLogger, ProcessLogger};
    use crate::process::{InMemoryProcessRegistry, ProcessRegistry};
    use crate::tests::test_helper::{process, test_config};
    use std::env;
    use std::sync::Arc;
    use tracing::Level;

    #[test]
    fn test_config_from_env() {
        env::set_var("TEMPORA_INSTANCE_ID","4");
        env::set_var("TEMPORA_THREADS","6");
        env::set_var("TEMPORA_ALLOW_OVERLAP","false");
        env::set_var("TEMPORA_RUN_ON_SCHEDULE","not-a-bool");
        env::set_var("TEMPORA_LOG_LEVEL","debug");
        let config: ServiceConfig = ServiceConfig::default();
        assert_eq!(config.instance_id, 4);
        assert_eq!(config.threads, 6);
        assert!(!config.allow_overlap);
        assert!(config.run_on_schedule);
        assert_eq!(config.tracing_level(), Level::DEBUG);
        for key in ["TEMPORA_INSTANCE_ID","TEMPORA_THREADS","TEMPORA_ALLOW_OVERLAP","TEMPORA_RUN_ON_SCHEDULE","TEMPORA_LOG_LEVEL"] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_unknown_log_level() {
        let config: ServiceConfig = ServiceConfig {
            log_level: "chatty".to_string(),
            ..test_config()
        };
        assert_eq!(config.tracing_level(), Level::INFO);
    }

    #[test]
    fn test_context() {
        let logger: InMemoryProcessLogger = InMemoryProcessLogger::new();
        let registry: Arc<InMemoryProcessRegistry> = Arc::new(InMemoryProcessRegistry::with_processes(vec![process(1, None)]));
        let config: ServiceConfig = test_config();
        let context: ServiceContext = ServiceContext::new(ServiceKind::Alert, &config, Arc::new(logger.clone()), registry);
        assert_eq!(context.instance_id, config.instance_id);
        assert_eq!(context.kind.to_string(), "alert");
        assert_eq!(logger.connection_info(), Some(config.connection));
        assert!(context.registry.find_process(1).is_some());
        assert!(context.registry.find_process(2).is_none());

        let replacement: InMemoryProcessLogger = InMemoryProcessLogger::new();
        context.set_logger(Arc::new(replacement.clone()));
        assert!(context.logger().start(1).is_ok());
        assert_eq!(replacement.entries().len(), 1);
        assert!(logger.entries().is_empty());
    }
}
