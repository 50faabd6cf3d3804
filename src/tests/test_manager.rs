#[cfg(test)]
mod test_manager {
    use crate::context::ServiceKind;
    use crate::control::{Frame, Signal};
    use crate::logger::{InMemoryProcessLogger, LogStatus};
    use crate::manager::Manager;
    use crate::process::{InMemoryProcessRegistry, ProcessConfig, ProcessRegistry};
    use crate::queue::ExecutionPackage;
    use crate::schedule::Schedule;
    use crate::task::{ServiceTaskBuilder, TaskHandler, TaskRegistry};
    use crate::tests::test_helper::{process, test_config, wait_until};
    use crate::{Command, ProcessId};
    use crossbeam::channel::unbounded;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    pub struct Recorder {
        runs: Mutex<Vec<ProcessId>>
    }

    impl Recorder {
        fn count(&self, process_id: ProcessId) -> usize {
            self.runs.lock().unwrap().iter().filter(|id| **id == process_id).count()
        }
    }

    impl TaskHandler for Recorder {
        fn run(&self, process: &ProcessConfig, _package: &ExecutionPackage) -> Result<(), String> {
            self.runs.lock().unwrap().push(process.id);
            Ok(())
        }
    }

    fn manager(processes: Vec<ProcessConfig>) -> (Manager<ServiceTaskBuilder>, Arc<Recorder>, Arc<InMemoryProcessRegistry>, InMemoryProcessLogger) {
        let recorder: Arc<Recorder> = Arc::new(Recorder::default());
        let mut handlers: TaskRegistry = TaskRegistry::new();
        handlers.register("recorder", recorder.clone());
        let registry: Arc<InMemoryProcessRegistry> = Arc::new(InMemoryProcessRegistry::with_processes(processes));
        let logger: InMemoryProcessLogger = InMemoryProcessLogger::new();
        let manager = Manager::new(
            ServiceKind::Maps,
            test_config(),
            ServiceTaskBuilder::maps(handlers),
            Arc::new(logger.clone()),
            registry.clone()
        );
        (manager, recorder, registry, logger)
    }

    #[test]
    fn test_start_and_frames() {
        let (manager, recorder, _, logger) = manager(vec![
            process(1, Some(Schedule::every(1, "hour"))),
            process(2, None),
        ]);
        let result = manager.start();
        assert!(result.is_ok(),"{:?}",result.unwrap_err());
        assert_eq!(result.unwrap(), 1);
        assert_eq!(manager.supervisor().scheduled_processes(), vec![1]);
        assert!(wait_until(Duration::from_secs(3), || recorder.count(1) == 1));

        let reply = manager.handle_frame(Frame::start_process(2, None).unwrap());
        assert!(reply.is_ok(),"{:?}",reply.unwrap_err());
        assert!(reply.unwrap().is_none());
        assert!(wait_until(Duration::from_secs(3), || recorder.count(2) == 1));
        assert!(wait_until(Duration::from_secs(3), || {
            logger.entries_of(2).iter().any(|entry| entry.status == LogStatus::Done)
        }));

        let reply = manager.handle_frame(Frame::new(Signal::Status, serde_json::Value::Null)).unwrap();
        let status: Frame = reply.unwrap();
        assert_eq!(status.signal, Signal::Status);
        assert_eq!(status.payload["running"], serde_json::Value::Bool(true));
        assert_eq!(status.payload["kind"], serde_json::json!("Maps"));
        assert_eq!(status.payload["num_workers"], serde_json::json!(2));

        let reply = manager.handle_frame(Frame::new(Signal::Terminate, serde_json::Value::Null));
        assert!(reply.is_ok());
        assert!(!manager.supervisor().is_running());
    }

    #[test]
    fn test_watch_commands() {
        let (manager, recorder, registry, _) = manager(vec![process(1, Some(Schedule::every(1, "hour")))]);
        assert!(manager.start().is_ok());
        let (tx, rx) = unbounded::<Command>();
        std::thread::scope(|scope| {
            scope.spawn(|| manager.watch(rx));

            let added: ProcessConfig = process(5, Some(Schedule::every(30, "min")));
            assert!(manager.send_command(Command::AddProcess(added), &tx).is_ok());
            assert!(wait_until(Duration::from_secs(3), || manager.supervisor().scheduled_processes() == vec![1, 5]));
            assert!(wait_until(Duration::from_secs(3), || recorder.count(5) == 1));
            assert!(registry.find_process(5).is_some());

            assert!(manager.send_command(Command::RemoveProcess(1), &tx).is_ok());
            assert!(wait_until(Duration::from_secs(3), || registry.find_process(1).is_none()));
            assert_eq!(manager.supervisor().scheduled_processes(), vec![5]);

            assert!(manager.send_command(Command::UpdateNumberOfThreads(3), &tx).is_ok());
            assert!(wait_until(Duration::from_secs(3), || manager.supervisor().status().num_workers == 3));

            assert!(manager.send_command(Command::Shutdown, &tx).is_ok());
        });
        assert!(!manager.supervisor().is_running());
        assert!(manager.supervisor().scheduled_processes().is_empty());
    }
}
