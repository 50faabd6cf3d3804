mod test_schedule;
mod test_cron_schedule;
mod test_queue;
mod test_context;
mod test_manager;
