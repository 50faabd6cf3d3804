#[cfg(test)]
mod test_cron_schedule {
    use chrono::{DateTime, NaiveTime, TimeZone, Utc};
    use crate::cron_schedule::CronSchedule;
    use crate::error::ScheduleError;

    #[test]
    fn test_daily_expression() {
        let cron_schedule = CronSchedule::daily_at(NaiveTime::from_hms_opt(8, 15, 30).unwrap());
        assert_eq!(cron_schedule.get_expression(), "30 15 8 * * * *");
    }

    #[test]
    fn test_upcoming() {
        let cron_schedule = CronSchedule::new().set_minute("*/6".to_string());
        let dt: DateTime<Utc> = Utc::now();
        let result: Result<Option<DateTime<Utc>>, ScheduleError> = cron_schedule.get_upcoming(Some(dt));
        assert!(result.is_ok(),"{}",result.unwrap_err());
        let schedule: Option<DateTime<Utc>> = result.unwrap();
        assert!(schedule.is_some());
        let next_schedule: DateTime<Utc> = schedule.unwrap();
        assert!(next_schedule > dt,"Start DateTime: {:?} | Next Schedule: {:?}",dt,next_schedule);
    }

    #[test]
    fn test_upcoming_is_strictly_after() {
        let cron_schedule = CronSchedule::daily_at(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        let slot: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let result = cron_schedule.get_upcoming(Some(slot));
        assert_eq!(result, Ok(Some(Utc.with_ymd_and_hms(2024, 5, 11, 8, 0, 0).unwrap())));
    }

    #[test]
    fn test_invalid_expression() {
        let cron_schedule = CronSchedule::new().set_hour("25".to_string());
        let result = cron_schedule.get_upcoming(None);
        assert!(matches!(result, Err(ScheduleError::InvalidSchedule(_))),"{:?}",result);
    }
}
