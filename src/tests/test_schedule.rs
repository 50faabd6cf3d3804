#[cfg(test)]
mod test_schedule {
    use crate::error::ScheduleError;
    use crate::schedule::{FrequencyUnit, Schedule};
    use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
    use rand::{self, Rng};

    const SPELLINGS: [(&str, FrequencyUnit); 23] = [
        ("second", FrequencyUnit::Second), ("seconds", FrequencyUnit::Second), ("sec", FrequencyUnit::Second),
        ("secs", FrequencyUnit::Second), ("s", FrequencyUnit::Second), ("ss", FrequencyUnit::Second),
        ("minute", FrequencyUnit::Minute), ("minutes", FrequencyUnit::Minute), ("min", FrequencyUnit::Minute),
        ("mins", FrequencyUnit::Minute),
        ("hour", FrequencyUnit::Hour), ("hours", FrequencyUnit::Hour), ("h", FrequencyUnit::Hour), ("hh", FrequencyUnit::Hour),
        ("day", FrequencyUnit::Day), ("days", FrequencyUnit::Day), ("d", FrequencyUnit::Day), ("dd", FrequencyUnit::Day),
        ("week", FrequencyUnit::Week), ("weeks", FrequencyUnit::Week), ("w", FrequencyUnit::Week), ("wk", FrequencyUnit::Week),
        ("wks", FrequencyUnit::Week),
    ];

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_first_run_is_immediate_then_frequency() {
        let schedule: Schedule = Schedule::every(5, "second");
        let now: DateTime<Utc> = Utc::now();
        let result: Result<DateTime<Utc>, ScheduleError> = schedule.next_execution_at(None, now);
        assert!(result.is_ok(),"{:?}",result.unwrap_err());
        assert_eq!(result.unwrap(), now);

        let result: Result<DateTime<Utc>, ScheduleError> = schedule.next_execution_at(Some(now), now);
        assert!(result.is_ok(),"{:?}",result.unwrap_err());
        assert_eq!(result.unwrap(), now + Duration::seconds(5));
    }

    #[test]
    fn test_unrecognized_unit() {
        let result = Schedule::every(30, "invalid").next_execution(None);
        assert!(matches!(result, Err(ScheduleError::InvalidFrequency(_))),"{:?}",result);
    }

    #[test]
    fn test_frequency_validity() {
        for (spelling, _) in SPELLINGS {
            for frequency in [-10, -1, 0] {
                let result = Schedule::every(frequency, spelling).next_execution(None);
                assert!(matches!(result, Err(ScheduleError::InvalidFrequency(_))),"{} {}: {:?}",frequency,spelling,result);
            }
            let frequency: i64 = rand::thread_rng().gen_range(1..1000);
            let result = Schedule::every(frequency, spelling).next_execution(Some(Utc::now()));
            assert!(result.is_ok(),"{} {}: {:?}",frequency,spelling,result.unwrap_err());
        }
    }

    #[test]
    fn test_unit_spellings() {
        for (spelling, unit) in SPELLINGS {
            assert_eq!(spelling.parse::<FrequencyUnit>(), Ok(unit));
            assert_eq!(spelling.to_uppercase().parse::<FrequencyUnit>(), Ok(unit));
        }
        assert_eq!(" Min ".parse::<FrequencyUnit>(), Ok(FrequencyUnit::Minute));
        assert!("fortnight".parse::<FrequencyUnit>().is_err());
    }

    #[test]
    fn test_units() {
        let last: DateTime<Utc> = at(10, 0);
        for (unit, expected) in [
            ("min", Duration::minutes(3)),
            ("hh", Duration::hours(3)),
            ("days", Duration::days(3)),
            ("wk", Duration::weeks(3)),
        ] {
            let result = Schedule::every(3, unit).next_execution_at(Some(last), last);
            assert_eq!(result, Ok(last + expected),"{}",unit);
        }
    }

    #[test]
    fn test_rescheduling_is_strictly_later() {
        let fired_at: DateTime<Utc> = Utc::now();
        for (spelling, _) in SPELLINGS {
            let schedule: Schedule = Schedule::every(1, spelling);
            let next = schedule.next_execution_at(Some(fired_at), fired_at).unwrap();
            assert!(next > fired_at,"{}: {:?} <= {:?}",spelling,next,fired_at);
        }
        let schedule: Schedule = Schedule::daily_at(NaiveTime::from_hms_opt(10, 0, 0).unwrap()).with_retry(60, 3600);
        let next = schedule.next_execution_at(Some(at(10, 0)), at(10, 0)).unwrap();
        assert!(next > at(10, 0));
    }

    #[test]
    fn test_invalid_schedule() {
        let result = Schedule::default().next_execution(None);
        assert!(matches!(result, Err(ScheduleError::InvalidSchedule(_))),"{:?}",result);

        let mut schedule: Schedule = Schedule::every(1, "hour");
        schedule.schedule_time = NaiveTime::from_hms_opt(8, 0, 0);
        assert!(matches!(schedule.validate(), Err(ScheduleError::InvalidSchedule(_))));

        let schedule: Schedule = Schedule {
            frequency: Some(1),
            ..Default::default()
        };
        assert!(matches!(schedule.validate(), Err(ScheduleError::InvalidFrequency(_))));

        let time: NaiveTime = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(matches!(Schedule::daily_at(time).with_retry(0, 60).validate(), Err(ScheduleError::InvalidSchedule(_))));
        assert!(matches!(Schedule::daily_at(time).with_retry(600, 60).validate(), Err(ScheduleError::InvalidSchedule(_))));
        assert!(Schedule::daily_at(time).with_retry(60, 600).validate().is_ok());
    }

    #[test]
    fn test_time_of_day() {
        let eight: NaiveTime = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let now: DateTime<Utc> = at(10, 0);

        // Slot passed without catch-up window: tomorrow.
        let result = Schedule::daily_at(eight).next_execution_at(None, now);
        assert_eq!(result, Ok(at(8, 0) + Duration::days(1)));

        // Slot later today.
        let result = Schedule::daily_at(NaiveTime::from_hms_opt(12, 30, 0).unwrap()).next_execution_at(None, now);
        assert_eq!(result, Ok(at(12, 30)));

        // Missed slot inside the timeout window fires now.
        let schedule: Schedule = Schedule::daily_at(eight).with_retry(600, 3 * 3600);
        assert_eq!(schedule.next_execution_at(None, now), Ok(now));
        assert_eq!(schedule.next_execution_at(Some(at(7, 0) - Duration::days(1)), now), Ok(now));

        // Already ran for today's slot.
        assert_eq!(schedule.next_execution_at(Some(at(8, 0)), now), Ok(at(8, 0) + Duration::days(1)));

        // Missed slot outside the timeout window.
        let schedule: Schedule = Schedule::daily_at(eight).with_retry(60, 3600);
        assert_eq!(schedule.next_execution_at(None, now), Ok(at(8, 0) + Duration::days(1)));
    }

    #[test]
    fn test_deserialize() {
        let schedule: Schedule = serde_json::from_str(r#"{"frequency": 5, "frequency_unit": "min"}"#).unwrap();
        assert_eq!(schedule, Schedule::every(5, "min"));
        assert!(schedule.validate().is_ok());

        let schedule: Schedule = serde_json::from_str(
            r#"{"schedule_time": "08:00:00", "schedule_retry": 300, "schedule_timeout": 3600}"#
        ).unwrap();
        assert_eq!(schedule, Schedule::daily_at(NaiveTime::from_hms_opt(8, 0, 0).unwrap()).with_retry(300, 3600));
        assert!(schedule.validate().is_ok());
    }
}
