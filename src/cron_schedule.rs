use std::str::FromStr;
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use cron::Schedule;
use serde::{Serialize, Deserialize};
use crate::error::ScheduleError;


/// Cron expression used for the time-of-day schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronSchedule {
    second: String,
    minute: String,
    hour: String,
    day_of_month: String,
    month: String,
    day_of_week: String,
    year: String,
}
impl Default for CronSchedule {
    fn default() -> Self {
        Self {
            second: "0".to_string(),
            minute: "*".to_string(),
            hour: "*".to_string(),
            day_of_month: "*".to_string(),
            month: "*".to_string(),
            day_of_week: "*".to_string(),
            year: "*".to_string(),
        }
    }
}

impl CronSchedule {

    pub fn new() -> Self {
        Self {
            ..Default::default()
        }
    }

    /// Expression firing once a day at `time` (UTC).
    pub fn daily_at(time: NaiveTime) -> Self {
        Self::new()
            .set_second(time.second().to_string())
            .set_minute(time.minute().to_string())
            .set_hour(time.hour().to_string())
    }

    /// First instant strictly after `datetime` (defaults to now) matching the expression.
    pub fn get_upcoming(&self, datetime: Option<DateTime<Utc>>) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let cron_expr: String = self.get_expression();
        match Schedule::from_str(cron_expr.as_str()) {
            Ok(schedule) => {
                let datetime = datetime.unwrap_or(Utc::now());
                Ok(schedule.after(&datetime).next())
            }
            Err(error) => Err(ScheduleError::InvalidSchedule(format!("{}: {}", cron_expr, error)))
        }
    }

    ///Format: second  minute   hour   day of month   month   day of week   year
    pub fn get_expression(&self) -> String {
        let expr = [
            self.second.as_str(),
            self.minute.as_str(),
            self.hour.as_str(),
            self.day_of_month.as_str(),
            self.month.as_str(),
            self.day_of_week.as_str(),
            self.year.as_str()
        ];
        expr.join(" ")
    }
    pub fn set_second(mut self, value: String) -> Self {
        self.second = value;
        self
    }
    pub fn set_minute(mut self, value: String) -> Self {
        self.minute = value;
        self
    }
    pub fn set_hour(mut self, value: String) -> Self {
        self.hour = value;
        self
    }
}
