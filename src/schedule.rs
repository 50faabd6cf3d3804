use crate::cron_schedule::CronSchedule;
use crate::error::ScheduleError;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Serialize, Deserialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl std::fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Second => write!(f,"second"),
            Self::Minute => write!(f,"minute"),
            Self::Hour => write!(f,"hour"),
            Self::Day => write!(f,"day"),
            Self::Week => write!(f,"week"),
        }
    }
}

impl FromStr for FrequencyUnit {
    type Err = ScheduleError;

    /// Accepts the spellings found in stored configurations, ignoring case and surrounding spaces.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" | "ss" => Ok(Self::Second),
            "minute" | "minutes" | "min" | "mins" => Ok(Self::Minute),
            "hour" | "hours" | "h" | "hh" => Ok(Self::Hour),
            "day" | "days" | "d" | "dd" => Ok(Self::Day),
            "week" | "weeks" | "w" | "wk" | "wks" => Ok(Self::Week),
            _ => Err(ScheduleError::InvalidFrequency(format!("unrecognized frequency unit '{}'",value)))
        }
    }
}

impl FrequencyUnit {
    /// `magnitude` units as a duration, `None` on overflow.
    pub fn duration(&self, magnitude: i64) -> Option<Duration> {
        match self {
            Self::Second => Duration::try_seconds(magnitude),
            Self::Minute => Duration::try_minutes(magnitude),
            Self::Hour => Duration::try_hours(magnitude),
            Self::Day => Duration::try_days(magnitude),
            Self::Week => Duration::try_weeks(magnitude),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// The `Schedule` struct describes how often or when a process runs.
///
/// A schedule is either in frequency mode (`frequency` and `frequency_unit`) or in
/// time-of-day mode (`schedule_time`), never both.
///
/// # Fields
///
/// - `frequency`: (Optional) Number of `frequency_unit`s between two executions. Must be greater than zero.
/// - `frequency_unit`: (Optional) Unit of `frequency`, e.g. `"second"`, `"min"`, `"hh"`, `"days"`, `"wk"`.
/// - `schedule_time`: (Optional) Time of day (UTC) at which the process runs.
/// - `schedule_retry`: (Optional) Seconds between two attempts of a time-of-day execution. Interpreted by the task handlers.
/// - `schedule_timeout`: (Optional) Seconds after `schedule_time` during which a missed execution still fires. Default: 0
pub struct Schedule {
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub frequency: Option<i64>,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub frequency_unit: Option<String>,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub schedule_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub schedule_retry: Option<u64>,
    #[serde(default, skip_serializing_if="Option::is_none")]
    pub schedule_timeout: Option<u64>,
}

#[derive(Debug, Clone)]
enum ScheduleMode {
    Frequency(Duration),
    TimeOfDay {
        cron: CronSchedule,
        timeout: Duration,
    },
}

impl Schedule {

    /// Frequency mode schedule.
    pub fn every(frequency: i64, unit: &str) -> Self {
        Self {
            frequency: Some(frequency),
            frequency_unit: Some(unit.to_string()),
            ..Default::default()
        }
    }

    /// Time-of-day mode schedule without retry window.
    pub fn daily_at(time: NaiveTime) -> Self {
        Self {
            schedule_time: Some(time),
            ..Default::default()
        }
    }

    /// Sets the retry and timeout windows, both in seconds.
    pub fn with_retry(mut self, retry: u64, timeout: u64) -> Self {
        self.schedule_retry = Some(retry);
        self.schedule_timeout = Some(timeout);
        self
    }

    fn mode(&self) -> Result<ScheduleMode, ScheduleError> {
        match (self.frequency, self.schedule_time) {
            (Some(_), Some(_)) => Err(ScheduleError::InvalidSchedule(
                "frequency and schedule time are mutually exclusive".to_string()
            )),
            (None, None) => Err(ScheduleError::InvalidSchedule(
                "either a frequency or a schedule time is required".to_string()
            )),
            (Some(frequency), None) => {
                let unit: FrequencyUnit = match &self.frequency_unit {
                    Some(value) => value.parse()?,
                    None => return Err(ScheduleError::InvalidFrequency("frequency unit is required".to_string()))
                };
                if frequency <= 0 {
                    return Err(ScheduleError::InvalidFrequency(format!("frequency must be greater than 0 got {}",frequency)));
                }
                match unit.duration(frequency) {
                    Some(interval) => Ok(ScheduleMode::Frequency(interval)),
                    None => Err(ScheduleError::InvalidFrequency(format!("frequency {} {} is out of range",frequency,unit)))
                }
            }
            (None, Some(time)) => {
                let timeout: u64 = self.schedule_timeout.unwrap_or(0);
                if let Some(retry) = self.schedule_retry {
                    if retry == 0 {
                        return Err(ScheduleError::InvalidSchedule("schedule retry must be greater than 0".to_string()));
                    }
                    if retry > timeout {
                        return Err(ScheduleError::InvalidSchedule(
                            format!("schedule retry ({}s) is greater than the schedule timeout ({}s)",retry,timeout)
                        ));
                    }
                }
                let timeout: Duration = i64::try_from(timeout).ok()
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| ScheduleError::InvalidSchedule(format!("schedule timeout {}s is out of range",timeout)))?;
                Ok(ScheduleMode::TimeOfDay {
                    cron: CronSchedule::daily_at(time),
                    timeout,
                })
            }
        }
    }

    /// Checks the configuration without computing an instant.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.mode().map(|_| ())
    }

    /// Instant the process is due next, given its last execution.
    pub fn next_execution(&self, last_execution: Option<DateTime<Utc>>) -> Result<DateTime<Utc>, ScheduleError> {
        self.next_execution_at(last_execution, Utc::now())
    }

    /// Same as [`Schedule::next_execution`] with an explicit clock.
    ///
    /// - Frequency mode: `last_execution + frequency`, or `now` when the process never ran.
    /// - Time-of-day mode: the first slot after `last_execution` that is not older than the timeout window.
    ///   A slot inside the window that already passed yields `now`.
    pub fn next_execution_at(&self, last_execution: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        match self.mode()? {
            ScheduleMode::Frequency(interval) => {
                match last_execution {
                    Some(last) => last.checked_add_signed(interval)
                        .ok_or_else(|| ScheduleError::InvalidFrequency(format!("next execution after {} is out of range",last))),
                    None => Ok(now)
                }
            }
            ScheduleMode::TimeOfDay { cron, timeout } => {
                let window_start: DateTime<Utc> = now.checked_sub_signed(timeout).unwrap_or(now);
                let anchor: DateTime<Utc> = match last_execution {
                    Some(last) if last > window_start => last,
                    _ => window_start
                };
                match cron.get_upcoming(Some(anchor))? {
                    Some(slot) => Ok(slot.max(now)),
                    None => Err(ScheduleError::InvalidSchedule(format!("no upcoming slot for {}",cron.get_expression())))
                }
            }
        }
    }
}
