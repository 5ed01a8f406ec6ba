//! Clock abstraction
//!
//! The engine reads the clock once per evaluation, so every reminder in one
//! tick is compared against the same instant.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use parking_lot::Mutex;

use crate::models::reminder::TimeOfDay;

/// A single clock read at minute granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub date: NaiveDate,
    pub time: TimeOfDay,
    /// 0 = Sunday ... 6 = Saturday
    pub weekday: u8,
    /// The exact instant the reading was taken
    pub instant: DateTime<Utc>,
}

impl ClockReading {
    /// Reading of a naive datetime taken as UTC
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self::from_parts(datetime, datetime.and_utc())
    }

    pub fn from_local(datetime: DateTime<Local>) -> Self {
        Self::from_parts(datetime.naive_local(), datetime.with_timezone(&Utc))
    }

    fn from_parts(wall: NaiveDateTime, instant: DateTime<Utc>) -> Self {
        Self {
            date: wall.date(),
            time: TimeOfDay::at(wall.hour() as u8, wall.minute() as u8),
            weekday: wall.weekday().num_days_from_sunday() as u8,
            instant,
        }
    }

    /// Identifies the firing minute, e.g. `2026-10-19T09:00`
    pub fn minute_stamp(&self) -> String {
        format!("{}T{}", self.date.format("%Y-%m-%d"), self.time)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> ClockReading;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> ClockReading {
        ClockReading::from_local(Local::now())
    }
}

/// Virtual clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Clock set to `date` at `time`
    pub fn at(date: NaiveDate, time: TimeOfDay) -> Self {
        Self::new(Self::combine(date, time))
    }

    pub fn set(&self, datetime: NaiveDateTime) {
        *self.current.lock() = datetime;
    }

    /// Move to `time` on the current date
    pub fn set_time(&self, time: TimeOfDay) {
        let mut current = self.current.lock();
        *current = Self::combine(current.date(), time);
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current += by;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }

    fn combine(date: NaiveDate, time: TimeOfDay) -> NaiveDateTime {
        let time = NaiveTime::from_hms_opt(time.hour() as u32, time.minute() as u32, 0)
            .unwrap_or_default();
        NaiveDateTime::new(date, time)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ClockReading {
        ClockReading::from_datetime(*self.current.lock())
    }
}
