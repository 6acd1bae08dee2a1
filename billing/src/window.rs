use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Instant of an evaluation and the window boundaries derived from it.
///
/// The day starts at local midnight and the month on the first of the
/// calendar month, both in the time zone of the clock that was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationTime {
    pub now: DateTime<Utc>,
    pub day_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
    /// First day of the current month, used to key once-per-period alerts.
    pub period: NaiveDate,
}

impl EvaluationTime {
    /// Reads the server's local clock.
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let period = today.with_day(1).unwrap_or(today);

        Self {
            now: now.with_timezone(&Utc),
            day_start: start_of(&tz, today),
            month_start: start_of(&tz, period),
            period,
        }
    }
}

// Midnight can be skipped by a DST transition; fall back to reading the
// naive time as UTC rather than failing the evaluation.
fn start_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
