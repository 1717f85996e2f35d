use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use log::warn;
use rand::Rng;

use crate::models::{Timestamp, MAX_NOTIFICATIONS_PER_DAY, MIN_NOTIFICATIONS_PER_DAY};
use crate::util::clamp;

/// Random reminder times inside `[start_hour, end_hour)` of `date`, ascending.
///
/// `count` is clamped to the allowed range. The hours are used as given; when
/// the window is empty every reminder lands on `start_hour`.
pub fn generate(count: u32, start_hour: u32, end_hour: u32, date: NaiveDate) -> Vec<Timestamp> {
    generate_with_rng(count, start_hour, end_hour, date, &mut rand::thread_rng())
}

pub fn generate_with_rng<R: Rng + ?Sized>(count: u32,
    start_hour: u32,
    end_hour: u32,
    date: NaiveDate,
    rng: &mut R) -> Vec<Timestamp> {

    let count = clamp(count, MIN_NOTIFICATIONS_PER_DAY, MAX_NOTIFICATIONS_PER_DAY);
    let start = hour_of_day(date, start_hour).timestamp_millis();
    let end = hour_of_day(date, end_hour).timestamp_millis();

    if end <= start {
        warn!("generator:: empty window {}h-{}h on {}, reminders collapse onto {}h", start_hour, end_hour, date, start_hour);
    }
    let span = (end - start).max(1);

    let mut times: Vec<Timestamp> = (0..count)
        .map(|_| start + rng.gen_range(0..span))
        .collect();
    times.sort_unstable();
    times
}

/// Local instant for `hour:00` on `date`. Hour 24 is the next midnight; an hour
/// skipped by a DST change resolves to the first valid hour after it.
fn hour_of_day(date: NaiveDate, hour: u32) -> DateTime<Local> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let mut naive = midnight + Duration::hours(hour as i64);
    loop {
        if let Some(instant) = Local.from_local_datetime(&naive).earliest() {
            return instant;
        }
        naive += Duration::hours(1);
    }
}
