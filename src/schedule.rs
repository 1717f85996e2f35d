use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;

use crate::clock::{date_key, Clock};
use crate::generator::{generate, generate_with_rng};
use crate::models::{Schedule, Settings, Timestamp};
use crate::store::{self, KeyValueStore};

pub const PREVIEW_LEN: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopResult {
    /// The schedule as persisted after the pop, `None` when there was none.
    pub schedule: Option<Schedule>,
    /// Ascending.
    pub due: Vec<Timestamp>,
}

/// Single owner of today's reminder schedule.
///
/// At most one schedule is stored at a time. It is regenerated only when it is
/// missing or belongs to another calendar day, and shrinks as reminders are popped.
pub struct ScheduleManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Fixed-seed generator for reproducible schedules, thread RNG otherwise.
    rng: Option<StdRng>,
}

impl ScheduleManager {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> ScheduleManager {
        ScheduleManager { store, clock, rng: None }
    }

    #[cfg(test)]
    pub fn with_seed(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, seed: u64) -> ScheduleManager {
        use rand::SeedableRng;
        ScheduleManager { store, clock, rng: Some(StdRng::seed_from_u64(seed)) }
    }

    pub fn now_ms(&self) -> Timestamp {
        self.clock.now().timestamp_millis()
    }

    pub fn ensure_today_schedule(&mut self, settings: &Settings) -> Schedule {
        let today = self.clock.today();
        let today_key = date_key(today);

        if let Some(schedule) = store::load_schedule(self.store.as_ref()) {
            if schedule.date == today_key {
                return schedule;
            }
            debug!("schedule:: dropping schedule for {} ({} unsent)", schedule.date, schedule.times.len());
        }

        let (count, start_hour, end_hour) = (settings.notifications_per_day, settings.start_hour, settings.end_hour);
        let times = match self.rng.as_mut() {
            Some(rng) => generate_with_rng(count, start_hour, end_hour, today, rng),
            None => generate(count, start_hour, end_hour, today),
        };
        let schedule = Schedule { date: today_key, times };
        store::save_schedule(self.store.as_ref(), &schedule);
        info!("schedule:: generated {} reminders for {}", schedule.times.len(), schedule.date);
        schedule
    }

    /// Removes every reminder at or before `now` from the stored schedule and
    /// returns them. The shortened schedule is written before returning, so a
    /// popped reminder is never handed out twice, even across restarts.
    pub fn pop_due_notifications(&mut self, now: Timestamp) -> PopResult {
        let Some(schedule) = store::load_schedule(self.store.as_ref()) else {
            return PopResult { schedule: None, due: Vec::new() };
        };

        let (due, remaining): (Vec<Timestamp>, Vec<Timestamp>) =
            schedule.times.into_iter().partition(|time| *time <= now);

        let next = Schedule { date: schedule.date, times: remaining };
        store::save_schedule(self.store.as_ref(), &next);

        if !due.is_empty() {
            debug!("schedule:: {} reminders due, {} remaining", due.len(), next.times.len());
        }
        PopResult { schedule: Some(next), due }
    }

    pub fn schedule_preview(&self) -> Vec<Timestamp> {
        store::load_schedule(self.store.as_ref())
            .map(|schedule| schedule.times.into_iter().take(PREVIEW_LEN).collect())
            .unwrap_or_default()
    }

    pub fn reset_schedule(&mut self) {
        store::remove_schedule(self.store.as_ref());
        debug!("schedule:: reset");
    }
}
