use crate::error::{Result, SentinelError};
use crate::sentinel::Sentinel;
use chrono::{DateTime, Local, TimeDelta};
use shared::Schedule;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

/// Interval schedules for batch saves.
#[derive(Debug, Default)]
pub struct ScheduleBook {
    schedules: Vec<Schedule>,
}

impl ScheduleBook {
    /// Restores persisted schedules; enabled ones whose next run is missing
    /// or already past are rearmed one interval from `now`. Schedules whose
    /// interval cannot be scheduled are dropped.
    pub fn restore(schedules: Vec<Schedule>, now: DateTime<Local>) -> Self {
        let schedules = schedules
            .into_iter()
            .filter_map(|mut s| {
                let Some(rearmed) = next_after(now, s.interval_min) else {
                    log::warn!(
                        "Dropping schedule '{}': invalid interval of {} min",
                        s.name,
                        s.interval_min
                    );
                    return None;
                };
                if s.enabled && s.next_run.is_none_or(|next| next < now) {
                    s.next_run = Some(rearmed);
                }
                Some(s)
            })
            .collect();
        Self { schedules }
    }

    pub fn add(&mut self, name: &str, interval_min: u64, now: DateTime<Local>) -> Result<Schedule> {
        if interval_min == 0 {
            return Err(SentinelError::bad_request("interval_min must be at least 1"));
        }
        let next_run = next_after(now, interval_min).ok_or_else(|| {
            SentinelError::bad_request(format!("interval_min {} is out of range", interval_min))
        })?;
        let schedule = Schedule {
            id: format!("save_{}", uuid::Uuid::new_v4().simple()),
            name: name.to_string(),
            interval_min,
            enabled: true,
            created: now,
            last_run: None,
            next_run: Some(next_run),
        };
        self.schedules.push(schedule.clone());
        Ok(schedule)
    }

    pub fn remove(&mut self, id: &str) -> Option<Schedule> {
        let index = self.schedules.iter().position(|s| s.id == id)?;
        Some(self.schedules.remove(index))
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool, now: DateTime<Local>) -> Option<Schedule> {
        let schedule = self.schedules.iter_mut().find(|s| s.id == id)?;
        let next_run = if enabled { next_after(now, schedule.interval_min) } else { None };
        schedule.enabled = next_run.is_some();
        schedule.next_run = next_run;
        Some(schedule.clone())
    }

    pub fn list(&self) -> Vec<Schedule> {
        self.schedules.clone()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Marks every enabled schedule due at `now` as run and returns them.
    pub fn take_due(&mut self, now: DateTime<Local>) -> Vec<Schedule> {
        let mut due = Vec::new();
        for schedule in self.schedules.iter_mut().filter(|s| s.enabled) {
            if schedule.next_run.is_some_and(|next| next <= now) {
                let next_run = next_after(now, schedule.interval_min);
                if next_run.is_none() {
                    log::warn!("Schedule '{}' cannot be rearmed, disabling it", schedule.name);
                    schedule.enabled = false;
                }
                schedule.last_run = Some(now);
                schedule.next_run = next_run;
                due.push(schedule.clone());
            }
        }
        due
    }
}

/// `now` plus `minutes`, or `None` for a zero interval or one that does not
/// fit a timestamp.
fn next_after(now: DateTime<Local>, minutes: u64) -> Option<DateTime<Local>> {
    if minutes == 0 {
        return None;
    }
    let minutes = i64::try_from(minutes).ok()?;
    now.checked_add_signed(TimeDelta::try_minutes(minutes)?)
}

/// Save label for a schedule: lower-cased name with spaces as underscores.
pub fn schedule_label(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

pub fn start_scheduler(sentinel: Arc<Sentinel>, running: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        log::info!("Scheduler started");
        while running.load(Ordering::Relaxed) {
            for schedule in sentinel.take_due_schedules(Local::now()) {
                log::info!("⏰ Schedule '{}' fired", schedule.name);
                sentinel.queue_batch_save(&schedule_label(&schedule.name));
            }
            std::thread::sleep(TICK);
        }
        log::info!("Scheduler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 2, 24, h, m, 0).unwrap()
    }

    #[test]
    fn add_arms_first_run_one_interval_out() {
        let mut book = ScheduleBook::default();
        let s = book.add("Auto Save", 30, at(14, 0)).unwrap();
        assert!(s.id.starts_with("save_"));
        assert!(s.enabled);
        assert_eq!(s.next_run, Some(at(14, 30)));
        assert!(book.add("bad", 0, at(14, 0)).is_err());
    }

    #[test]
    fn due_schedules_fire_once_per_interval() {
        let mut book = ScheduleBook::default();
        book.add("Auto Save", 30, at(14, 0)).unwrap();
        book.add("Hourly", 60, at(14, 0)).unwrap();

        assert!(book.take_due(at(14, 29)).is_empty());

        let due = book.take_due(at(14, 30));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Auto Save");
        assert_eq!(due[0].last_run, Some(at(14, 30)));
        assert_eq!(due[0].next_run, Some(at(15, 0)));

        assert!(book.take_due(at(14, 31)).is_empty());
        assert_eq!(book.take_due(at(15, 0)).len(), 2);
    }

    #[test]
    fn disabled_schedules_do_not_fire() {
        let mut book = ScheduleBook::default();
        let id = book.add("Auto Save", 5, at(14, 0)).unwrap().id;
        let disabled = book.set_enabled(&id, false, at(14, 1)).unwrap();
        assert_eq!(disabled.next_run, None);
        assert!(book.take_due(at(15, 0)).is_empty());

        let enabled = book.set_enabled(&id, true, at(15, 0)).unwrap();
        assert_eq!(enabled.next_run, Some(at(15, 5)));
        assert!(book.set_enabled("missing", true, at(15, 0)).is_none());
    }

    #[test]
    fn remove_by_id() {
        let mut book = ScheduleBook::default();
        let id = book.add("Auto Save", 5, at(14, 0)).unwrap().id;
        assert!(book.remove("nope").is_none());
        assert!(book.remove(&id).is_some());
        assert!(book.is_empty());
    }

    #[test]
    fn restore_rearms_stale_schedules() {
        let mut book = ScheduleBook::default();
        book.add("Auto Save", 30, at(8, 0)).unwrap();
        let restored = ScheduleBook::restore(book.list(), at(14, 0));
        assert_eq!(restored.list()[0].next_run, Some(at(14, 30)));
    }

    #[test]
    fn oversized_intervals_are_rejected() {
        let mut book = ScheduleBook::default();
        assert!(matches!(
            book.add("x", u64::MAX, at(14, 0)),
            Err(SentinelError::BadRequest(_))
        ));
        assert!(book.add("x", 1_000_000_000_000, at(14, 0)).is_err());
        assert!(book.is_empty());

        let year = book.add("Yearly", 525_600, at(14, 0)).unwrap();
        assert!(year.next_run.is_some_and(|next| next > at(14, 0)));
    }

    #[test]
    fn restore_drops_unschedulable_entries() {
        let mut book = ScheduleBook::default();
        let good = book.add("Auto Save", 30, at(8, 0)).unwrap();
        let mut huge = good.clone();
        huge.id = "save_huge".to_string();
        huge.interval_min = u64::MAX;
        let mut zero = good.clone();
        zero.id = "save_zero".to_string();
        zero.interval_min = 0;

        let restored = ScheduleBook::restore(vec![good.clone(), huge, zero], at(14, 0));
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.list()[0].id, good.id);
    }

    #[test]
    fn labels() {
        assert_eq!(schedule_label("Nightly Full Sweep"), "nightly_full_sweep");
    }
}
