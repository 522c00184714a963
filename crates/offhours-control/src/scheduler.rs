//! Daily trigger loop.
//!
//! The scheduler polls the clock on a fixed interval and fires the stop or
//! start callback when the local hour and minute match the configured
//! trigger time. Each trigger fires at most once per calendar date for the
//! lifetime of the process; nothing about firing is persisted, so a restart
//! inside the trigger minute may fire again. The sequences themselves are
//! idempotent, which makes that harmless.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use offhours_core::ScheduleConfig;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::lifecycle::Trigger;
use crate::shutdown::Shutdown;

/// Remembers which triggers already fired on which date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiredGuard {
    last_stop: Option<NaiveDate>,
    last_start: Option<NaiveDate>,
}

impl FiredGuard {
    /// Create a guard with nothing fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a trigger is due at `now` (schedule-local time).
    ///
    /// A returned trigger is marked fired for `now`'s date before it is
    /// handed back.
    pub fn due(&mut self, schedule: &ScheduleConfig, now: NaiveDateTime) -> Option<Trigger> {
        let date = now.date();
        let time = now.time();

        if schedule.stop_time().matches(time) && self.last_stop != Some(date) {
            self.last_stop = Some(date);
            return Some(Trigger::Stop);
        }
        if schedule.start_time().matches(time) && self.last_start != Some(date) {
            self.last_start = Some(date);
            return Some(Trigger::Start);
        }
        None
    }
}

/// The polling loop that fires daily stop and start triggers.
pub struct Scheduler {
    schedule: ScheduleConfig,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
    shutdown: Shutdown,
}

impl Scheduler {
    /// Create a scheduler on the system clock.
    #[must_use]
    pub fn new(schedule: ScheduleConfig, poll_interval: Duration, shutdown: Shutdown) -> Self {
        Self {
            schedule,
            poll_interval,
            clock: Arc::new(SystemClock),
            shutdown,
        }
    }

    /// Read the time from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run until shutdown is requested.
    ///
    /// Callbacks run inline, so a tick never overlaps a running sequence.
    /// A failing callback is logged and the loop continues.
    pub async fn run<Stop, StopFut, Start, StartFut, E>(&self, mut on_stop: Stop, mut on_start: Start)
    where
        Stop: FnMut() -> StopFut,
        StopFut: Future<Output = Result<(), E>>,
        Start: FnMut() -> StartFut,
        StartFut: Future<Output = Result<(), E>>,
        E: Display,
    {
        info!(
            stop = %self.schedule.stop_time(),
            start = %self.schedule.start_time(),
            timezone = %self.schedule.timezone(),
            poll_secs = self.poll_interval.as_secs(),
            "Scheduler started"
        );

        let mut guard = FiredGuard::new();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.requested() => {
                    info!("Shutdown requested, scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let now = self.schedule.timezone().localize(self.clock.now());
            let Some(trigger) = guard.due(&self.schedule, now) else {
                debug!(at = %now, "Tick");
                continue;
            };

            info!(trigger = %trigger, at = %now, "Trigger fired");
            let result = match trigger {
                Trigger::Stop => on_stop().await,
                Trigger::Start => on_start().await,
            };
            if let Err(e) = result {
                error!(trigger = %trigger, error = %e, "Triggered sequence failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::shutdown;
    use chrono::{TimeDelta, TimeZone, Utc};
    use offhours_core::{ScheduleTimezone, TimeOfDay};
    use parking_lot::Mutex;

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn guard_fires_once_per_date() {
        let schedule = ScheduleConfig::default();
        let mut guard = FiredGuard::new();

        assert_eq!(guard.due(&schedule, at(4, 14, 44, 59)), None);
        assert_eq!(guard.due(&schedule, at(4, 14, 45, 0)), Some(Trigger::Stop));
        assert_eq!(guard.due(&schedule, at(4, 14, 45, 40)), None);
        assert_eq!(guard.due(&schedule, at(5, 8, 0, 10)), Some(Trigger::Start));
        assert_eq!(guard.due(&schedule, at(5, 8, 0, 50)), None);
        assert_eq!(guard.due(&schedule, at(5, 14, 45, 0)), Some(Trigger::Stop));
    }

    #[test]
    fn guard_tracks_triggers_independently() {
        let schedule = ScheduleConfig::default();
        let mut guard = FiredGuard::new();

        assert_eq!(guard.due(&schedule, at(4, 8, 0, 0)), Some(Trigger::Start));
        assert_eq!(guard.due(&schedule, at(4, 14, 45, 0)), Some(Trigger::Stop));
    }

    #[test]
    fn guard_ignores_other_minutes() {
        let schedule = ScheduleConfig::new(
            TimeOfDay::new(19, 0).unwrap(),
            TimeOfDay::new(7, 30).unwrap(),
            ScheduleTimezone::Utc,
        )
        .unwrap();
        let mut guard = FiredGuard::new();

        for minute in 0..60 {
            let now = at(4, 12, minute, 0);
            assert_eq!(guard.due(&schedule, now), None, "unexpected trigger at {now}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_stop_then_start_across_a_day() {
        let (trigger, shutdown) = shutdown::channel();
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 44, 0).unwrap();
        let clock = Arc::new(ManualClock::stepping(start, TimeDelta::seconds(30)));
        let scheduler = Scheduler::new(ScheduleConfig::default(), Duration::from_secs(60), shutdown)
            .with_clock(clock);

        let fired = Mutex::new(Vec::new());
        let fired_ref = &fired;
        let trigger_ref = &trigger;

        scheduler
            .run(
                || async move {
                    fired_ref.lock().push(Trigger::Stop);
                    Ok::<(), String>(())
                },
                || async move {
                    fired_ref.lock().push(Trigger::Start);
                    trigger_ref.request();
                    Ok(())
                },
            )
            .await;

        assert_eq!(*fired.lock(), vec![Trigger::Stop, Trigger::Start]);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_failure_keeps_loop_running() {
        let (trigger, shutdown) = shutdown::channel();
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 7, 58, 0).unwrap();
        let clock = Arc::new(ManualClock::stepping(start, TimeDelta::minutes(1)));
        let schedule = ScheduleConfig::new(
            TimeOfDay::new(7, 59).unwrap(),
            TimeOfDay::new(8, 0).unwrap(),
            ScheduleTimezone::Utc,
        )
        .unwrap();
        let scheduler =
            Scheduler::new(schedule, Duration::from_secs(60), shutdown).with_clock(clock);

        let fired = Mutex::new(Vec::new());
        let fired_ref = &fired;
        let trigger_ref = &trigger;

        scheduler
            .run(
                || async move {
                    fired_ref.lock().push(Trigger::Stop);
                    Err("list workloads failed".to_string())
                },
                || async move {
                    fired_ref.lock().push(Trigger::Start);
                    trigger_ref.request();
                    Ok(())
                },
            )
            .await;

        assert_eq!(*fired.lock(), vec![Trigger::Stop, Trigger::Start]);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_already_shut_down() {
        let (trigger, shutdown) = shutdown::channel();
        trigger.request();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 14, 45, 0).unwrap(),
        ));
        let scheduler = Scheduler::new(ScheduleConfig::default(), Duration::from_secs(60), shutdown)
            .with_clock(clock);

        let fired = Mutex::new(0);
        let fired_ref = &fired;

        scheduler
            .run(
                || async move {
                    *fired_ref.lock() += 1;
                    Ok::<(), String>(())
                },
                || async move {
                    *fired_ref.lock() += 1;
                    Ok(())
                },
            )
            .await;

        assert_eq!(*fired.lock(), 0);
    }
}
