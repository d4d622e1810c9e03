use std::future::Future;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use derive_new::new;
use tracing::instrument;

/// A fixed weekday and local time of day, e.g. every Monday at 09:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct WeeklyTrigger {
    pub weekday: Weekday,
    pub at: NaiveTime,
}

impl WeeklyTrigger {
    /// The first occurrence strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let days_ahead = (self.weekday.num_days_from_monday() + 7
            - now.weekday().num_days_from_monday())
            % 7;

        let candidate = (now.date() + TimeDelta::days(days_ahead as i64)).and_time(self.at);
        if candidate > now {
            candidate
        } else {
            candidate + TimeDelta::weeks(1)
        }
    }
}

/// Tracks the next occurrence of a [WeeklyTrigger] and fires at most once for it.
#[derive(Debug, Clone)]
pub struct Schedule {
    trigger: WeeklyTrigger,
    next_run: NaiveDateTime,
}

impl Schedule {
    pub fn new(trigger: WeeklyTrigger, now: NaiveDateTime) -> Self {
        Self {
            trigger,
            next_run: trigger.next_after(now),
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    /// True once the pending occurrence is due. Occurrences missed while the process was busy collapse into one.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_run {
            return false;
        }

        self.next_run = self.trigger.next_after(now);
        true
    }
}

/// Runs `job` now, then every time the trigger comes due, checking the local clock every `poll_interval`.
///
/// Never returns. A job that overruns the poll interval delays the following checks instead of queuing them.
pub async fn run_weekly<F, Fut>(trigger: WeeklyTrigger, poll_interval: Duration, job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    run_weekly_on(trigger, poll_interval, || Local::now().naive_local(), job).await
}

/// [run_weekly] against the wall time given by `clock`.
#[instrument(skip(clock, job))]
pub async fn run_weekly_on<C, F, Fut>(
    trigger: WeeklyTrigger, poll_interval: Duration, mut clock: C, mut job: F,
) where
    C: FnMut() -> NaiveDateTime,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut schedule = Schedule::new(trigger, clock());

    tracing::info!("running the first update now");
    job().await;
    tracing::info!(next_run = %schedule.next_run(), "waiting for the next scheduled update");

    let mut timer = tokio::time::interval(poll_interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        timer.tick().await;

        if schedule.poll(clock()) {
            tracing::info!("running scheduled update");
            job().await;
            tracing::info!(next_run = %schedule.next_run(), "waiting for the next scheduled update");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use tokio::time::Instant;

    use super::*;

    fn monday_nine() -> WeeklyTrigger {
        WeeklyTrigger::new(Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap())
    }

    /// 2024-03-04 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn later_the_same_day() {
        assert_eq!(monday_nine().next_after(at(4, 8, 0)), at(4, 9, 0));
    }

    #[test]
    fn exactly_on_time_waits_a_week() {
        assert_eq!(monday_nine().next_after(at(4, 9, 0)), at(11, 9, 0));
    }

    #[test]
    fn later_in_the_week() {
        assert_eq!(monday_nine().next_after(at(6, 15, 30)), at(11, 9, 0));

        let friday = WeeklyTrigger::new(Weekday::Fri, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
        assert_eq!(friday.next_after(at(5, 12, 0)), at(8, 17, 30));
    }

    #[test]
    fn fires_once_per_occurrence() {
        let mut schedule = Schedule::new(monday_nine(), at(3, 12, 0));
        assert_eq!(schedule.next_run(), at(4, 9, 0));

        assert!(!schedule.poll(at(4, 8, 59)));
        assert!(schedule.poll(at(4, 9, 0)));
        assert!(!schedule.poll(at(4, 9, 1)));
        assert_eq!(schedule.next_run(), at(11, 9, 0));
    }

    #[test]
    fn missed_occurrences_fire_once() {
        let mut schedule = Schedule::new(monday_nine(), at(3, 12, 0));

        assert!(schedule.poll(at(13, 10, 0)));
        assert!(!schedule.poll(at(13, 10, 1)));
        assert_eq!(schedule.next_run(), at(18, 9, 0));
    }

    /// Runs the loop for `run_for` of paused tokio time, starting Monday 08:00, and counts the jobs.
    async fn jobs_within(run_for: Duration) -> usize {
        let runs = AtomicUsize::new(0);
        let start = Instant::now();
        let clock = || at(4, 8, 0) + TimeDelta::from_std(start.elapsed()).unwrap();

        let looping = run_weekly_on(monday_nine(), Duration::from_secs(60), clock, || {
            runs.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        });
        assert!(tokio::time::timeout(run_for, looping).await.is_err());

        runs.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_at_start_then_waits_for_the_trigger() {
        assert_eq!(jobs_within(Duration::from_secs(30 * 60)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_again_when_the_trigger_is_due() {
        assert_eq!(jobs_within(Duration::from_secs(2 * 60 * 60)).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_week() {
        let eight_days = Duration::from_secs(8 * 24 * 60 * 60);
        assert_eq!(jobs_within(eight_days).await, 3);
    }
}
