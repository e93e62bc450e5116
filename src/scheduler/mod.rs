//! Cooperative single-threaded scheduler (spec.md §4.F).
//!
//! One dedicated thread owns the timer loop: compute `next = cron.next_after(now)`,
//! sleep (cancellably) until `next`, invoke the pipeline, swallow any error
//! into the run's own result, recompute `next` from `now()` *after* the
//! pipeline returns, and loop. `stop()` only takes effect at the inter-fire
//! wait — an in-flight run always completes naturally.

pub mod cron;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::clock::Clock;
use crate::error::BackupError;
use crate::model::BackupResult;
use cron::CronSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl From<u8> for SchedulerState {
    fn from(v: u8) -> Self {
        match v {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }
}

struct WaitGate {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl WaitGate {
    fn new() -> Self {
        Self {
            mutex: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Block until either `deadline` elapses or [`WaitGate::cancel`] is called.
    /// Returns `true` if cancelled.
    fn wait_until(&self, deadline: DateTime<Utc>, clock: &dyn Clock) -> bool {
        let mut cancelled = self.mutex.lock().unwrap();
        loop {
            if *cancelled {
                return true;
            }
            let now = clock.now();
            if now >= deadline {
                return false;
            }
            let remaining = (deadline - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_millis(0));
            let (guard, timeout) = self
                .condvar
                .wait_timeout(cancelled, remaining.min(std::time::Duration::from_secs(1)))
                .unwrap();
            cancelled = guard;
            if timeout.timed_out() && !*cancelled {
                continue;
            }
        }
    }

    fn cancel(&self) {
        let mut cancelled = self.mutex.lock().unwrap();
        *cancelled = true;
        self.condvar.notify_all();
    }
}

/// Callback invoked once per scheduled fire. Returns the run's result; errors
/// are swallowed by the scheduler and recorded, never propagated.
pub type PipelineFn = Box<dyn FnMut() -> BackupResult + Send>;

/// Owns the cron schedule, the single worker slot, and the background
/// thread. Never invokes the pipeline re-entrantly — `start()` spawns
/// exactly one thread and the loop body never runs two pipeline executions
/// concurrently.
pub struct Scheduler {
    cron: CronSchedule,
    tz: Tz,
    state: Arc<AtomicU8>,
    gate: Arc<WaitGate>,
    termination: Arc<WaitGate>,
    handle: Mutex<Option<JoinHandle<()>>>,
    clock: Arc<dyn Clock>,
    history: Arc<Mutex<Vec<BackupResult>>>,
}

impl Scheduler {
    pub fn new(cron_expr: &str, tz: Tz, clock: Arc<dyn Clock>) -> Result<Self, BackupError> {
        let cron = CronSchedule::parse(cron_expr)?;
        Ok(Self {
            cron,
            tz,
            state: Arc::new(AtomicU8::new(SchedulerState::Idle as u8)),
            gate: Arc::new(WaitGate::new()),
            termination: Arc::new(WaitGate::new()),
            handle: Mutex::new(None),
            clock,
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn cron_source(&self) -> &str {
        self.cron.source()
    }

    /// Results recorded so far, most recent last.
    pub fn history(&self) -> Vec<BackupResult> {
        self.history.lock().unwrap().clone()
    }

    /// Transition `Idle -> Running`, spawning the timer thread. Idempotent
    /// while already running (per spec.md §8's "Scheduler idempotence").
    pub fn start(&self, mut pipeline: PipelineFn) -> Result<(), BackupError> {
        if self.state() == SchedulerState::Running {
            return Ok(());
        }
        self.state.store(SchedulerState::Running as u8, Ordering::SeqCst);

        let cron = self.cron.clone();
        let tz = self.tz;
        let state = self.state.clone();
        let gate = self.gate.clone();
        let termination = self.termination.clone();
        let clock = self.clock.clone();
        let history = self.history.clone();

        let handle = std::thread::Builder::new()
            .name("db-backup4j-scheduler".into())
            .spawn(move || {
                loop {
                    if SchedulerState::from(state.load(Ordering::SeqCst)) != SchedulerState::Running
                    {
                        break;
                    }

                    let now_utc = clock.now();
                    let now_tz = now_utc.with_timezone(&tz);
                    let Some(next_tz) = cron.next_after(now_tz) else {
                        state.store(SchedulerState::Stopped as u8, Ordering::SeqCst);
                        break;
                    };
                    let next_utc = next_tz.with_timezone(&chrono::Utc);

                    let cancelled = gate.wait_until(next_utc, clock.as_ref());
                    if cancelled
                        || SchedulerState::from(state.load(Ordering::SeqCst))
                            != SchedulerState::Running
                    {
                        break;
                    }

                    let result = pipeline();
                    history.lock().unwrap().push(result);
                    // next iteration recomputes `next` from `now()` *after* this
                    // run returns, per spec.md §4.F's ordering guarantee.
                }
                state.store(SchedulerState::Stopped as u8, Ordering::SeqCst);
                termination.cancel();
            })
            .expect("failed to spawn scheduler thread");

        *self.handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Cancel the pending timer. If invoked mid-run, the run completes
    /// naturally and the loop observes the stopped flag afterward.
    /// Idempotent.
    pub fn stop(&self) {
        if self.state() == SchedulerState::Stopped {
            return;
        }
        self.state.store(SchedulerState::Stopped as u8, Ordering::SeqCst);
        self.gate.cancel();
    }

    /// Block until the scheduler reaches `Stopped`.
    pub fn await_termination(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{BackupResult, BackupStatus};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn empty_result() -> BackupResult {
        BackupResult {
            backup_id: "test".into(),
            status: BackupStatus::Success,
            started_at: now(),
            ended_at: now(),
            artifacts: vec![],
            errors: vec![],
            validations: vec![],
        }
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let clock = Arc::new(FixedClock::new(now()));
        let scheduler =
            Scheduler::new("* * * * *", chrono_tz::UTC, clock.clone() as Arc<dyn Clock>).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = count.clone();
        scheduler
            .start(Box::new(move || {
                c1.fetch_add(1, Ordering::SeqCst);
                empty_result()
            }))
            .unwrap();
        // second start() while running is a no-op, not a second thread.
        scheduler
            .start(Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
                empty_result()
            }))
            .unwrap();
        scheduler.stop();
        scheduler.await_termination();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn stop_is_idempotent() {
        let clock = Arc::new(FixedClock::new(now()));
        let scheduler =
            Scheduler::new("* * * * *", chrono_tz::UTC, clock as Arc<dyn Clock>).unwrap();
        scheduler.start(Box::new(empty_result)).unwrap();
        scheduler.stop();
        scheduler.stop();
        scheduler.await_termination();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn rejects_unparseable_cron_at_construction() {
        let clock = Arc::new(FixedClock::new(now()));
        let result = Scheduler::new("garbage", chrono_tz::UTC, clock as Arc<dyn Clock>);
        assert!(result.is_err());
    }

    #[test]
    fn fires_when_clock_is_advanced_past_deadline() {
        // The fixed clock starts exactly at the boundary, so the first fire
        // is due immediately once the thread computes next_after.
        let clock = Arc::new(FixedClock::new(now()));
        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let scheduler = Scheduler::new("* * * * *", chrono_tz::UTC, clock_dyn).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();

        scheduler
            .start(Box::new(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
                empty_result()
            }))
            .unwrap();

        // advance the clock past the first minute boundary from another thread
        // while the scheduler thread is sleeping on the condvar.
        for _ in 0..50 {
            clock.advance(chrono::Duration::seconds(2));
            std::thread::sleep(StdDuration::from_millis(20));
            if fired.load(Ordering::SeqCst) > 0 {
                break;
            }
        }

        scheduler.stop();
        scheduler.await_termination();
        assert!(fired.load(Ordering::SeqCst) >= 1);
    }
}
