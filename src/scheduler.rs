use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::RunConfig;
use crate::cycle::{run_cycle, sleep_while_running};
use crate::input::{Clicker, ScreenClicker};
use crate::positions::Positions;

/// Granularity of the rest-period and countdown waits.
const REST_POLL: Duration = Duration::from_secs(1);

/// Start countdown plus the work/rest duty cycle: after `work` of continuous
/// operation the scheduler finishes the in-flight cycle and pauses for
/// `rest` before carrying on.
#[derive(Clone, Copy, Debug)]
pub struct Cadence {
    pub countdown: Duration,
    pub work: Duration,
    pub rest: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(3),
            work: Duration::from_secs(30 * 60),
            rest: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Countdown,
    Entering,
    Playing,
    Returning,
    Resting,
    /// Reached the configured cycle limit.
    Finished,
    /// Stopped on request.
    Stopped,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Countdown => "starting",
            Phase::Entering => "entering",
            Phase::Playing => "playing",
            Phase::Returning => "returning",
            Phase::Resting => "resting",
            Phase::Finished => "finished",
            Phase::Stopped => "stopped",
        }
    }
}

/// Live scheduler state. Written only by the worker thread; everyone else
/// reads snapshots.
#[derive(Clone, Copy, Debug)]
pub struct Status {
    pub phase: Phase,
    pub loop_count: u32,
    pub work_started: Option<Instant>,
}

impl Status {
    /// Time spent in the current work period.
    pub fn elapsed_work(&self) -> Duration {
        self.work_started.map(|t| t.elapsed()).unwrap_or_default()
    }
}

pub struct StatusCell(Mutex<Status>);

impl StatusCell {
    pub fn new() -> Self {
        Self(Mutex::new(Status {
            phase: Phase::Idle,
            loop_count: 0,
            work_started: None,
        }))
    }

    pub fn snapshot(&self) -> Status {
        *self.0.lock()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.0.lock().phase = phase;
    }

    pub(crate) fn begin_cycle(&self) -> u32 {
        let mut status = self.0.lock();
        status.loop_count += 1;
        status.loop_count
    }

    pub(crate) fn reset_work_clock(&self) {
        self.0.lock().work_started = Some(Instant::now());
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the background automation thread. The run flag it owns is the
/// only value written across threads; dropping the handle does not stop the
/// run, `stop` does.
pub struct SessionJob {
    running: Arc<AtomicBool>,
    status: Arc<StatusCell>,
    handle: Option<JoinHandle<()>>,
}

impl SessionJob {
    pub fn spawn(config: RunConfig, positions: Positions, cadence: Cadence) -> Self {
        Self::spawn_with(config, positions, cadence, ScreenClicker)
    }

    /// Like `spawn`, but with a caller-supplied clicker.
    pub fn spawn_with<C>(
        config: RunConfig,
        positions: Positions,
        cadence: Cadence,
        clicker: C,
    ) -> Self
    where
        C: Clicker + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let status = Arc::new(StatusCell::new());
        let handle = {
            let running = Arc::clone(&running);
            let status = Arc::clone(&status);
            thread::spawn(move || control_loop(config, positions, cadence, running, status, clicker))
        };
        Self {
            running,
            status,
            handle: Some(handle),
        }
    }

    /// Requests a stop. Takes effect at the worker's next check point, at
    /// most about a second later.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn status(&self) -> Status {
        self.status.snapshot()
    }

    /// True until the worker thread has exited.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Blocks until the worker thread exits and returns the final state.
    pub fn wait(mut self) -> Status {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.status.snapshot()
    }
}

fn control_loop<C: Clicker>(
    config: RunConfig,
    positions: Positions,
    cadence: Cadence,
    running: Arc<AtomicBool>,
    status: Arc<StatusCell>,
    mut clicker: C,
) {
    let mut rng = rand::thread_rng();

    // Give the user time to bring the game window to the front.
    status.set_phase(Phase::Countdown);
    if !sleep_while_running(cadence.countdown, REST_POLL, &running) {
        status.set_phase(Phase::Stopped);
        return;
    }
    status.reset_work_clock();
    log::info!("automation started");

    loop {
        if !running.load(Ordering::Relaxed) {
            let done = status.snapshot().loop_count;
            status.set_phase(Phase::Stopped);
            log::info!("stopped on request after {done} cycles");
            return;
        }
        let done = status.snapshot().loop_count;
        if config.max_loops > 0 && done >= config.max_loops {
            status.set_phase(Phase::Finished);
            log::info!("completed {done} cycles");
            return;
        }

        // Decided before the cycle so the rest boundary never cuts one
        // short: when the work period is up, one more full cycle runs, then
        // the pause.
        let rest_due = status.snapshot().elapsed_work() >= cadence.work;

        let round = status.begin_cycle();
        log::info!("cycle {round} starting");
        run_cycle(&config, &positions, &running, &status, &mut clicker, &mut rng);

        if rest_due && running.load(Ordering::Relaxed) {
            log::info!("work period over; resting for {:?}", cadence.rest);
            status.set_phase(Phase::Resting);
            sleep_while_running(cadence.rest, REST_POLL, &running);
            status.reset_work_clock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::test_support::FakeClicker;
    use crate::positions::{Point, RawPositions, Variant};

    fn test_positions() -> Positions {
        Positions::from_raw(
            RawPositions {
                enter_steps: (0..7).map(|i| Point::new(10 * i, 20)).collect(),
                track_left: Point::new(0, 100),
                track_right: Point::new(30, 100),
                return_pos: Point::new(999, 888),
            },
            Variant::Standard,
        )
        .unwrap()
    }

    /// All waits zeroed and the play phase skipped, so one cycle is exactly
    /// 7 enter clicks followed by 10 return clicks.
    fn fast_config() -> RunConfig {
        RunConfig {
            click_interval_enter: 0.0,
            load_time_before_game: 0.0,
            game_duration: 0.0,
            load_time_after_game: 0.0,
            click_interval_return: 0.0,
            click_interval_in_game: 0.0,
            click_jitter: 0,
            time_jitter: 0.0,
            max_loops: 0,
        }
    }

    fn fast_cadence() -> Cadence {
        Cadence {
            countdown: Duration::ZERO,
            work: Duration::from_secs(3600),
            rest: Duration::from_millis(50),
        }
    }

    const CYCLE_CLICKS: usize = 7 + 10;

    #[test]
    fn stops_exactly_at_max_loops() {
        let clicker = FakeClicker::default();
        let clicks = Arc::clone(&clicker.clicks);
        let mut config = fast_config();
        config.max_loops = 3;

        let job = SessionJob::spawn_with(config, test_positions(), fast_cadence(), clicker);
        let status = job.wait();

        assert_eq!(status.phase, Phase::Finished);
        assert_eq!(status.loop_count, 3);
        let clicks = clicks.lock();
        assert_eq!(clicks.len(), 3 * CYCLE_CLICKS);
        assert_eq!(
            clicks.iter().filter(|p| **p == Point::new(999, 888)).count(),
            30
        );
    }

    #[test]
    fn rest_waits_for_the_cycle_to_finish() {
        let positions = test_positions();
        let clicker = FakeClicker::default();
        let clicks = Arc::clone(&clicker.clicks);
        let mut config = fast_config();
        config.max_loops = 2;
        let cadence = Cadence {
            countdown: Duration::ZERO,
            // Work period expires immediately, so every cycle runs with the
            // rest boundary already due.
            work: Duration::ZERO,
            rest: Duration::from_millis(100),
        };

        let started = Instant::now();
        let job = SessionJob::spawn_with(config, positions.clone(), cadence, clicker);
        let status = job.wait();

        assert_eq!(status.phase, Phase::Finished);
        let clicks = clicks.lock();
        assert_eq!(clicks.len(), 2 * CYCLE_CLICKS);
        // Each cycle ran to completion before the rest kicked in: the click
        // stream is two whole enter-then-return sequences, nothing torn.
        for cycle in clicks.chunks(CYCLE_CLICKS) {
            assert_eq!(&cycle[..7], positions.enter_steps());
            assert!(cycle[7..].iter().all(|p| *p == positions.return_pos()));
        }
        // Both rest periods actually elapsed.
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn stop_during_rest_is_prompt() {
        let clicker = FakeClicker::default();
        let cadence = Cadence {
            countdown: Duration::ZERO,
            work: Duration::ZERO,
            rest: Duration::from_secs(30),
        };

        let job = SessionJob::spawn_with(fast_config(), test_positions(), cadence, clicker);
        let waiting = Instant::now();
        while job.status().phase != Phase::Resting {
            assert!(waiting.elapsed() < Duration::from_secs(5), "never rested");
            thread::sleep(Duration::from_millis(5));
        }

        let stopped_at = Instant::now();
        job.stop();
        let status = job.wait();
        // Rest is polled at one-second granularity.
        assert!(stopped_at.elapsed() < Duration::from_secs(2));
        assert_eq!(status.phase, Phase::Stopped);
    }

    #[test]
    fn stop_during_countdown_never_clicks() {
        let clicker = FakeClicker::default();
        let clicks = Arc::clone(&clicker.clicks);
        let cadence = Cadence {
            countdown: Duration::from_secs(10),
            ..fast_cadence()
        };

        let job = SessionJob::spawn_with(fast_config(), test_positions(), cadence, clicker);
        job.stop();
        let stopped_at = Instant::now();
        let status = job.wait();

        assert!(stopped_at.elapsed() < Duration::from_secs(2));
        assert_eq!(status.phase, Phase::Stopped);
        assert_eq!(status.loop_count, 0);
        assert!(clicks.lock().is_empty());
    }

    #[test]
    fn restart_resets_the_counter() {
        let mut config = fast_config();
        config.max_loops = 1;

        let first = SessionJob::spawn_with(
            config.clone(),
            test_positions(),
            fast_cadence(),
            FakeClicker::default(),
        );
        assert_eq!(first.wait().loop_count, 1);

        let second = SessionJob::spawn_with(
            config,
            test_positions(),
            fast_cadence(),
            FakeClicker::default(),
        );
        let status = second.wait();
        assert_eq!(status.loop_count, 1);
        assert_eq!(status.phase, Phase::Finished);
    }
}
