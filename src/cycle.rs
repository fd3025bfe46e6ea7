use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;

use crate::config::RunConfig;
use crate::input::{jittered, Clicker};
use crate::positions::Positions;
use crate::scheduler::{Phase, StatusCell};

/// Spacing between the clicks of one rapid-fire track sweep.
const SWEEP_SPACING: Duration = Duration::from_millis(1);
/// Floor for the randomized pause between sweeps.
const MIN_SWEEP_PAUSE: Duration = Duration::from_millis(1);
/// How often long waits re-check the run flag.
const CANCEL_POLL: Duration = Duration::from_millis(50);
/// The results screen settles at an unpredictable moment, so the return
/// button is pressed this many times.
const RETURN_CLICKS: u32 = 10;
/// Pause after a faulted cycle before the next one is attempted.
const FAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Sleeps in short segments so a stop request is honored promptly. Returns
/// false if the run was stopped before the full duration elapsed.
pub(crate) fn sleep_while_running(
    total: Duration,
    segment: Duration,
    running: &AtomicBool,
) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(segment));
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

/// Runs one enter-play-return cycle. A fault inside the cycle is logged and
/// followed by a short cooldown; it never propagates, so the scheduler can
/// move on to the next cycle.
pub fn run_cycle<C: Clicker, R: Rng>(
    config: &RunConfig,
    positions: &Positions,
    running: &AtomicBool,
    status: &StatusCell,
    clicker: &mut C,
    rng: &mut R,
) {
    if let Err(err) = execute(config, positions, running, status, clicker, rng) {
        log::warn!("cycle failed: {err:#}");
        sleep_while_running(FAULT_COOLDOWN, CANCEL_POLL, running);
    }
}

fn execute<C: Clicker, R: Rng>(
    config: &RunConfig,
    positions: &Positions,
    running: &AtomicBool,
    status: &StatusCell,
    clicker: &mut C,
    rng: &mut R,
) -> Result<()> {
    // Enter flow: walk the recorded menu clicks, then sit out the loading
    // screen.
    status.set_phase(Phase::Entering);
    let enter_interval = secs(config.click_interval_enter);
    for &step in positions.enter_steps() {
        if !running.load(Ordering::Relaxed) {
            return Ok(());
        }
        clicker.click(jittered(step, config.click_jitter, rng))?;
        if !sleep_while_running(enter_interval, CANCEL_POLL, running) {
            return Ok(());
        }
    }
    if !sleep_while_running(secs(config.load_time_before_game), CANCEL_POLL, running) {
        return Ok(());
    }

    // Play: sweep all four tracks in quick succession, pause, repeat until
    // the song runs out. The flag is checked before every click, so a stop
    // lands within one sweep.
    status.set_phase(Phase::Playing);
    let deadline = Instant::now() + secs(config.game_duration);
    while Instant::now() < deadline {
        for &track in positions.tracks() {
            if !running.load(Ordering::Relaxed) {
                return Ok(());
            }
            clicker.click(jittered(track, config.click_jitter, rng))?;
            thread::sleep(SWEEP_SPACING);
        }
        let spread = config.time_jitter.abs();
        let pause = rng.gen_range(
            (config.click_interval_in_game - spread)..=(config.click_interval_in_game + spread),
        );
        thread::sleep(secs(pause).max(MIN_SWEEP_PAUSE));
    }

    // Return: wait out the results screen, then press the return button
    // repeatedly until the menu is back.
    status.set_phase(Phase::Returning);
    if !sleep_while_running(secs(config.load_time_after_game), CANCEL_POLL, running) {
        return Ok(());
    }
    let return_interval = secs(config.click_interval_return);
    for _ in 0..RETURN_CLICKS {
        if !running.load(Ordering::Relaxed) {
            return Ok(());
        }
        clicker.click(jittered(positions.return_pos(), config.click_jitter, rng))?;
        if !sleep_while_running(return_interval, CANCEL_POLL, running) {
            return Ok(());
        }
    }
    sleep_while_running(Duration::from_secs(1), CANCEL_POLL, running);
    Ok(())
}
