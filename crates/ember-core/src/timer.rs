// SPDX-License-Identifier: CEPL-1.0
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Frame pacing and delta-time source for the main loop.
///
/// `tick` is called at the start of a frame and `pace` at its end; `pace`
/// sleeps out whatever is left of the frame budget when a target rate is set.
#[derive(Debug)]
pub struct FrameTimer {
    last_frame: Instant,
    frame_budget: Option<Duration>,
    delta_ms: f32,
    work_ms: f32,
    sleep_ms: f32,
}

impl FrameTimer {
    /// `target_fps == 0` means uncapped.
    pub fn new(target_fps: u32) -> Self {
        let frame_budget =
            (target_fps > 0).then(|| Duration::from_nanos(1_000_000_000u64 / target_fps as u64));
        Self {
            last_frame: Instant::now(),
            frame_budget,
            delta_ms: 0.0,
            work_ms: 0.0,
            sleep_ms: 0.0,
        }
    }

    /// Starts a new frame and returns the time since the previous one, in ms.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_ms = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        trace!(
            work_ms = self.work_ms,
            sleep_ms = self.sleep_ms,
            total_ms = self.work_ms + self.sleep_ms,
            "frame"
        );
        self.delta_ms
    }

    pub fn pace(&mut self) {
        let work = self.last_frame.elapsed();
        self.work_ms = work.as_secs_f32() * 1000.0;
        self.sleep_ms = match self.frame_budget {
            Some(budget) if work < budget => {
                let remaining = budget - work;
                thread::sleep(remaining);
                remaining.as_secs_f32() * 1000.0
            }
            _ => 0.0,
        };
    }

    pub fn frame_budget(&self) -> Option<Duration> {
        self.frame_budget
    }

    pub fn delta_ms(&self) -> f32 {
        self.delta_ms
    }

    pub fn work_ms(&self) -> f32 {
        self.work_ms
    }

    pub fn sleep_ms(&self) -> f32 {
        self.sleep_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_target_is_uncapped() {
        let mut timer = FrameTimer::new(0);
        assert_eq!(timer.frame_budget(), None);
        timer.tick();
        timer.pace();
        assert_eq!(timer.sleep_ms(), 0.0);
    }

    #[test]
    fn budget_follows_target_rate() {
        let timer = FrameTimer::new(50);
        assert_eq!(timer.frame_budget(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn delta_measures_elapsed_time() {
        let mut timer = FrameTimer::new(0);
        timer.tick();
        thread::sleep(Duration::from_millis(5));
        let delta = timer.tick();
        assert!(delta >= 5.0, "delta was {delta}");
        assert_eq!(delta, timer.delta_ms());
    }

    #[test]
    fn pace_fills_the_frame_budget() {
        let mut timer = FrameTimer::new(100);
        timer.tick();
        let start = Instant::now();
        timer.pace();
        assert!(start.elapsed() >= Duration::from_millis(5));
        assert!(timer.sleep_ms() > 0.0);
        assert!(timer.work_ms() + timer.sleep_ms() <= 10.0 + 1.0);
    }
}
