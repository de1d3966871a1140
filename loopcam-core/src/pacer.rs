//! Frame pacing
//!
//! Keeps a producer loop at the target frame rate by sleeping off whatever
//! is left of the frame interval. Uses `Instant` only, so wall-clock jumps
//! have no effect.

use std::time::{Duration, Instant};
use tracing::info;

use crate::performance::RollingAverage;
use crate::types::FrameRate;

/// Samples used for the measured frame rate
const FPS_WINDOW: usize = 60;

/// How often the measured rate is logged when enabled
const FPS_LOG_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacerState {
    /// No frame seen yet
    Idle,
    /// Baseline recorded
    Armed { last: Instant },
}

/// Sleeps between frames to hold a target rate
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    state: PacerState,
    frame_times: RollingAverage,
    log_fps: bool,
    last_log: Option<Instant>,
}

impl FramePacer {
    /// Create a pacer for `fps`
    pub fn new(fps: FrameRate) -> Self {
        Self {
            interval: fps.interval(),
            state: PacerState::Idle,
            frame_times: RollingAverage::new(FPS_WINDOW),
            log_fps: false,
            last_log: None,
        }
    }

    /// Log the measured rate about once per second
    pub fn with_fps_logging(mut self, enabled: bool) -> Self {
        self.log_fps = enabled;
        self
    }

    /// Block until the next frame is due
    ///
    /// The first call only records a baseline and returns at once. After
    /// that, sleeps `interval - elapsed` when the caller is early and returns
    /// immediately when it is late, without trying to catch up. Returns the
    /// time actually slept.
    pub fn sleep_until_next_frame(&mut self) -> Duration {
        let now = Instant::now();

        let last = match self.state {
            PacerState::Idle => {
                self.state = PacerState::Armed { last: now };
                return Duration::ZERO;
            }
            PacerState::Armed { last } => last,
        };

        let elapsed = now.duration_since(last);
        let remaining = self.interval.saturating_sub(elapsed);
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }

        let next = now + remaining;
        self.frame_times.add(next.duration_since(last));
        self.state = PacerState::Armed { last: next };
        self.maybe_log(next);

        remaining
    }

    fn maybe_log(&mut self, now: Instant) {
        if !self.log_fps {
            return;
        }
        match self.last_log {
            Some(at) if now.duration_since(at) < FPS_LOG_PERIOD => {}
            _ => {
                info!("{:.1} fps", self.current_fps());
                self.last_log = Some(now);
            }
        }
    }

    /// Rate measured over recent frames, 0 before two frames
    pub fn current_fps(&self) -> f64 {
        self.frame_times.rate()
    }

    /// Target frame interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a baseline has been recorded
    pub fn is_armed(&self) -> bool {
        matches!(self.state, PacerState::Armed { .. })
    }

    /// Forget the baseline and measurements
    pub fn reset(&mut self) {
        self.state = PacerState::Idle;
        self.frame_times.clear();
        self.last_log = None;
    }
}
