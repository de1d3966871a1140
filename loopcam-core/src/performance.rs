//! Frame-rate and delivery metrics
//!
//! Provides:
//! - Rolling averages of frame intervals and conversion time
//! - Frame counters (sent, partially delivered)
//! - A [`SessionStats`] snapshot including per-sink counters

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::output::SinkStats;

/// Maximum number of samples to keep for rolling averages
const MAX_SAMPLES: usize = 120;

/// Rolling average calculator for timing data
#[derive(Debug)]
pub(crate) struct RollingAverage {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl RollingAverage {
    pub(crate) fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub(crate) fn add(&mut self, duration: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    pub(crate) fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    pub(crate) fn average_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }

    /// Rate implied by the average interval, 0 with no samples
    pub(crate) fn rate(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }

    pub(crate) fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Session statistics snapshot
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Frames accepted by `send()`
    pub frames_sent: u64,
    /// Frames where at least one sink failed
    pub frames_partial: u64,
    /// Conversions performed
    pub conversions: u64,
    /// Average conversion time in milliseconds
    pub conversion_ms: f64,
    /// Measured frames per second
    pub fps: f64,
    /// Per-sink counters, in device order
    pub sinks: Vec<SinkStats>,
    /// Time since the session opened
    pub uptime: Duration,
}

impl SessionStats {
    /// Format stats as a single-line string for logging
    pub fn format_line(&self) -> String {
        let errors: u64 = self.sinks.iter().map(|s| s.write_errors).sum();
        format!(
            "{:.1}fps | sent: {} | partial: {} | convert: {:.2}ms | sinks: {} | write errors: {}",
            self.fps,
            self.frames_sent,
            self.frames_partial,
            self.conversion_ms,
            self.sinks.len(),
            errors
        )
    }
}

/// Metrics collector owned by a session
#[derive(Debug)]
pub struct SessionMetrics {
    conversion_times: RollingAverage,
    frames_sent: u64,
    frames_partial: u64,
    start_time: Instant,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    /// Create a new collector
    pub fn new() -> Self {
        Self {
            conversion_times: RollingAverage::new(MAX_SAMPLES),
            frames_sent: 0,
            frames_partial: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a delivered frame
    pub fn record_frame(&mut self, conversion: Duration, partial: bool) {
        self.conversion_times.add(conversion);
        self.frames_sent += 1;
        if partial {
            self.frames_partial += 1;
        }
    }

    /// Frames accepted so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Frames where some sink failed
    pub fn frames_partial(&self) -> u64 {
        self.frames_partial
    }

    /// Build a snapshot
    pub fn snapshot(&self, conversions: u64, fps: f64, sinks: Vec<SinkStats>) -> SessionStats {
        SessionStats {
            frames_sent: self.frames_sent,
            frames_partial: self.frames_partial,
            conversions,
            conversion_ms: self.conversion_times.average_ms(),
            fps,
            sinks,
            uptime: self.start_time.elapsed(),
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.conversion_times.clear();
        self.frames_sent = 0;
        self.frames_partial = 0;
        self.start_time = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average() {
        let mut avg = RollingAverage::new(3);
        avg.add(Duration::from_millis(10));
        avg.add(Duration::from_millis(20));
        avg.add(Duration::from_millis(30));

        // Average of 10, 20, 30 = 20
        assert!((avg.average_ms() - 20.0).abs() < 0.1);

        // Add one more, should drop oldest
        avg.add(Duration::from_millis(40));
        assert!((avg.average_ms() - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_rate() {
        let mut avg = RollingAverage::new(4);
        assert_eq!(avg.rate(), 0.0);
        avg.add(Duration::from_millis(50));
        assert!((avg.rate() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_partial_frames() {
        let mut metrics = SessionMetrics::new();
        metrics.record_frame(Duration::from_millis(1), false);
        metrics.record_frame(Duration::from_millis(3), true);

        let stats = metrics.snapshot(2, 20.0, Vec::new());
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.frames_partial, 1);
        assert!((stats.conversion_ms - 2.0).abs() < 0.1);

        metrics.reset();
        assert_eq!(metrics.frames_sent(), 0);
    }

    #[test]
    fn test_stats_formatting() {
        let stats = SessionStats {
            frames_sent: 600,
            frames_partial: 3,
            conversions: 600,
            conversion_ms: 1.25,
            fps: 20.0,
            sinks: vec![SinkStats {
                device: "/dev/video0".into(),
                frames_written: 597,
                write_errors: 3,
                last_error: None,
            }],
            uptime: Duration::from_secs(30),
        };

        let line = stats.format_line();
        assert!(line.contains("20.0fps"));
        assert!(line.contains("partial: 3"));
        assert!(line.contains("write errors: 3"));
    }
}
