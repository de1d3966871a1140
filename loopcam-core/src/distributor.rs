//! Single-conversion fan-out
//!
//! Converts each frame once and lends the same read-only buffer to every
//! sink, in the order the devices were given.

use std::time::Duration;
use tracing::{trace, warn};

use crate::config::{DeliveryPolicy, WriteMode};
use crate::convert::{ConvertedFrame, FormatConverter};
use crate::error::{LoopcamError, Result};
use crate::output::{SinkHandle, SinkStats};
use crate::types::RawFrame;

/// A sink that did not take a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFailure {
    /// Device identifier
    pub device: String,
    /// Error message
    pub error: String,
}

/// Outcome of distributing one frame
#[derive(Debug, Clone, Default)]
pub struct DistributionReport {
    /// Devices that took the frame, in sink order
    pub delivered: Vec<String>,
    /// Devices that failed, in sink order
    pub failed: Vec<SinkFailure>,
    /// Time spent converting
    pub conversion: Duration,
}

impl DistributionReport {
    /// Number of sinks written to
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Whether every sink took the frame
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Identifiers of the failed devices
    pub fn failed_devices(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.device.clone()).collect()
    }
}

/// Owns the converter and the ordered sinks of a session
#[derive(Debug)]
pub struct FrameDistributor {
    converter: FormatConverter,
    sinks: Vec<SinkHandle>,
    policy: DeliveryPolicy,
    write_mode: WriteMode,
}

impl FrameDistributor {
    /// Create a distributor over already-open sinks
    pub fn new(
        converter: FormatConverter,
        sinks: Vec<SinkHandle>,
        policy: DeliveryPolicy,
        write_mode: WriteMode,
    ) -> Self {
        Self {
            converter,
            sinks,
            policy,
            write_mode,
        }
    }

    /// Convert `raw` once and write it to every sink
    ///
    /// `InvalidFrameSize` is returned before any sink is touched. Sink
    /// failures never stop the remaining writes; they are listed in the
    /// report, and turn into `Delivery` only when the policy is not met.
    pub fn distribute(&mut self, raw: RawFrame<'_>) -> Result<DistributionReport> {
        let Self {
            converter,
            sinks,
            policy,
            write_mode,
        } = self;

        let frame = converter.convert(raw)?;
        let outcomes = match write_mode {
            WriteMode::Parallel if sinks.len() > 1 => write_parallel(sinks, &frame),
            _ => sinks.iter_mut().map(|sink| sink.write(&frame)).collect(),
        };

        let mut report = DistributionReport {
            conversion: converter.last_duration(),
            ..Default::default()
        };
        for (sink, outcome) in sinks.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered.push(sink.device().to_string()),
                Err(e) => {
                    warn!("{}", e);
                    report.failed.push(SinkFailure {
                        device: sink.device().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        trace!(
            "Frame delivered to {}/{} sinks",
            report.delivered.len(),
            report.attempted()
        );

        if !policy.is_satisfied(report.delivered.len(), report.attempted()) {
            return Err(LoopcamError::Delivery {
                delivered: report.delivered.len(),
                attempted: report.attempted(),
                failed: report.failed_devices(),
            });
        }
        Ok(report)
    }

    /// Close every sink; safe to call more than once
    pub fn close_all(&mut self) {
        for sink in &mut self.sinks {
            sink.close();
        }
    }

    /// Device identifiers in sink order
    pub fn devices(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.device().to_string()).collect()
    }

    /// Number of sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Per-sink counters in sink order
    pub fn sink_stats(&self) -> Vec<SinkStats> {
        self.sinks.iter().map(SinkHandle::stats).collect()
    }

    /// The frame converter
    pub fn converter(&self) -> &FormatConverter {
        &self.converter
    }

    /// Active delivery policy
    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Active write mode
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }
}

/// Write `frame` to every sink on its own scoped thread
///
/// Outcomes come back in sink order once all writers have finished.
fn write_parallel(sinks: &mut [SinkHandle], frame: &ConvertedFrame<'_>) -> Vec<Result<()>> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = sinks
            .iter_mut()
            .map(|sink| {
                let device = sink.device().to_string();
                (device, scope.spawn(move || sink.write(frame)))
            })
            .collect();

        workers
            .into_iter()
            .map(|(device, worker)| {
                worker.join().unwrap_or_else(|_| {
                    Err(LoopcamError::DeviceWrite {
                        device,
                        source: std::io::Error::other("writer thread panicked"),
                    })
                })
            })
            .collect()
    })
}
