//! Scheduling-label advisor and telemetry ports
//!
//! The core never knows how the scheduling label is produced. It talks
//! to a `LabelSource` through the `SchedulingAdvisor`, which polls on a
//! fixed interval and caches the last good answer; the tick loop only
//! ever reads the cache. Telemetry submission is fire-and-forget through
//! a `TelemetrySink`. Failure of either collaborator is logged and never
//! stalls or crashes the simulation.

use anyhow::Result;
use log::{info, warn};

use super::types::SchedulingLabel;

/// Interval between label polls, in simulation milliseconds
pub const LABEL_POLL_INTERVAL_MS: f32 = 10_000.0;

/// Interval between telemetry submissions, in simulation milliseconds
pub const TELEMETRY_INTERVAL_MS: f32 = 5_000.0;

/// Request payload sent to the label source: a prediction for traffic
/// conditions a little ahead of now
#[derive(Debug, Clone)]
pub struct LabelRequest {
    /// Future timestamp the prediction is for
    pub timestamp_ms: f32,
    pub predicted_vehicles: usize,
    pub emergency_expected: bool,
}

/// The scheduling-label collaborator (the "ML" prediction endpoint)
pub trait LabelSource {
    fn predict(&mut self, request: &LabelRequest) -> Result<SchedulingLabel>;
}

/// Sample submitted to the data-logging collaborator
#[derive(Debug, Clone)]
pub struct TrafficSample {
    pub timestamp_ms: f32,
    pub vehicles_present: usize,
    pub emergency_present: bool,
    pub scheduling_label: SchedulingLabel,
}

/// The data-logging collaborator. Failures are for operator visibility
/// only and never affect simulation state.
pub trait TelemetrySink {
    fn record(&mut self, sample: &TrafficSample) -> Result<()>;
}

/// Poll-and-cache wrapper around a `LabelSource`.
///
/// Without a source, or while the source keeps erroring, the cached
/// label stays at its last good value (Round Robin before any answer
/// arrives).
pub struct SchedulingAdvisor {
    source: Option<Box<dyn LabelSource>>,
    cached: SchedulingLabel,
    last_poll_ms: f32,
    predictions: usize,
}

impl SchedulingAdvisor {
    pub fn new(source: Option<Box<dyn LabelSource>>) -> Self {
        Self {
            source,
            cached: SchedulingLabel::default(),
            last_poll_ms: 0.0,
            predictions: 0,
        }
    }

    /// The last cached label; never blocks
    pub fn current_label(&self) -> SchedulingLabel {
        self.cached
    }

    /// Successful predictions received so far
    pub fn prediction_count(&self) -> usize {
        self.predictions
    }

    /// Whether the polling interval has elapsed since the last attempt
    pub fn refresh_due(&self, now_ms: f32) -> bool {
        self.source.is_some() && now_ms - self.last_poll_ms >= LABEL_POLL_INTERVAL_MS
    }

    /// Issue one poll. Errors keep the previous cached value.
    pub fn refresh(&mut self, now_ms: f32, request: &LabelRequest) {
        self.last_poll_ms = now_ms;
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return,
        };

        match source.predict(request) {
            Ok(label) => {
                self.cached = label;
                self.predictions += 1;
                info!(
                    "Scheduling prediction: {} ({} vehicles expected)",
                    label, request.predicted_vehicles
                );
            }
            Err(error) => {
                warn!(
                    "Label source unavailable, keeping {}: {:#}",
                    self.cached, error
                );
            }
        }
    }

    /// Back to the pre-first-poll state (full simulation reset)
    pub fn reset(&mut self) {
        self.cached = SchedulingLabel::default();
        self.last_poll_ms = 0.0;
        self.predictions = 0;
    }
}

/// Fire-and-forget telemetry reporter on a fixed interval
pub struct TelemetryReporter {
    sink: Option<Box<dyn TelemetrySink>>,
    last_report_ms: f32,
}

impl TelemetryReporter {
    pub fn new(sink: Option<Box<dyn TelemetrySink>>) -> Self {
        Self {
            sink,
            last_report_ms: 0.0,
        }
    }

    pub fn report_due(&self, now_ms: f32) -> bool {
        self.sink.is_some() && now_ms - self.last_report_ms >= TELEMETRY_INTERVAL_MS
    }

    pub fn submit(&mut self, now_ms: f32, sample: &TrafficSample) {
        self.last_report_ms = now_ms;
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => return,
        };

        match sink.record(sample) {
            Ok(()) => info!(
                "Telemetry: {} vehicles, emergency: {}, label: {}",
                sample.vehicles_present, sample.emergency_present, sample.scheduling_label
            ),
            Err(error) => warn!("Failed to submit telemetry: {:#}", error),
        }
    }

    pub fn reset(&mut self) {
        self.last_report_ms = 0.0;
    }
}

/// Variance of the four approach queue lengths
pub fn queue_variance(car_counts: &[usize; 4]) -> f32 {
    let mean = car_counts.iter().sum::<usize>() as f32 / 4.0;
    car_counts
        .iter()
        .map(|&count| {
            let diff = count as f32 - mean;
            diff * diff
        })
        .sum::<f32>()
        / 4.0
}

/// The label the simulation itself reports to telemetry, derived from
/// live traffic conditions
pub fn determine_current_label(
    vehicle_count: usize,
    emergency_present: bool,
    queue_variance: f32,
) -> SchedulingLabel {
    if emergency_present {
        SchedulingLabel::PriorityScheduling
    } else if vehicle_count < 5 {
        SchedulingLabel::RoundRobin
    } else if queue_variance > 3.0 {
        SchedulingLabel::ShortestJobFirst
    } else {
        SchedulingLabel::PriorityScheduling
    }
}

/// In-process stand-in for the stub prediction backend, reproducing its
/// observable labelling: emergencies get priority, light traffic cycles
/// round-robin, heavy traffic clears short queues first.
#[derive(Debug)]
pub struct HeuristicLabelSource {
    heavy_traffic_threshold: usize,
}

impl Default for HeuristicLabelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicLabelSource {
    pub fn new() -> Self {
        Self {
            heavy_traffic_threshold: 12,
        }
    }
}

impl LabelSource for HeuristicLabelSource {
    fn predict(&mut self, request: &LabelRequest) -> Result<SchedulingLabel> {
        let label = if request.emergency_expected {
            SchedulingLabel::PriorityScheduling
        } else if request.predicted_vehicles < 5 {
            SchedulingLabel::RoundRobin
        } else if request.predicted_vehicles >= self.heavy_traffic_threshold {
            SchedulingLabel::ShortestJobFirst
        } else {
            SchedulingLabel::PriorityScheduling
        };
        Ok(label)
    }
}
