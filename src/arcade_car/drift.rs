// ==============================================================================
// drift.rs - DRIFT START/STOP EDGE DETECTION
// ------------------------------------------------------------------------------
// A tracked wheel is slipping when it is grounded and |v_lat| > threshold.
// The vehicle drifts while ANY tracked wheel slips.
//
// evaluate() returns Some(event) only on a transition; holding either state
// across ticks returns None. The comparison is a bare threshold with no band,
// so a v_lat hovering right at the threshold can chatter start/stop.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_drift_threshold() -> f32 { 0.9 }
fn default_tracked_wheels() -> Vec<usize> { vec![2, 3] }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// |v_lat| (m/s) above which a grounded wheel counts as slipping.
    #[serde(default = "default_drift_threshold")]
    pub threshold: f32,

    /// Wheel indices watched for slip (rear pair by default).
    #[serde(default = "default_tracked_wheels")]
    pub tracked_wheels: Vec<usize>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: default_drift_threshold(),
            tracked_wheels: default_tracked_wheels(),
        }
    }
}

impl DriftConfig {
    pub fn validate(&self, wheel_count: usize) -> Result<(), ConfigError> {
        if !(self.threshold > 0.0) {
            return Err(ConfigError::invalid("drift.threshold", "must be > 0"));
        }
        if let Some(&index) = self.tracked_wheels.iter().find(|&&i| i >= wheel_count) {
            return Err(ConfigError::WheelIndexOutOfRange {
                field: "drift.tracked_wheels",
                index,
                count: wheel_count,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftEvent {
    Started,
    Stopped,
}

/// Slip reading for one tracked wheel.
#[derive(Debug, Copy, Clone, Default)]
pub struct SlipSample {
    pub grounded: bool,
    pub sideways_velocity: f32,
}

#[inline]
pub fn is_slipping(sample: SlipSample, threshold: f32) -> bool {
    sample.grounded && sample.sideways_velocity.abs() > threshold
}

#[derive(Debug, Clone)]
pub struct DriftPolicy {
    threshold: f32,
    drifting: bool,
    slipping: Vec<bool>,
}

impl DriftPolicy {
    pub fn new(threshold: f32, tracked: usize) -> Self {
        Self {
            threshold,
            drifting: false,
            slipping: vec![false; tracked],
        }
    }

    pub fn threshold(&self) -> f32 { self.threshold }
    pub fn is_drifting(&self) -> bool { self.drifting }

    /// Per-tracked-wheel slip flags from the last evaluation (smoke / skid marks).
    pub fn slipping(&self) -> &[bool] { &self.slipping }

    /// `samples` must be in tracked-wheel order.
    pub fn evaluate(&mut self, samples: &[SlipSample]) -> Option<DriftEvent> {
        self.slipping.clear();
        self.slipping
            .extend(samples.iter().map(|&s| is_slipping(s, self.threshold)));

        let drifting_now = self.slipping.iter().any(|&s| s);

        match (self.drifting, drifting_now) {
            (false, true) => {
                self.drifting = true;
                Some(DriftEvent::Started)
            }
            (true, false) => {
                self.drifting = false;
                Some(DriftEvent::Stopped)
            }
            _ => None,
        }
    }
}
