//! Tunable parameters for one interactor.

use crate::channel::CancelPolicy;
use crate::detection::DetectionMode;
use crate::error::ConfigError;
use crate::targeting::ScoreWeights;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractionConfig {
    /// Maximum detection and interaction range.
    pub range: f32,
    /// Seconds between detection passes.
    pub detection_interval: f32,
    pub weights: ScoreWeights,
    /// How far the interactor may move before a channeled session cancels.
    pub cancel_move_threshold: f32,
    /// Range multiplier for the authoritative re-check of remote requests.
    pub authority_range_tolerance: f32,
    /// Range multiplier applied every channeling tick.
    pub channel_range_tolerance: f32,
    pub cancel_policy: CancelPolicy,
    pub detection: DetectionMode,
}

impl InteractionConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_RANGE: f32 = 1000.0;
    /// 10 Hz.
    pub const DEFAULT_DETECTION_INTERVAL: f32 = 0.1;
    pub const DEFAULT_CANCEL_MOVE_THRESHOLD: f32 = 50.0;
    pub const DEFAULT_LATENCY_TOLERANCE: f32 = 1.1;
    /// Tolerance of the local pre-check.
    pub const LOCAL_RANGE_TOLERANCE: f32 = 1.0;

    pub fn new() -> Self {
        Self {
            range: Self::DEFAULT_RANGE,
            detection_interval: Self::DEFAULT_DETECTION_INTERVAL,
            weights: ScoreWeights::default(),
            cancel_move_threshold: Self::DEFAULT_CANCEL_MOVE_THRESHOLD,
            authority_range_tolerance: Self::DEFAULT_LATENCY_TOLERANCE,
            channel_range_tolerance: Self::DEFAULT_LATENCY_TOLERANCE,
            cancel_policy: CancelPolicy::default(),
            detection: DetectionMode::default(),
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn with_detection_interval(mut self, seconds: f32) -> Self {
        self.detection_interval = seconds;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn with_cancel_move_threshold(mut self, threshold: f32) -> Self {
        self.cancel_move_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    #[must_use]
    pub fn with_detection(mut self, detection: DetectionMode) -> Self {
        self.detection = detection;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.range > 0.0) {
            return Err(ConfigError::NonPositiveRange(self.range));
        }
        if self.detection_interval < 0.0 {
            return Err(ConfigError::NegativeInterval(self.detection_interval));
        }
        if self.cancel_move_threshold < 0.0 {
            return Err(ConfigError::NegativeMoveThreshold(self.cancel_move_threshold));
        }
        for (name, value) in [
            ("authority range", self.authority_range_tolerance),
            ("channel range", self.channel_range_tolerance),
        ] {
            if value < 1.0 {
                return Err(ConfigError::ToleranceBelowOne { name, value });
            }
        }
        Ok(())
    }

    /// Farthest distance a channeled session tolerates before cancelling.
    pub fn channel_max_distance(&self) -> f32 {
        self.range * self.channel_range_tolerance
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::new()
    }
}
