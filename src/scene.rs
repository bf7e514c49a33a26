//! Scene change extraction.
//!
//! A frame counts as a scene change when its `signalstats` YDIF value, the
//! mean absolute luminance difference to the previous frame, is strictly
//! greater than a threshold. The default of 25.0 assumes 8-bit samples; see
//! [`PipelineOptions::with_bit_depth`](crate::PipelineOptions::with_bit_depth).
//!
//! # Example
//!
//! ```
//! use scenechapter::{FrameSample, select_scene_changes};
//!
//! let samples = [
//!     FrameSample::new(0.0, None),
//!     FrameSample::new(1.0, Some(10.0)),
//!     FrameSample::new(2.0, Some(30.0)),
//!     FrameSample::new(3.5, Some(26.5)),
//! ];
//! let changes = select_scene_changes(&samples, 25.0);
//! let millis: Vec<f64> = changes.iter().map(|change| change.timestamp_ms).collect();
//! assert_eq!(millis, [2000.0, 3500.0]);
//! ```

use std::path::Path;

use crate::{
    configuration::{DEFAULT_THRESHOLD, ToolPaths},
    error::SceneChapterError,
    probe::{FrameSample, probe_frames},
    tool::ToolRunner,
};

/// A detected scene change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneChange {
    /// Position of the change in milliseconds (`seconds * 1000`, not yet
    /// truncated).
    pub timestamp_ms: f64,
    /// The YDIF value that crossed the threshold.
    pub ydif: f64,
}

/// Result of probing one file.
#[derive(Debug, Clone, Default)]
pub struct SceneDetection {
    /// Number of frame records the probe returned.
    pub frames_probed: usize,
    /// Qualifying frames, in frame order.
    pub changes: Vec<SceneChange>,
}

impl SceneDetection {
    /// Millisecond timestamps of every change, in order.
    pub fn timestamps_ms(&self) -> Vec<f64> {
        self.changes.iter().map(|change| change.timestamp_ms).collect()
    }
}

/// Keep the samples whose YDIF exceeds `threshold`, in order.
///
/// The first sample is never a scene change: it has no previous frame, so
/// any statistic reported for it is meaningless. Samples missing a
/// timestamp or a statistic are skipped. Near-simultaneous detections are
/// not merged.
pub fn select_scene_changes(samples: &[FrameSample], threshold: f64) -> Vec<SceneChange> {
    samples
        .iter()
        .skip(1)
        .filter_map(|sample| {
            let timestamp = sample.timestamp?;
            let ydif = sample.ydif?;
            (ydif > threshold).then_some(SceneChange {
                timestamp_ms: timestamp * 1000.0,
                ydif,
            })
        })
        .collect()
}

/// Probes a file and thresholds the result.
#[derive(Debug, Clone)]
pub struct SceneDetector {
    threshold: f64,
    tools: ToolPaths,
}

impl Default for SceneDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SceneDetector {
    /// Detector comparing YDIF against `threshold`, using tools from `PATH`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            tools: ToolPaths::default(),
        }
    }

    /// Use the given tool executables.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// The threshold in use.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Probe `media` and return its scene changes.
    ///
    /// # Errors
    ///
    /// Propagates probe failures from [`probe_frames`].
    pub fn detect(
        &self,
        media: &Path,
        runner: &dyn ToolRunner,
    ) -> Result<SceneDetection, SceneChapterError> {
        let samples = probe_frames(media, &self.tools, runner)?;
        let changes = select_scene_changes(&samples, self.threshold);

        for change in &changes {
            log::debug!(
                "Scene change at {:.3}s (YDIF {:.2} > {:.2})",
                change.timestamp_ms / 1000.0,
                change.ydif,
                self.threshold
            );
        }
        log::info!(
            "Found {} scene change(s) in {} frame(s)",
            changes.len(),
            samples.len()
        );

        Ok(SceneDetection {
            frames_probed: samples.len(),
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolInvocation, ToolOutput};

    struct FixedProbe(&'static str);

    impl ToolRunner for FixedProbe {
        fn run(&self, _: &ToolInvocation) -> Result<ToolOutput, SceneChapterError> {
            Ok(ToolOutput::success(self.0))
        }
    }

    const FRAMES: &str = r#"{"frames": [
        {"pkt_pts_time": "0.0", "tags": {"lavfi.signalstats.YDIF": "90"}},
        {"pkt_pts_time": "1.0", "tags": {"lavfi.signalstats.YDIF": "30"}},
        {"pkt_pts_time": "2.0", "tags": {"lavfi.signalstats.YDIF": "60"}}
    ]}"#;

    #[test]
    fn default_detector_uses_default_threshold() {
        assert_eq!(SceneDetector::default().threshold(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn detect_applies_configured_threshold() {
        let detector = SceneDetector::new(50.0);
        assert_eq!(detector.threshold(), 50.0);

        let detection = detector
            .detect(Path::new("clip.mkv"), &FixedProbe(FRAMES))
            .unwrap();
        assert_eq!(detection.frames_probed, 3);
        assert_eq!(detection.timestamps_ms(), [2000.0]);

        let detection = SceneDetector::default()
            .detect(Path::new("clip.mkv"), &FixedProbe(FRAMES))
            .unwrap();
        assert_eq!(detection.timestamps_ms(), [1000.0, 2000.0]);
    }
}
