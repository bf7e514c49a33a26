//! Per-frame luminance statistics via `ffprobe`.
//!
//! The probe loads the media through a lavfi `movie` source, runs the
//! `signalstats` filter and prints one JSON record per decoded frame:
//!
//! ```text
//! {
//!     "frames": [
//!         { "pkt_pts_time": "0.040000", "tags": { "lavfi.signalstats.YDIF": "3.1" } },
//!         ...
//!     ]
//! }
//! ```
//!
//! [`decode_frame_samples`] turns that document into [`FrameSample`]s. The
//! decoding fails closed: a record that lacks a usable timestamp or
//! statistic yields a sample with `None` in that field instead of an error.
//! Only output that is not JSON at all is rejected.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    configuration::ToolPaths,
    error::SceneChapterError,
    tool::{ExternalTool, ToolInvocation, ToolRunner},
};

/// Frame tag carrying the luminance difference to the previous frame.
pub const YDIF_TAG: &str = "lavfi.signalstats.YDIF";

/// Timestamp fields tried in order. Recent `ffprobe` builds no longer emit
/// `pkt_pts_time`.
const TIMESTAMP_FIELDS: [&str; 3] = ["pkt_pts_time", "pts_time", "best_effort_timestamp_time"];

/// One probed frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameSample {
    /// Presentation timestamp in seconds, if the probe reported one.
    pub timestamp: Option<f64>,
    /// `signalstats` YDIF value, if present and numeric.
    pub ydif: Option<f64>,
}

impl FrameSample {
    /// A sample with a known timestamp.
    pub fn new(timestamp: f64, ydif: Option<f64>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ydif,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawFrame {
    #[serde(default)]
    pkt_pts_time: Option<Value>,
    #[serde(default)]
    pts_time: Option<Value>,
    #[serde(default)]
    best_effort_timestamp_time: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
}

impl RawFrame {
    fn timestamp_field(&self, name: &str) -> Option<&Value> {
        match name {
            "pkt_pts_time" => self.pkt_pts_time.as_ref(),
            "pts_time" => self.pts_time.as_ref(),
            "best_effort_timestamp_time" => self.best_effort_timestamp_time.as_ref(),
            _ => None,
        }
    }

    fn into_sample(self) -> FrameSample {
        let timestamp = TIMESTAMP_FIELDS
            .iter()
            .find_map(|name| self.timestamp_field(name).and_then(numeric_value));
        let ydif = self
            .tags
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|tags| tags.get(YDIF_TAG))
            .and_then(numeric_value);
        FrameSample { timestamp, ydif }
    }
}

/// Read a JSON string or number as a finite `f64`.
///
/// `ffprobe` prints most numeric fields as strings and uses `"N/A"` for
/// missing values.
fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Decode `ffprobe -of json` output into frame samples, in frame order.
///
/// Every array found at the top level is treated as a list of frame
/// records. Every element yields exactly one sample so frame positions are
/// preserved; an element that is not a frame object yields an empty sample.
///
/// # Errors
///
/// Returns [`SceneChapterError::ProbeOutput`] if the output is not a JSON
/// object. Empty output decodes to no samples.
pub fn decode_frame_samples(json: &[u8]) -> Result<Vec<FrameSample>, SceneChapterError> {
    if json.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let document: Map<String, Value> = serde_json::from_slice(json)?;
    let mut samples = Vec::new();
    let mut unreadable = 0_usize;

    for (section, value) in document {
        let Value::Array(records) = value else {
            log::debug!("Ignoring non-array probe section {section:?}");
            continue;
        };
        for record in records {
            match serde_json::from_value::<RawFrame>(record) {
                Ok(raw) => samples.push(raw.into_sample()),
                Err(error) => {
                    unreadable += 1;
                    log::debug!("Unreadable frame record in {section:?}: {error}");
                    samples.push(FrameSample::default());
                }
            }
        }
    }

    if unreadable > 0 {
        log::warn!("{unreadable} unreadable frame record(s) in probe output treated as no scene change");
    }
    Ok(samples)
}

/// Escape `path` for use as the `movie` filter's file name.
///
/// Two levels apply: the filter option value (`\`, `'`, `:`) and the
/// filtergraph description (`\`, `'`, `[`, `]`, `,`, `;`).
pub fn escape_filter_path(path: &str) -> String {
    let option_level = escape_chars(path, &['\\', '\'', ':']);
    escape_chars(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if special.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// The lavfi graph that loads `media` and computes `signalstats`.
pub fn signalstats_graph(media: &Path) -> String {
    format!(
        "movie={},signalstats",
        escape_filter_path(&media.to_string_lossy())
    )
}

/// The `ffprobe` command line that reports per-frame YDIF for `media`.
pub fn probe_invocation(media: &Path, tools: &ToolPaths) -> ToolInvocation {
    let entries = format!(
        "frame={}:frame_tags={YDIF_TAG}",
        TIMESTAMP_FIELDS.join(",")
    );
    ToolInvocation::new(ExternalTool::Ffprobe, tools.program(ExternalTool::Ffprobe))
        .args(["-hide_banner", "-v", "error", "-f", "lavfi", "-i"])
        .arg(signalstats_graph(media))
        .args(["-show_entries", entries.as_str(), "-of", "json"])
}

/// Run the probe over `media` and decode its output.
///
/// # Errors
///
/// Returns [`SceneChapterError::ToolLaunch`] or
/// [`SceneChapterError::ExternalTool`] when `ffprobe` cannot run or fails,
/// and [`SceneChapterError::ProbeOutput`] when its output is not JSON.
pub fn probe_frames(
    media: &Path,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
) -> Result<Vec<FrameSample>, SceneChapterError> {
    let output = probe_invocation(media, tools).run_checked(runner)?;
    let samples = decode_frame_samples(&output.stdout)?;
    log::debug!("Probed {} frame(s) from {}", samples.len(), media.display());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_value_accepts_strings_and_numbers() {
        assert_eq!(numeric_value(&Value::from("1.500000")), Some(1.5));
        assert_eq!(numeric_value(&Value::from(2.25)), Some(2.25));
        assert_eq!(numeric_value(&Value::from("N/A")), None);
        assert_eq!(numeric_value(&Value::from("nan")), None);
        assert_eq!(numeric_value(&Value::Null), None);
    }

    #[test]
    fn escape_plain_path_untouched() {
        assert_eq!(escape_filter_path("/videos/clip.mp4"), "/videos/clip.mp4");
    }

    #[test]
    fn escape_colon_and_quote() {
        assert_eq!(escape_filter_path("C:/a.mp4"), r"C\\:/a.mp4");
        assert_eq!(escape_filter_path("it's.mp4"), r"it\\\'s.mp4");
        assert_eq!(escape_filter_path("a,b.mp4"), r"a\,b.mp4");
    }

    #[test]
    fn graph_wraps_movie_source() {
        assert_eq!(
            signalstats_graph(Path::new("/v/in.mkv")),
            "movie=/v/in.mkv,signalstats"
        );
    }

    #[test]
    fn timestamp_fallback_order() {
        let raw: RawFrame = serde_json::from_str(
            r#"{"pts_time": "4.0", "best_effort_timestamp_time": "5.0"}"#,
        )
        .unwrap();
        assert_eq!(raw.into_sample().timestamp, Some(4.0));
    }
}
