//! Probe decoding and scene-change selection tests.
//!
//! These run on synthetic `ffprobe` output; no media files are needed.

use scenechapter::{FrameSample, SceneChapterError, decode_frame_samples, select_scene_changes};

fn millis(samples: &[FrameSample], threshold: f64) -> Vec<f64> {
    select_scene_changes(samples, threshold)
        .iter()
        .map(|change| change.timestamp_ms)
        .collect()
}

// ── Selection ──────────────────────────────────────────────────────

#[test]
fn reference_example() {
    let samples = [
        FrameSample::new(0.0, None),
        FrameSample::new(1.0, Some(10.0)),
        FrameSample::new(2.0, Some(30.0)),
        FrameSample::new(3.5, Some(26.5)),
    ];
    assert_eq!(millis(&samples, 25.0), [2000.0, 3500.0]);
}

#[test]
fn selection_matches_filter_for_any_threshold() {
    let samples: Vec<FrameSample> = (0..200)
        .map(|index| {
            let ydif = ((index * 37) % 101) as f64 / 2.0;
            FrameSample::new(index as f64 * 0.04, Some(ydif))
        })
        .collect();

    for threshold in [0.0, 5.0, 12.5, 25.0, 33.3, 49.5, 50.0, 1000.0] {
        let expected: Vec<f64> = samples
            .iter()
            .skip(1)
            .filter(|sample| sample.ydif.unwrap() > threshold)
            .map(|sample| sample.timestamp.unwrap() * 1000.0)
            .collect();
        assert_eq!(millis(&samples, threshold), expected, "threshold {threshold}");
    }
}

#[test]
fn threshold_is_exclusive() {
    let samples = [
        FrameSample::new(0.0, None),
        FrameSample::new(1.0, Some(25.0)),
        FrameSample::new(2.0, Some(25.000001)),
    ];
    assert_eq!(millis(&samples, 25.0), [2000.0]);
}

#[test]
fn first_frame_is_never_a_scene_change() {
    let samples = [
        FrameSample::new(0.0, Some(255.0)),
        FrameSample::new(0.04, Some(1.0)),
    ];
    assert!(select_scene_changes(&samples, 25.0).is_empty());
}

#[test]
fn missing_fields_are_not_scene_changes() {
    let samples = [
        FrameSample::new(0.0, None),
        FrameSample::new(1.0, None),
        FrameSample {
            timestamp: None,
            ydif: Some(90.0),
        },
        FrameSample::new(3.0, Some(90.0)),
    ];
    assert_eq!(millis(&samples, 25.0), [3000.0]);
}

#[test]
fn near_simultaneous_changes_are_kept() {
    let samples = [
        FrameSample::new(0.0, None),
        FrameSample::new(1.0, Some(40.0)),
        FrameSample::new(1.04, Some(41.0)),
    ];
    let changes = select_scene_changes(&samples, 25.0);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].ydif, 41.0);
}

#[test]
fn empty_input_yields_nothing() {
    assert!(select_scene_changes(&[], 25.0).is_empty());
}

// ── Decoding ───────────────────────────────────────────────────────

const PROBE_OUTPUT: &str = r#"{
    "frames": [
        {
            "pkt_pts_time": "0.000000"
        },
        {
            "pkt_pts_time": "1.000000",
            "tags": { "lavfi.signalstats.YDIF": "10.000000" }
        },
        {
            "pkt_pts_time": "2.000000",
            "tags": { "lavfi.signalstats.YDIF": "30.000000" }
        },
        {
            "pkt_pts_time": "3.500000",
            "tags": { "lavfi.signalstats.YDIF": "26.500000" }
        }
    ]
}"#;

#[test]
fn decode_reference_output() {
    let samples = decode_frame_samples(PROBE_OUTPUT.as_bytes()).unwrap();
    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0], FrameSample::new(0.0, None));
    assert_eq!(samples[2], FrameSample::new(2.0, Some(30.0)));
    assert_eq!(millis(&samples, 25.0), [2000.0, 3500.0]);
}

#[test]
fn decode_newer_timestamp_field() {
    let json = r#"{"frames": [
        {"pts_time": "0.000000", "tags": {}},
        {"pts_time": "0.500000", "tags": {"lavfi.signalstats.YDIF": "60.1"}}
    ]}"#;
    let samples = decode_frame_samples(json.as_bytes()).unwrap();
    assert_eq!(samples[1], FrameSample::new(0.5, Some(60.1)));
}

#[test]
fn decode_numeric_values() {
    let json = r#"{"frames": [
        {"pkt_pts_time": 0},
        {"pkt_pts_time": 1.25, "tags": {"lavfi.signalstats.YDIF": 42.5}}
    ]}"#;
    let samples = decode_frame_samples(json.as_bytes()).unwrap();
    assert_eq!(samples[1], FrameSample::new(1.25, Some(42.5)));
}

#[test]
fn decode_fails_closed_on_bad_records() {
    let json = r#"{"frames": [
        {"pkt_pts_time": "N/A", "tags": {"lavfi.signalstats.YDIF": "99"}},
        {"pkt_pts_time": "1.0", "tags": {"lavfi.signalstats.YDIF": "garbage"}},
        {"pkt_pts_time": "2.0", "tags": "not an object"},
        17,
        {"pkt_pts_time": "3.0", "tags": {"lavfi.signalstats.YDIF": "80"}}
    ]}"#;
    let samples = decode_frame_samples(json.as_bytes()).unwrap();

    assert_eq!(samples.len(), 5);
    assert_eq!(samples[0].timestamp, None);
    assert_eq!(samples[1].ydif, None);
    assert_eq!(samples[2], FrameSample::new(2.0, None));
    assert_eq!(samples[3], FrameSample::default());
    assert_eq!(millis(&samples, 25.0), [3000.0]);
}

#[test]
fn unreadable_first_record_still_counts_as_first_frame() {
    let json = r#"{"frames": [
        {"pkt_pts_time": "0.0", "tags": "x"},
        {"pkt_pts_time": "1.0", "tags": {"lavfi.signalstats.YDIF": "80"}},
        {"pkt_pts_time": "2.0", "tags": {"lavfi.signalstats.YDIF": "1"}}
    ]}"#;
    let samples = decode_frame_samples(json.as_bytes()).unwrap();

    assert_eq!(samples.len(), 3);
    assert_eq!(millis(&samples, 25.0), [1000.0]);
}

#[test]
fn non_object_record_keeps_frame_position() {
    let json = r#"{"frames": [
        null,
        {"pkt_pts_time": "1.0", "tags": {"lavfi.signalstats.YDIF": "80"}}
    ]}"#;
    let samples = decode_frame_samples(json.as_bytes()).unwrap();

    assert_eq!(samples, [FrameSample::default(), FrameSample::new(1.0, Some(80.0))]);
    assert_eq!(millis(&samples, 25.0), [1000.0]);
}

#[test]
fn decode_empty_output() {
    assert!(decode_frame_samples(b"").unwrap().is_empty());
    assert!(decode_frame_samples(b"{\n\n}\n").unwrap().is_empty());
}

#[test]
fn decode_rejects_non_json() {
    let result = decode_frame_samples(b"Invalid data found when processing input");
    assert!(matches!(result, Err(SceneChapterError::ProbeOutput(_))));

    let error_message = result.unwrap_err().to_string();
    assert!(
        error_message.contains("Failed to parse probe output"),
        "Error should mention probe output: {error_message}",
    );
}
