//! End-to-end tests: recorded frames -> tracker -> exported session data

use hand_gesture_tracker::data::{parse_recording, DataExporter};
use hand_gesture_tracker::pipeline::{HandObservation, Handedness};
use hand_gesture_tracker::{
    Error, GestureClassifier, HandLandmarks, HandTracker, LandmarkStabilizer, TemporalPattern,
    TrackerConfig,
};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

const TIP_JOINTS: [(usize, usize); 5] = [(4, 3), (8, 7), (12, 11), (16, 15), (20, 19)];

/// Raw detector output with the given digits (thumb first) extended.
fn raw_hand(extended: [bool; 5], x_offset: f64) -> Vec<[f64; 3]> {
    let mut raw = vec![[0.5 + x_offset, 0.85, 0.0]; 21];
    raw[9] = [0.5 + x_offset, 0.65, -0.01];
    for (digit, &(tip, joint)) in TIP_JOINTS.iter().enumerate() {
        let x = 0.3 + digit as f64 * 0.1 + x_offset;
        raw[joint] = [x, 0.5, -0.02];
        raw[tip] = [x, if extended[digit] { 0.35 } else { 0.6 }, -0.03];
    }
    raw
}

fn observation(handedness: Handedness, raw: Option<Vec<[f64; 3]>>, confidence: f64) -> HandObservation {
    HandObservation {
        handedness,
        landmarks: raw,
        confidence,
    }
}

const FIST: [bool; 5] = [false; 5];
const OPEN: [bool; 5] = [true; 5];
const PEACE: [bool; 5] = [false, true, true, false, false];

// ============================================================================
// Stabilizer + classifier composition
// ============================================================================

#[test]
fn test_stabilized_landmarks_classify_like_raw() {
    let mut stabilizer = LandmarkStabilizer::default();
    let mut classifier = GestureClassifier::default();

    for i in 0..6 {
        let raw = HandLandmarks::from_slice(&raw_hand(PEACE, i as f64 * 0.005)).unwrap();
        let smoothed = stabilizer.smooth_landmarks(Some(&raw));
        let result = classifier.detect_gesture(smoothed.as_ref());
        assert_eq!(result.name, "peace");
        assert_eq!(result.confidence, 0.9);
    }
    assert_eq!(
        classifier.detect_combination(),
        TemporalPattern::Sustained("peace".into())
    );
    assert_eq!(stabilizer.tracking_quality().smoothness, 1.0);
}

#[test]
fn test_gesture_sequence_patterns() {
    let mut tracker = HandTracker::new(TrackerConfig::default()).unwrap();
    let sequence = [FIST, PEACE, FIST];
    let mut patterns = Vec::new();
    for (i, digits) in sequence.iter().enumerate() {
        let obs = observation(Handedness::Right, Some(raw_hand(*digits, 0.0)), 0.95);
        let result = tracker.process_frame(i as f64 * 0.033, &[obs]).unwrap();
        patterns.push(result.hands[&Handedness::Right].pattern.clone());
    }

    assert_eq!(patterns[0], TemporalPattern::None);
    assert_eq!(patterns[1], TemporalPattern::None);
    assert_eq!(patterns[2], TemporalPattern::Combination);

    let pipeline = tracker.pipeline(Handedness::Right).unwrap();
    assert_eq!(pipeline.classifier().gesture_pattern(), vec!["fist", "peace", "fist"]);
}

#[test]
fn test_low_confidence_frame_uses_prediction() {
    let mut tracker = HandTracker::new(TrackerConfig::default()).unwrap();
    for i in 0..3 {
        let obs = observation(Handedness::Left, Some(raw_hand(OPEN, i as f64 * 0.01)), 0.9);
        tracker.process_frame(i as f64 * 0.033, &[obs]).unwrap();
    }
    let predicted = tracker
        .pipeline(Handedness::Left)
        .and_then(|p| p.stabilizer().predict_next_position())
        .unwrap();

    // A wildly different detection at low confidence is ignored
    let noisy = observation(Handedness::Left, Some(raw_hand(FIST, 0.3)), 0.2);
    let result = tracker.process_frame(0.1, &[noisy]).unwrap();
    let left = &result.hands[&Handedness::Left];
    assert!(left.occluded);
    assert_eq!(left.gesture.name, "open_palm");

    // The smoothed output is the filtered prediction, pulled toward it
    let wrist = left.landmarks.unwrap().wrist();
    assert!((wrist.x - predicted.wrist().x).abs() < 0.01);
}

#[test]
fn test_lost_hand_without_history_degrades_gracefully() {
    let mut tracker = HandTracker::new(TrackerConfig::default()).unwrap();
    let result = tracker
        .process_frame(0.0, &[observation(Handedness::Left, None, 0.0)])
        .unwrap();
    let left = &result.hands[&Handedness::Left];
    assert!(left.landmarks.is_none());
    assert!(left.gesture.is_unknown());
    assert_eq!(left.gesture.confidence, 0.0);
    assert_eq!(left.pattern, TemporalPattern::None);
}

#[test]
fn test_malformed_frame_fails_fast() {
    let mut tracker = HandTracker::new(TrackerConfig::default()).unwrap();
    let mut raw = raw_hand(OPEN, 0.0);
    raw.truncate(20);
    let err = tracker
        .process_frame(0.0, &[observation(Handedness::Left, Some(raw), 1.0)])
        .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { expected: 21, actual: 20 }));
}

#[test]
fn test_malformed_hand_rejects_whole_frame() {
    let mut tracker = HandTracker::new(TrackerConfig::default()).unwrap();
    let mut short = raw_hand(OPEN, 0.0);
    short.truncate(20);
    let frame = [
        observation(Handedness::Left, Some(raw_hand(FIST, 0.0)), 1.0),
        observation(Handedness::Right, Some(short), 1.0),
    ];
    assert!(tracker.process_frame(0.0, &frame).is_err());
    assert_eq!(tracker.frames_processed(), 0);
    assert!(tracker.pipeline(Handedness::Left).is_none());

    let result = tracker.process_frame(0.033, &frame[..1]).unwrap();
    assert_eq!(result.frame, 0);
    assert_eq!(
        tracker.pipeline(Handedness::Left).unwrap().classifier().gesture_pattern(),
        vec!["fist"]
    );
}

#[test]
fn test_vanished_hand_is_dropped_after_prediction_limit() {
    let mut config = TrackerConfig::default();
    config.stabilizer.max_predicted_frames = 3;
    let mut tracker = HandTracker::new(config).unwrap();
    for i in 0..3 {
        let obs = observation(Handedness::Right, Some(raw_hand(OPEN, i as f64 * 0.01)), 0.9);
        tracker.process_frame(i as f64 * 0.033, &[obs]).unwrap();
    }

    let mut tracked = Vec::new();
    for i in 3..10 {
        let result = tracker
            .process_frame(i as f64 * 0.033, &[observation(Handedness::Right, None, 0.0)])
            .unwrap();
        tracked.push(result.hands[&Handedness::Right].landmarks.is_some());
    }
    assert_eq!(tracked, [true, true, true, false, false, false, false]);
}

#[test]
fn test_history_capacity_from_config() {
    let mut config = TrackerConfig::default();
    config.classifier.history_length = 4;
    let mut tracker = HandTracker::new(config).unwrap();

    for i in 0..12 {
        let digits = if i % 3 == 0 { PEACE } else { FIST };
        let obs = observation(Handedness::Right, Some(raw_hand(digits, 0.0)), 1.0);
        tracker.process_frame(i as f64, &[obs]).unwrap();
        let history = tracker
            .pipeline(Handedness::Right)
            .unwrap()
            .classifier()
            .gesture_pattern();
        assert!(history.len() <= 4);
    }
}

// ============================================================================
// Recording replay and export
// ============================================================================

#[test]
fn test_replay_and_export() {
    let mut lines = Vec::new();
    for i in 0..5 {
        let frame = serde_json::json!({
            "timestamp": i as f64 * 0.033,
            "hands": [
                {"handedness": "left", "landmarks": raw_hand(FIST, 0.0), "confidence": 0.9},
                {"handedness": "right", "landmarks": raw_hand(OPEN, 0.0), "confidence": 0.9}
            ]
        });
        lines.push(frame.to_string());
    }
    // Right hand drops out for one frame
    lines.push(
        serde_json::json!({
            "timestamp": 0.2,
            "hands": [{"handedness": "right", "landmarks": null, "confidence": 0.0}]
        })
        .to_string(),
    );
    let frames = parse_recording(lines.join("\n").as_bytes()).unwrap();
    assert_eq!(frames.len(), 6);

    let dir = TempDir::new().unwrap();
    let mut tracker = HandTracker::new(TrackerConfig::default()).unwrap();
    let mut exporter = DataExporter::new(dir.path(), Some("replay".to_string()));
    for frame in &frames {
        let result = tracker.process_frame(frame.timestamp, &frame.hands).unwrap();
        exporter.add_frame(&result);
    }

    let summary = exporter.summary();
    assert_eq!(summary.total_frames, 6);
    assert_eq!(summary.hand_frames, 11);
    assert_eq!(summary.tracked_frames, 11);
    assert_eq!(summary.occluded_frames, 1);
    assert_eq!(summary.gesture_counts["fist"], 5);
    assert_eq!(summary.gesture_counts["open_palm"], 6);

    let csv_path = exporter.export_csv().unwrap();
    assert_eq!(csv_path, dir.path().join("replay").join("tracking_data.csv"));
    let content = std::fs::read_to_string(&csv_path).unwrap();
    let mut rows = content.lines();
    let header = rows.next().unwrap();
    assert!(header.starts_with("timestamp,frame,hand,tracked,occluded,gesture"));
    assert!(header.contains("hand_sign"));
    assert_eq!(rows.count(), 11);
    assert!(content.contains("sustained_fist"));

    let summary_path = exporter.export_summary().unwrap();
    let summary_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(summary_json["session_name"], "replay");
    assert_eq!(summary_json["occluded_frames"], 1);
}

#[test]
fn test_config_file_drives_tracker() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "classifier": {
                "confidence_threshold": 0.5,
                "gestures": [
                    {"name": "three", "expected_extended_fingers": 3, "confidence_weight": 0.6},
                    {"name": "wave", "confidence_weight": 1.0}
                ]
            }
        }"#,
    )
    .unwrap();

    let config = TrackerConfig::load(&path).unwrap();
    let mut tracker = HandTracker::new(config).unwrap();
    let three = raw_hand([false, true, true, true, false], 0.0);
    let result = tracker
        .process_frame(0.0, &[observation(Handedness::Left, Some(three), 1.0)])
        .unwrap();
    let gesture = &result.hands[&Handedness::Left].gesture;
    assert_eq!(gesture.name, "three");
    assert_eq!(gesture.confidence, 0.6);

    // "wave" has no finger count and can never win
    let open = raw_hand(OPEN, 0.0);
    let result = tracker
        .process_frame(0.033, &[observation(Handedness::Left, Some(open), 1.0)])
        .unwrap();
    assert!(result.hands[&Handedness::Left].gesture.is_unknown());
}
