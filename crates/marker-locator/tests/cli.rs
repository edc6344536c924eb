use std::fs;
use std::path::Path;

use assert_cmd::Command;
use marker_locator::core::synthetic::{detection_at, Frame};
use marker_locator::{
    AxisSpec, CalibrationConfig, CalibrationParameters, CalibrationRecord, CalibrationSample,
    Detection, GroundTruth, ParameterAxis, SearchSchedule, SearchStep,
};
use nalgebra::Point2;
use predicates::prelude::*;

fn truth() -> CalibrationParameters {
    CalibrationParameters::new(0.775, 1.2, 7.93).unwrap()
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let frame = Frame::new(4032.0, 3024.0);
    let samples = [(72.0, -15.0), (96.0, 0.0), (120.0, 22.0)]
        .iter()
        .enumerate()
        .map(|(i, &(forward, lateral))| {
            CalibrationSample::new(
                format!("sample-{i}"),
                vec![detection_at("dock", &truth(), frame, forward, lateral, 0.0)],
            )
            .with_truth("dock", GroundTruth::new(forward, lateral))
        })
        .collect();
    let config = CalibrationConfig {
        samples,
        axes: vec![
            AxisSpec::bounded(ParameterAxis::FocalRatio, 0.3, 1.5),
            AxisSpec::new(ParameterAxis::LateralAngleScalar),
        ],
        initial_guess: CalibrationParameters::new(0.7, 1.0, 7.93).unwrap(),
        schedule: SearchSchedule::new(vec![
            SearchStep::new(0.4, 0.1),
            SearchStep::new(0.1, 0.01),
            SearchStep::new(0.01, 0.001),
        ]),
        missing_truth: Default::default(),
        output_path: Some(dir.join("calibration_results.txt").display().to_string()),
    };
    let path = dir.join("config.json");
    config.write_json(&path).unwrap();
    path
}

#[test]
fn calibrate_writes_record_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("marker-locator")
        .unwrap()
        .args(["--log-level", "off", "calibrate", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_error\""))
        .stdout(predicate::str::contains("\"levels\": 3"));

    let record = CalibrationRecord::load(dir.path().join("calibration_results.txt")).unwrap();
    assert!((record.parameters.focal_ratio - 0.775).abs() < 1e-3);
    assert!((record.parameters.lateral_angle_scalar - 1.2).abs() < 1e-3);
    assert_eq!(record.parameters.marker_size, 7.93);
}

#[test]
fn locate_uses_a_written_record() {
    let dir = tempfile::tempdir().unwrap();
    let record_path = dir.path().join("record.txt");
    fs::write(
        &record_path,
        "focal_ratio = 0.775\nlateral_angle_scalar = 1\nmarker_size = 7.93\ntotal_error = 0\n",
    )
    .unwrap();

    let detections = vec![
        Detection::new(
            "dock-3",
            vec![Point2::new(1800.0, 1000.0), Point2::new(2000.0, 1000.0)],
            4000.0,
        ),
        Detection::new("broken", vec![Point2::new(1.0, 1.0)], 4000.0),
    ];
    let detections_path = dir.path().join("detections.json");
    fs::write(&detections_path, serde_json::to_string(&detections).unwrap()).unwrap();

    let output = Command::cargo_bin("marker-locator")
        .unwrap()
        .args(["locate", "--record"])
        .arg(&record_path)
        .arg("--detections")
        .arg(&detections_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let extraction: marker_locator::Extraction = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(extraction.skipped, 1);
    let loc = extraction.locations.get("dock-3").unwrap();
    assert!((loc.forward_distance - 122.915).abs() < 1e-9);
    assert!(loc.lateral_offset < 0.0);
}

#[test]
fn missing_config_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("marker-locator")
        .unwrap()
        .args(["calibrate", "--config"])
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn malformed_record_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let record_path = dir.path().join("record.txt");
    fs::write(&record_path, "focal_ratio = abc\n").unwrap();
    let detections_path = dir.path().join("detections.json");
    fs::write(&detections_path, "[]").unwrap();

    Command::cargo_bin("marker-locator")
        .unwrap()
        .args(["locate", "--record"])
        .arg(&record_path)
        .arg("--detections")
        .arg(&detections_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("focal_ratio"));
}
