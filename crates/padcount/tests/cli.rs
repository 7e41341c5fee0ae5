use std::io::Cursor;

use assert_cmd::Command;
use image::{ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;

fn padcount() -> Command {
    Command::cargo_bin("padcount").expect("padcount binary")
}

fn discs_png(path: &std::path::Path) {
    let mut img = RgbImage::from_pixel(320, 240, Rgb([240, 236, 228]));
    for (cx, cy) in [(70i32, 120i32), (160, 120), (250, 120)] {
        for y in cy - 25..=cy + 25 {
            for x in cx - 25..=cx + 25 {
                if (x - cx).pow(2) + (y - cy).pow(2) <= 625 {
                    img.put_pixel(x as u32, y as u32, Rgb([150, 75, 40]));
                }
            }
        }
    }
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    std::fs::write(path, buf.into_inner()).unwrap();
}

#[test]
fn params_prints_defaults() {
    padcount()
        .args(["params", "--log-level", "off"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"min_radius_px\": 10"))
        .stdout(predicate::str::contains("\"fiducial_dictionary\": \"4x4-50\""));
}

#[test]
fn log_level_is_parsed_and_validated() {
    padcount()
        .args(["params", "--log-level", "debug"])
        .assert()
        .success();
    padcount()
        .args(["params", "--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--log-level"));
}

#[test]
fn marker_writes_png_with_quiet_zone() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("marker.png");
    padcount()
        .args(["marker", "--id", "5", "--side-px", "120", "--quiet-zone-px", "10", "--out"])
        .arg(&out)
        .assert()
        .success();
    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (140, 140));
}

#[test]
fn marker_rejects_unknown_id() {
    let dir = tempfile::tempdir().unwrap();
    padcount()
        .args(["marker", "--id", "999", "--out"])
        .arg(dir.path().join("m.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn count_writes_report_and_preview() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pads.png");
    let report = dir.path().join("report.json");
    let preview = dir.path().join("preview.png");
    let params = dir.path().join("params.json");
    discs_png(&input);
    std::fs::write(&params, r#"{"min_radius_px": 15, "max_radius_px": 35, "use_fiducial": false}"#)
        .unwrap();

    padcount()
        .arg("count")
        .arg(&input)
        .arg("--params")
        .arg(&params)
        .arg("--report")
        .arg(&report)
        .arg("--preview")
        .arg(&preview)
        .args(["--preview-format", "png", "--backend", "fallback"])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["backend"], "fallback");
    assert_eq!(json["radius_bounds"]["min_radius_px"], 15);
    assert_eq!(json["detections"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["calibration"]["found"], false);
    let img = image::open(&preview).unwrap();
    assert_eq!((img.width(), img.height()), (320, 240));
}

#[test]
fn count_reports_decode_failures() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.jpg");
    std::fs::write(&input, b"definitely not a jpeg").unwrap();
    padcount()
        .arg("count")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to decode input image"));
}

#[test]
fn strict_quality_fails_on_small_frames() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pads.png");
    discs_png(&input);
    padcount()
        .arg("count")
        .arg(&input)
        .args(["--strict-quality", "--backend", "fallback"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("image quality below threshold"));
}
