//! End-to-end tests for the thumbmill binary

use std::path::Path;

use assert_cmd::Command;
use image::{ImageBuffer, Rgb};
use predicates::prelude::*;
use tempfile::TempDir;

fn write_test_image(path: &Path, width: u32, height: u32) {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let intensity = ((x * 11 + y * 3) % 255) as u8;
        Rgb([intensity, intensity / 2, 255 - intensity])
    });
    img.save(path).unwrap();
}

#[test]
fn generates_width_capped_thumbnails() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let dest = tmp.path().join("thumbs");
    std::fs::create_dir(&source).unwrap();

    write_test_image(&source.join("wide.png"), 200, 100);
    write_test_image(&source.join("narrow.png"), 40, 40);

    Command::cargo_bin("thumbmill")
        .unwrap()
        .args(["--input"])
        .arg(&source)
        .args(["--output"])
        .arg(&dest)
        .args(["--width", "100", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed"));

    let wide = image::open(dest.join("wide.png")).unwrap();
    assert_eq!((wide.width(), wide.height()), (100, 50));

    // Narrower than the cap: copied without upscaling
    let narrow = image::open(dest.join("narrow.png")).unwrap();
    assert_eq!((narrow.width(), narrow.height()), (40, 40));
}

#[test]
fn reports_failures_but_still_completes() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let dest = tmp.path().join("thumbs");
    std::fs::create_dir(&source).unwrap();

    write_test_image(&source.join("good.png"), 120, 90);
    // Passes discovery by forging a PNG header, then fails to decode
    let mut forged = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    forged.extend_from_slice(&[0u8; 64]);
    std::fs::write(source.join("broken.png"), forged).unwrap();

    Command::cargo_bin("thumbmill")
        .unwrap()
        .args(["--input"])
        .arg(&source)
        .args(["--output"])
        .arg(&dest)
        .args(["--width", "60", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed"))
        .stdout(predicate::str::contains("broken.png"));

    assert!(dest.join("good.png").exists());
    assert!(!dest.join("broken.png").exists());
}

#[test]
fn dry_run_lists_without_writing() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let dest = tmp.path().join("thumbs");
    std::fs::create_dir(&source).unwrap();

    write_test_image(&source.join("photo.png"), 64, 64);

    Command::cargo_bin("thumbmill")
        .unwrap()
        .args(["--input"])
        .arg(&source)
        .args(["--output"])
        .arg(&dest)
        .args(["--width", "32", "--dry-run", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("photo.png"));

    assert!(!dest.exists());
}

#[test]
fn json_summary_is_machine_readable() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let dest = tmp.path().join("thumbs");
    std::fs::create_dir(&source).unwrap();

    write_test_image(&source.join("photo.png"), 64, 64);

    let output = Command::cargo_bin("thumbmill")
        .unwrap()
        .args(["--input"])
        .arg(&source)
        .args(["--output"])
        .arg(&dest)
        .args(["--width", "32", "--json", "--quiet"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["failed"].as_array().unwrap().len(), 0);
    assert!(summary["elapsed_seconds"].as_f64().unwrap() >= 0.0);
}

#[test]
fn missing_input_is_an_error() {
    Command::cargo_bin("thumbmill")
        .unwrap()
        .args(["--output", "/tmp/out", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn nonexistent_source_directory_is_an_error() {
    let tmp = TempDir::new().unwrap();

    Command::cargo_bin("thumbmill")
        .unwrap()
        .args(["--input", "/no/such/directory"])
        .args(["--output"])
        .arg(tmp.path().join("out"))
        .args(["--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
