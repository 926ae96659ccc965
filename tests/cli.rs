use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_config(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp config");
    tmp.write_all(xml.as_bytes()).expect("write config");
    tmp
}

fn furniture_config() -> NamedTempFile {
    write_config(
        r#"<viewer>
  <session>
    <video>camera-stream</video>
    <light-estimation>false</light-estimation>
  </session>
  <model>
    <name>Chair</name>
    <path>models/chair.glb</path>
    <scale>0.01</scale>
  </model>
  <model>
    <name>Table</name>
    <path>models/table.glb</path>
    <scale>0.005</scale>
  </model>
</viewer>
"#,
    )
}

#[test]
fn cli_simulates_session_and_places_selected_model() {
    let config = furniture_config();
    let mut cmd = Command::cargo_bin("furniture-ar").expect("binary exists");
    cmd.arg(config.path()).arg("--select").arg("1");
    cmd.assert()
        .success()
        .stdout(contains(
            "Loaded catalog with 2 models (video: CameraStream, hit-test: required)",
        ))
        .stdout(contains(" - Table (models/table.glb) scale=0.005"))
        .stdout(contains(
            "Requesting session (required: [hit-test], optional: [dom-overlay])",
        ))
        .stdout(contains("Rendered 3 frame(s)"))
        .stdout(contains("Placed Table as object #0"))
        .stdout(contains(" - #0 Table pos=(0.00, 0.00, -1.00) scale=0.005"))
        .stdout(contains("Session ended (state: inactive)"));
}

#[test]
fn cli_without_frames_places_nothing() {
    let config = furniture_config();
    let mut cmd = Command::cargo_bin("furniture-ar").expect("binary exists");
    cmd.arg(config.path()).arg("--frames").arg("0");
    cmd.assert()
        .success()
        .stdout(contains("Rendered 0 frame(s)"))
        .stdout(contains("Nothing placed"));
}

#[test]
fn cli_summary_only_skips_simulation() {
    let config = furniture_config();
    let mut cmd = Command::cargo_bin("furniture-ar").expect("binary exists");
    cmd.arg(config.path()).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains(" - Chair (models/chair.glb) scale=0.010"))
        .stdout(contains("Rendered").not());
}

#[test]
fn cli_rejects_out_of_range_selection() {
    let config = furniture_config();
    let mut cmd = Command::cargo_bin("furniture-ar").expect("binary exists");
    cmd.arg(config.path()).arg("--select").arg("7");
    cmd.assert().failure().stderr(contains("invalid --select index"));
}
