//! Command-line behaviour of the `benchloop` binary.

use std::path::Path;

use assert_cmd::Command;
use benchloop_core::RunLock;
use predicates::prelude::*;

const MEMORY_SCALA: &str = "class Memory extends Module {\n  val program = VecInit(Seq(\n    \"h00000013\".U(32.W)\n  ))\n}\n";

fn benchloop() -> Command {
    let mut cmd = Command::cargo_bin("benchloop").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("BENCHLOOP_CONFIG")
        .env_remove("BENCHLOOP_BACKEND")
        .env_remove("BENCHLOOP_HARDWARE_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn hardware(dir: &Path, memory: &str) -> std::path::PathBuf {
    let hw = dir.join("hardware");
    let file = hw.join("src/main/scala/cpu/Memory.scala");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, memory).unwrap();
    hw
}

#[test]
fn score_prints_value() {
    benchloop()
        .args(["score", "--elapsed", "1.0", "--report", "LUT: 50%"])
        .assert()
        .success()
        .stdout("2000.00\n");
}

#[test]
fn score_missing_key_warns() {
    benchloop()
        .args(["score", "--elapsed", "1.0", "--report", "FF: 50%"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1000.00\n"))
        .stdout(predicate::str::contains("assumed 100%"));
}

#[test]
fn score_json_output() {
    benchloop()
        .args(["-o", "json", "score", "--elapsed", "2.0", "--report", "LUT: 25%"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"utilization_percent\": 25"));
}

#[test]
fn score_rejects_zero_elapsed() {
    benchloop()
        .args(["score", "--elapsed", "0", "--report", "LUT: 50%"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive"));
}

#[test]
fn program_lists_chisel_literals() {
    let assert = benchloop().arg("program").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[0], "\"h200001B7\".U(32.W)");
    assert_eq!(lines[12], "\"h0000006F\".U(32.W)");
}

#[test]
fn program_verilog_format() {
    benchloop()
        .args(["program", "--format", "verilog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("32'h0000006F"));
}

#[test]
fn unknown_benchmark_fails() {
    benchloop()
        .args(["program", "--benchmark", "fft"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown benchmark 'fft'"));
}

#[test]
fn inject_patches_and_check_validates() {
    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);

    benchloop()
        .args(["inject", "--check", "--hardware-dir"])
        .arg(&hw)
        .assert()
        .success()
        .stdout(predicate::str::contains("Markers found"));

    benchloop()
        .args(["inject", "--hardware-dir"])
        .arg(&hw)
        .assert()
        .success()
        .stdout(predicate::str::contains("13 entries"));

    let source = std::fs::read_to_string(hw.join("src/main/scala/cpu/Memory.scala")).unwrap();
    assert!(source.contains("    \"h200001B7\".U(32.W),\n"));
    assert!(RunLock::acquire(hw.join(".benchloop.lock")).is_ok());
}

#[test]
fn inject_without_markers_fails_and_leaves_file() {
    let dir = tempfile::tempdir().unwrap();
    let original = "class Memory extends Module {}\n";
    let hw = hardware(dir.path(), original);

    benchloop()
        .args(["inject", "--hardware-dir"])
        .arg(&hw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("start marker"));

    let source = std::fs::read_to_string(hw.join("src/main/scala/cpu/Memory.scala")).unwrap();
    assert_eq!(source, original);
}

#[test]
fn inject_refuses_when_locked() {
    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);
    let _held = RunLock::acquire(hw.join(".benchloop.lock")).unwrap();

    benchloop()
        .args(["inject", "--hardware-dir"])
        .arg(&hw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Another run holds"));
}

#[test]
fn inject_ignores_lock_file_left_by_dead_run() {
    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);
    std::fs::write(hw.join(".benchloop.lock"), "999999\n").unwrap();

    benchloop()
        .args(["inject", "--hardware-dir"])
        .arg(&hw)
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn run_with_mock_backend_scores() {
    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);
    let config = dir.path().join("bench.yaml");
    std::fs::write(
        &config,
        format!(
            "hardware_dir: {}\nbuild:\n  command:\n    program: \"true\"\ntoolchain:\n  build_dir: {}\ncompletion:\n  mock_delay_ms: 50\n",
            hw.display(),
            dir.path().join("build").display()
        ),
    )
    .unwrap();

    benchloop()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("DESIGN SCORE:"))
        .stdout(predicate::str::contains("Space (LUT): 45%"));

    assert!(dir.path().join("build/Top.bit").exists());
    assert!(RunLock::acquire(hw.join(".benchloop.lock")).is_ok());
}

#[cfg(unix)]
#[test]
fn run_with_quiet_device_exits_after_scoring() {
    use std::io::Write;
    use std::time::Duration;

    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);
    let fifo = dir.path().join("uart");
    let made = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
    assert!(made.success());
    let config = dir.path().join("bench.yaml");
    std::fs::write(
        &config,
        format!(
            "hardware_dir: {}\nbuild:\n  command:\n    program: \"true\"\ntoolchain:\n  build_dir: {}\n",
            hw.display(),
            dir.path().join("build").display()
        ),
    )
    .unwrap();

    // The device sends its byte and then stays open without another word.
    let device = fifo.clone();
    std::thread::spawn(move || {
        let mut w = std::fs::OpenOptions::new().write(true).open(&device).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        w.write_all(b"D").unwrap();
        std::thread::sleep(Duration::from_secs(30));
    });

    benchloop()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--device")
        .arg(&fifo)
        .timeout(Duration::from_secs(15))
        .assert()
        .success()
        .stdout(predicate::str::contains("DESIGN SCORE:"));
}

#[cfg(unix)]
#[test]
fn run_reports_failed_stage() {
    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);
    let config = dir.path().join("bench.yaml");
    std::fs::write(
        &config,
        format!(
            "hardware_dir: {}\nbuild:\n  command:\n    program: \"false\"\ntoolchain:\n  build_dir: {}\n",
            hw.display(),
            dir.path().join("build").display()
        ),
    )
    .unwrap();

    benchloop()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("run failed at stage build"));
}

#[test]
fn vivado_run_requires_device() {
    let dir = tempfile::tempdir().unwrap();
    let hw = hardware(dir.path(), MEMORY_SCALA);
    benchloop()
        .args(["run", "--backend", "vivado", "--hardware-dir"])
        .arg(&hw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("completion.device"));
}

#[test]
fn tool_analyze_mock() {
    let dir = tempfile::tempdir().unwrap();
    benchloop()
        .current_dir(dir.path())
        .args(["tool", "analyze", "utilization"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LUT: 45%"));

    benchloop()
        .current_dir(dir.path())
        .args(["tool", "analyze", "area"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown metric: area"));
}

#[test]
fn tool_flash_missing_bitstream_fails() {
    let dir = tempfile::tempdir().unwrap();
    benchloop()
        .current_dir(dir.path())
        .args(["tool", "flash", "build/Nope.bit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn config_shows_env_override() {
    benchloop()
        .env("BENCHLOOP_TOOLCHAIN__BACKEND", "vivado")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("backend: vivado"))
        .stdout(predicate::str::contains("part_number: xc7a100tcsg324-1"));
}

#[test]
fn missing_config_file_is_an_error() {
    benchloop()
        .args(["--config", "/nonexistent/bench.yaml", "config"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn run_rejects_zero_mock_completion() {
    benchloop()
        .args(["run", "--mock-completion", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a positive number of seconds"));
}
