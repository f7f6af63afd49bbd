// tests/cli_tests.rs
use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn single_cycle_prints_a0_a1_pair() {
    // addi a0, x0, 5 ; addi a1, x0, 7 ; halt
    // 0x00500513 / 0x00700593, one hex byte per line, little endian
    let program = "13\n05\n50\n00\n93\n05\n70\n00\n00\n00\n00\n00\n";
    let file = write_temp(program);

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["single-cycle", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(5,7)"));
}

#[test]
fn proc_prints_timing_table_and_stats() {
    let file = write_temp("ab120024 0 1 2 3\n");

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["proc", "--timing", "--trace"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1\t1\t2\t3\t4\t5"))
        .stdout(predicate::str::contains("Cycles: 5"))
        .stdout(predicate::str::contains("Instructions Retired: 1"));
}

#[test]
fn proc_emits_json_stats() {
    let file = write_temp("ab120024 0 1 2 3\nab120028 1 2 1 -1\n");

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["proc", "--json", "--trace"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"retired_instruction\": 2"));
}

#[test]
fn proc_rejects_zero_result_buses() {
    let file = write_temp("ab120024 0 1 2 3\n");

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["proc", "--result-buses", "0", "--trace"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("result bus"));
}

#[test]
fn proc_reports_malformed_trace_line() {
    let file = write_temp("ab120024 0 1 2\n");

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["proc", "--trace"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn predict_scores_an_all_taken_stream() {
    let trace = "40000000 1\n".repeat(10);
    let file = write_temp(&trace);

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["predict", "--trace"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Conditional Branches: 10"))
        .stdout(predicate::str::contains("Mispredictions: 0"));
}

#[test]
fn predict_emits_json_with_large_config() {
    let trace = "40000000 1\n40000010 0\n40000020 1 u\n";
    let file = write_temp(trace);

    Command::cargo_bin("archsim_rust")
        .unwrap()
        .args(["predict", "--large", "--json", "--trace"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"conditional_branches\": 2"));
}
