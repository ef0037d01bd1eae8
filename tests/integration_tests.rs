use assert_cmd::Command;
use predicates::str::{contains, diff};

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.assert().success().stdout(contains("mars"));
}

#[test]
fn assembles_imp() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("assemble").arg("tests/files/imp.red");
    cmd.assert().success().stdout(diff("[0x0, 0x15000001]\n"));
}

#[test]
fn assembles_dwarf() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("assemble").arg("tests/files/dwarf.red");
    cmd.assert()
        .success()
        .stdout(diff("[0x1, 0x1000000, 0x21004fff, 0x12000ffe, 0x41000ffe]\n"));
}

#[test]
fn check_reports_range_error() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("check").arg("tests/files/bad.red");
    cmd.assert().failure().stderr(contains("asm::range"));

    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("check").arg("tests/files/dwarf.red");
    cmd.assert().success().stdout(contains("no errors found!"));
}

#[test]
fn compiles_and_disassembles() {
    let dest = std::env::temp_dir().join(format!("mars-imp-{}.rcw", std::process::id()));

    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("compile").arg("tests/files/imp.red").arg(&dest);
    cmd.assert().success();
    assert_eq!(
        std::fs::read(&dest).unwrap(),
        vec![0, 0, 0, 0, 0x15, 0, 0, 1]
    );

    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("disasm").arg(&dest);
    cmd.assert()
        .success()
        .stdout(diff(">   0  15000001  MOV 0 1\n"));

    let _ = std::fs::remove_file(dest);
}

#[test]
fn disassembles_builtin() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("disasm").arg("dwarf");
    cmd.assert()
        .success()
        .stdout(contains(">   1  21004fff  ADD #4 -1"))
        .stdout(contains("MOV #0 @-2"));
}

#[test]
fn dat_loses_to_imp() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("battle")
        .arg("tests/files/dat.red")
        .arg("imp")
        .arg("--seed")
        .arg("7")
        .arg("--minimal");
    cmd.assert()
        .success()
        .stdout(contains("Violation warrior A"))
        .stdout(contains("executed data"))
        .stdout(contains("Winner B (imp) after 1 ticks"));
}

#[test]
fn imps_draw() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("battle")
        .arg("imp")
        .arg("tests/files/imp.red")
        .arg("--max-ticks")
        .arg("50")
        .arg("--minimal");
    cmd.assert()
        .success()
        .stdout(contains("Draw no winner after 50 ticks"));
}

#[test]
fn battle_prints_map() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("battle")
        .arg("imp")
        .arg("dwarf")
        .arg("--width")
        .arg("16")
        .arg("--height")
        .arg("4")
        .arg("--max-ticks")
        .arg("10")
        .arg("--map")
        .arg("--minimal");
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();
    let rows: Vec<&str> = stdout
        .lines()
        .filter(|line| line.len() == 16 && !line.contains(' '))
        .collect();
    assert_eq!(rows.len(), 4);
}

#[test]
fn traces_ticks() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.env("MARS_TRACE", "1")
        .arg("battle")
        .arg("imp")
        .arg("imp")
        .arg("--max-ticks")
        .arg("4")
        .arg("--minimal");
    cmd.assert().success().stderr(contains("MOV 0 1"));
}

#[test]
fn rejects_oversized_warriors() {
    let mut cmd = Command::cargo_bin("mars").unwrap();
    cmd.arg("battle")
        .arg("dwarf")
        .arg("dwarf")
        .arg("--width")
        .arg("4")
        .arg("--height")
        .arg("2")
        .arg("--minimal");
    cmd.assert().failure().stderr(contains("load::capacity"));
}
