//! Command-line tests for the subcommands that need no external tools.

use assert_cmd::Command;
use predicates::prelude::*;

fn minvar() -> Command {
    Command::cargo_bin("minvar").unwrap()
}

fn write_inputs(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let reference = dir.join("ref.fasta");
    std::fs::write(&reference, ">CONSENSUS_B\nACGTACGT\n").unwrap();

    let variants = dir.join("calls.vcf");
    std::fs::write(
        &variants,
        "##fileformat=VCFv4.0\n\
         #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
         CONSENSUS_B\t3\t.\tG\tC\t100\tPASS\tDP=500;AF=0.9;SB=0\n\
         CONSENSUS_B\t6\t.\tC\tA\t20\tPASS\tDP=500;AF=0.05;INDEL\n",
    )
    .unwrap();

    (reference, variants)
}

#[test]
fn test_phase_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let (reference, variants) = write_inputs(dir.path());

    minvar()
        .arg("phase")
        .arg("--reference")
        .arg(&reference)
        .arg("--variants")
        .arg(&variants)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(">sample_cons_Pol lofreq\n"))
        .stdout(predicate::str::contains("ACCTACGT"));
}

#[test]
fn test_phase_to_file_with_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let (reference, variants) = write_inputs(dir.path());
    let output = dir.path().join("cns.fasta");

    minvar()
        .args(["--format", "json", "phase"])
        .arg("--reference")
        .arg(&reference)
        .arg("--variants")
        .arg(&variants)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"applied\": 1"))
        .stdout(predicate::str::contains("\"calls\": 2"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with(">sample_cons_Pol lofreq"));
    assert!(written.contains("ACCTACGT"));
}

#[test]
fn test_phase_rejects_reference_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (reference, _) = write_inputs(dir.path());
    let variants = dir.path().join("bad.vcf");
    std::fs::write(&variants, "CONSENSUS_B\t4\t.\tA\tC\t100\tPASS\tAF=0.9\n").unwrap();

    minvar()
        .arg("phase")
        .arg("--reference")
        .arg(&reference)
        .arg("--variants")
        .arg(&variants)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match reference"));
}

#[test]
fn test_phase_missing_reference() {
    let dir = tempfile::tempdir().unwrap();
    let (_, variants) = write_inputs(dir.path());

    minvar()
        .arg("phase")
        .arg("--reference")
        .arg(dir.path().join("absent.fasta"))
        .arg("--variants")
        .arg(&variants)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read reference"));
}

#[test]
fn test_subtype_tsv_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let hits = dir.path().join("loc_res.tsv");
    std::fs::write(
        &hits,
        "r1\tB\t99.0\t60\t0\t0\t1\t60\t1\t60\t1e-20\t100\n\
         r1\tC\t99.0\t60\t0\t0\t1\t60\t1\t60\t1e-20\t100\n\
         r2\tB\t97.0\t60\t2\t0\t1\t60\t1\t60\t1e-18\t90\n",
    )
    .unwrap();
    let csv = dir.path().join("subtype_evidence.csv");

    minvar()
        .args(["-f", "tsv", "subtype"])
        .arg(&hits)
        .arg("--output")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("1\tB\t0.7500"))
        .stdout(predicate::str::contains("2\tC\t0.2500"));

    assert_eq!(std::fs::read_to_string(&csv).unwrap(), "B,0.7500\nC,0.2500\n");
}

#[test]
fn test_prepare_missing_reads() {
    let dir = tempfile::tempdir().unwrap();

    minvar()
        .arg("prepare")
        .arg(dir.path().join("absent.fastq"))
        .arg("--work-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("input reads not found"));
}

#[test]
fn test_prepare_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"max_reads": 0}"#).unwrap();

    minvar()
        .arg("prepare")
        .arg(dir.path().join("reads.fastq"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_reads"));
}
