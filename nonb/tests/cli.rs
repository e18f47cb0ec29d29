use std::error::Error;

use assert_cmd::Command;
use assert_fs::fixture::{FileWriteStr, PathChild};
use assert_fs::TempDir;
use predicates::prelude::predicate;

const FASTA: &str = ">telo\nTTAGGGTTAGGGTTAGGGTTAGGG\n>gaa\nGAAGAAGAAGAAGAAGAA\n";

#[test]
fn scan_writes_csv_with_motifs() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let fasta = temp_dir.child("input.fa");
    fasta.write_str(FASTA)?;
    let output = temp_dir.child("motifs.csv");

    Command::cargo_bin("nonb")?
        .arg("scan")
        .arg("-i")
        .arg(fasta.path())
        .arg("-o")
        .arg(output.path())
        .arg("--quiet")
        .assert()
        .success();

    let contents = std::fs::read_to_string(output.path())?;
    assert!(contents.lines().count() > 1, "no motif rows written");
    assert!(contents.contains("Telomeric G4"));
    assert!(contents.contains("Sticky DNA"));
    Ok(())
}

#[test]
fn scan_filters_classes() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let fasta = temp_dir.child("input.fa");
    fasta.write_str(FASTA)?;
    let output = temp_dir.child("motifs.csv");

    Command::cargo_bin("nonb")?
        .arg("scan")
        .arg("-i")
        .arg(fasta.path())
        .arg("-o")
        .arg(output.path())
        .arg("--quiet")
        .arg("-c")
        .arg("Triplex")
        .assert()
        .success();

    let contents = std::fs::read_to_string(output.path())?;
    assert!(contents.contains("Sticky DNA"));
    assert!(!contents.contains("Telomeric G4"));
    Ok(())
}

#[test]
fn strict_mode_rejects_unknown_classes() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let fasta = temp_dir.child("input.fa");
    fasta.write_str(FASTA)?;

    Command::cargo_bin("nonb")?
        .arg("scan")
        .arg("-i")
        .arg(fasta.path())
        .arg("--quiet")
        .arg("--strict")
        .arg("-c")
        .arg("B-DNA")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn inspect_reports_composition() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let fasta = temp_dir.child("input.fa");
    fasta.write_str(">mix\nATGCNNNN\n")?;

    Command::cargo_bin("nonb")?
        .arg("inspect")
        .arg("-i")
        .arg(fasta.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("GC%: 50.00"))
        .stdout(predicate::str::contains("N=4"));
    Ok(())
}
