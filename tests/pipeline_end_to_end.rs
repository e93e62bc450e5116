//! Exercises the Output Pipeline, Integrity Validator, and Local
//! Destination together the way `orchestrator::run_once` chains them,
//! without requiring a live database connection.

use db_backup4j::checksum::compute_checksum;
use db_backup4j::destination::{Destination, LocalDestination};
use db_backup4j::model::{is_backup_filename, ChecksumAlgorithm};
use db_backup4j::pipeline::{artifact_file_name, sanitize_database_name, ArtifactWriter};
use db_backup4j::validate::validate_artifact;
use tempfile::tempdir;

#[test]
fn uncompressed_dump_round_trips_through_write_validate_checksum_deliver() {
    let scratch = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();

    let at = chrono::DateTime::parse_from_rfc3339("2026-02-14T09:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let file_name = artifact_file_name("Acme App", at, false);
    assert_eq!(sanitize_database_name("Acme App"), "Acme_App");
    assert!(is_backup_filename(&file_name));

    let path = scratch.path().join(&file_name);
    let mut writer = ArtifactWriter::create(&path, false).unwrap();
    writer
        .write_all(b"DROP TABLE IF EXISTS users;\nCREATE TABLE users (id INT);\nINSERT INTO users VALUES (1);\n")
        .unwrap();
    let (size, inline_digest) = writer.finish().unwrap();
    assert!(size > 0);

    let outcome = validate_artifact(&path);
    assert!(outcome.is_valid(), "{:?}", outcome.findings);

    let checksum = compute_checksum(&path, ChecksumAlgorithm::Sha256, None).unwrap();
    assert_eq!(checksum.hex_digest, inline_digest);

    let destination = LocalDestination::new(dest_dir.path());
    let artifact = destination.deliver(&path).unwrap();
    assert_eq!(artifact.byte_size, size);

    let listed = destination.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, file_name);
}

#[test]
fn compressed_dump_is_flagged_valid_after_decompression_sampling() {
    let scratch = tempdir().unwrap();
    let at = chrono::DateTime::parse_from_rfc3339("2026-02-14T09:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let file_name = artifact_file_name("app", at, true);
    assert!(file_name.ends_with(".sql.gz"));

    let path = scratch.path().join(&file_name);
    let mut writer = ArtifactWriter::create(&path, true).unwrap();
    writer
        .write_all(b"CREATE TABLE orders (id INT);\nINSERT INTO orders VALUES (1);\n")
        .unwrap();
    writer.finish().unwrap();

    let outcome = validate_artifact(&path);
    assert!(outcome.is_valid(), "{:?}", outcome.findings);
}

#[test]
fn artifact_with_embedded_error_text_fails_validation_before_delivery() {
    let scratch = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let path = scratch.path().join("broken_20260101_000000.sql");

    let mut writer = ArtifactWriter::create(&path, false).unwrap();
    writer
        .write_all(b"CREATE TABLE t (id INT);\nERROR 2002 (HY000): Connection refused")
        .unwrap();
    writer.finish().unwrap();

    let outcome = validate_artifact(&path);
    assert!(!outcome.is_valid());

    // Delivery itself doesn't refuse on a failed validation — that decision
    // belongs to the orchestrator, which checks `ValidationOutcome` before
    // deciding whether to still deliver. This test only confirms delivery
    // mechanics keep working on an artifact the validator rejected.
    let destination = LocalDestination::new(dest_dir.path());
    let artifact = destination.deliver(&path).unwrap();
    assert!(artifact.byte_size > 0);
}
