//! Integrity Validator: post-write artifact inspection (spec.md §4.C).
//!
//! Distinct from [`crate::checksum`], which fingerprints bytes — this module
//! judges whether those bytes look like a usable dump: present, non-empty,
//! readable, and (heuristically) actually SQL rather than an error page or
//! truncated stream.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::model::{Severity, ValidationFinding, ValidationOutcome};

const MIN_WARN_BYTES: u64 = 100;
const SAMPLE_BYTES: usize = 1024;

/// Inspect the artifact at `path`, decompressing a small sample first if it
/// looks gzip-compressed by name.
pub fn validate_artifact(path: &Path) -> ValidationOutcome {
    let mut findings = Vec::new();

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            findings.push(error(format!("artifact does not exist or is unreadable: {e}")));
            return ValidationOutcome {
                artifact_path: path.to_path_buf(),
                findings,
            };
        }
    };

    if !metadata.is_file() {
        findings.push(error("artifact path is not a regular file".to_string()));
        return ValidationOutcome {
            artifact_path: path.to_path_buf(),
            findings,
        };
    }

    if metadata.len() == 0 {
        findings.push(error("artifact is empty".to_string()));
        return ValidationOutcome {
            artifact_path: path.to_path_buf(),
            findings,
        };
    }

    if metadata.len() < MIN_WARN_BYTES {
        findings.push(warning(format!(
            "artifact is suspiciously small ({} bytes)",
            metadata.len()
        )));
    }

    let is_gzip = path
        .to_str()
        .map(|s| s.ends_with(".gz") || s.ends_with(".gzip"))
        .unwrap_or(false);

    match read_sample(path, is_gzip) {
        Ok(sample) => findings.extend(inspect_sql_sample(&sample)),
        Err(e) => findings.push(error(format!("artifact could not be read: {e}"))),
    }

    ValidationOutcome {
        artifact_path: path.to_path_buf(),
        findings,
    }
}

fn read_sample(path: &Path, is_gzip: bool) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; SAMPLE_BYTES];

    if is_gzip {
        let mut decoder = GzDecoder::new(file);
        let n = read_up_to(&mut decoder, &mut buf)?;
        buf.truncate(n);
    } else {
        let mut file = file;
        let n = read_up_to(&mut file, &mut buf)?;
        buf.truncate(n);
    }
    Ok(buf)
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Heuristic content check on the first sampled bytes: expect to see at
/// least one DDL/DML keyword, and flag anything that looks like a captured
/// error message rather than SQL.
fn inspect_sql_sample(sample: &[u8]) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let text = String::from_utf8_lossy(sample);
    let upper = text.to_ascii_uppercase();

    let has_sql_marker = ["CREATE TABLE", "DROP TABLE", "INSERT INTO"]
        .iter()
        .any(|kw| upper.contains(kw));
    if !has_sql_marker {
        findings.push(warning(
            "no recognizable SQL statement found in the sampled prefix".to_string(),
        ));
    }

    if upper.contains("ERROR") || upper.contains("FAILED") {
        findings.push(error(
            "sampled content contains an ERROR/FAILED marker, suggesting a captured error message"
                .to_string(),
        ));
    }

    findings
}

fn error(message: String) -> ValidationFinding {
    ValidationFinding {
        severity: Severity::Error,
        message,
    }
}

fn warning(message: String) -> ValidationFinding {
    ValidationFinding {
        severity: Severity::Warning,
        message,
    }
}
