use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// File-name safe timestamp, e.g. `20261018T081500Z`.
pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(file), &mut hasher)
        .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Pretty JSON plus a trailing newline, written to a sibling temp file and renamed into place.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    data.push(b'\n');

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, &data)
        .with_context(|| format!("failed to write json file: {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("failed to move json file into place: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn compact_timestamp_is_sortable() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 8, 15, 0).single().expect("timestamp");
        assert_eq!(utc_compact_string(ts), "20261018T081500Z");
    }

    #[test]
    fn json_and_digest_round_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("value.json");
        write_json_pretty(&path, &serde_json::json!({ "cases": 8 })).expect("write json");

        let text = fs::read_to_string(&path).expect("read json");
        assert_eq!(text, "{\n  \"cases\": 8\n}\n");
        assert!(!path.with_extension("json.tmp").exists());

        let digest_path = dir.path().join("abc.txt");
        fs::write(&digest_path, "abc").expect("write");
        assert_eq!(
            sha256_file(&digest_path).expect("digest"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
