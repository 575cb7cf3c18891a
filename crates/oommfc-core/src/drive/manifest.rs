use crate::domain::{OommfcError, OommfcResult};
use crate::scripts::serialization::write_text_artifact;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "info.json";

/// Record of one genuine drive, stored as `info.json` in its drive directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveManifest {
    pub drive_number: usize,
    pub date: String,
    pub time: String,
    pub driver: String,
    pub args: serde_json::Value,
}

impl DriveManifest {
    pub fn new(drive_number: usize, driver: &str, args: serde_json::Value) -> Self {
        Self::at(Local::now(), drive_number, driver, args)
    }

    pub fn at(
        timestamp: DateTime<Local>,
        drive_number: usize,
        driver: &str,
        args: serde_json::Value,
    ) -> Self {
        Self {
            drive_number,
            date: timestamp.format("%Y-%m-%d").to_string(),
            time: timestamp.format("%H:%M:%S").to_string(),
            driver: driver.to_string(),
            args,
        }
    }
}

pub fn write_manifest(drive_dir: &Path, manifest: &DriveManifest) -> OommfcResult<()> {
    let path = drive_dir.join(MANIFEST_FILE);
    let text = serde_json::to_string_pretty(manifest).map_err(|source| {
        OommfcError::internal(
            "RUN.MANIFEST_SERIALISE",
            format!("failed to serialise drive manifest: {source}"),
        )
    })?;
    write_text_artifact(&path, &text).map_err(|source| {
        OommfcError::from_io(
            "IO.MANIFEST_WRITE",
            format!("failed to write {}", path.display()),
            &source,
        )
    })
}

pub fn read_manifest(drive_dir: &Path) -> OommfcResult<DriveManifest> {
    let path = drive_dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path).map_err(|source| {
        OommfcError::from_io(
            "IO.MANIFEST_READ",
            format!("failed to read {}", path.display()),
            &source,
        )
    })?;
    serde_json::from_str(&text).map_err(|source| {
        OommfcError::parse_failure(
            "PARSE.MANIFEST",
            format!("{} is not a drive manifest: {source}", path.display()),
        )
    })
}
