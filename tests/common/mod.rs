//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};

/// Common attributes every probe needs, merged with `extra`.
pub fn probe(extra: Value) -> Value {
    let mut attrs = json!({
        "description": "An integration test probe",
        "expires": "never",
        "bug_numbers": [1234],
        "notification_emails": ["telemetry@example.com"],
        "record_in_processes": ["main"],
        "products": ["firefox"],
    });
    if let (Some(map), Value::Object(extra)) = (attrs.as_object_mut(), extra) {
        map.extend(extra);
    }
    attrs
}

/// Write a JSON definition file built from `(name, attributes)` pairs.
pub fn write_definitions(dir: &Path, file: &str, probes: &[(&str, Value)]) -> PathBuf {
    let mut map = serde_json::Map::new();
    for (name, attrs) in probes {
        map.insert(name.to_string(), attrs.clone());
    }
    let path = dir.join(file);
    fs::write(&path, serde_json::to_string_pretty(&Value::Object(map)).unwrap())
        .expect("Failed to write definition file");
    path
}

/// Run one of the generator binaries with the given arguments.
pub fn run<I, S>(binary: &str, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(binary)
        .args(args)
        .output()
        .expect("Failed to run generator")
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
