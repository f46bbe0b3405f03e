//! Reading probe definition files.
//!
//! A definition file is a mapping from probe name to attributes, written
//! as JSON or (for `.yaml`/`.yml` files) YAML. Entries are returned in
//! input-file order and, within a file, in declaration order.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ProbeError, Result, Rule};

/// One unvalidated probe definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProbe {
    pub name: String,
    /// File the definition was read from.
    pub source: PathBuf,
    pub attrs: Value,
}

/// The top-level mapping of a definition file, in declaration order.
///
/// Repeated names are kept so the loader can report them with context
/// instead of letting the parser silently keep the last one.
struct Definitions(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Definitions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DefinitionsVisitor;

        impl<'de> Visitor<'de> for DefinitionsVisitor {
            type Value = Definitions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of probe names to definitions")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Definitions, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, attrs)) = map.next_entry::<String, Value>()? {
                    entries.push((name, attrs));
                }
                Ok(Definitions(entries))
            }

            fn visit_unit<E>(self) -> std::result::Result<Definitions, E>
            where
                E: de::Error,
            {
                Ok(Definitions(Vec::new()))
            }
        }

        deserializer.deserialize_map(DefinitionsVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Format {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Parse the text of one definition file.
fn parse(path: &Path, text: &str) -> Result<Vec<(String, Value)>> {
    let parsed = match Format::of(path) {
        Format::Json => serde_json::from_str::<Definitions>(text).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str::<Definitions>(text).map_err(|e| e.to_string()),
    };
    parsed
        .map(|definitions| definitions.0)
        .map_err(|detail| ProbeError::new(Rule::Parse, detail).at(path))
}

/// Read every file in `paths` and concatenate their definitions.
///
/// Fails with `DuplicateName` when a name appears twice, whether in one
/// file or across files. The error is reported against the later
/// definition and names the file holding the earlier one.
pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RawProbe>> {
    let mut probes = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for path in paths {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))?;
        let entries = parse(path, &text)?;
        info!(
            "Loaded {} probe definitions from {}",
            entries.len(),
            path.display()
        );

        for (name, attrs) in entries {
            if let Some(first) = seen.get(&name) {
                let detail = if first == path {
                    format!("defined twice in {}", path.display())
                } else {
                    format!("already defined in {}", first.display())
                };
                return Err(ProbeError::new(Rule::DuplicateName, detail)
                    .at(path)
                    .for_probe(&name));
            }
            seen.insert(name.clone(), path.to_path_buf());
            probes.push(RawProbe {
                name,
                source: path.to_path_buf(),
                attrs,
            });
        }
    }

    debug!("{} probe definitions in total", probes.len());
    Ok(probes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn names(probes: &[RawProbe]) -> Vec<&str> {
        probes.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_preserves_declaration_order() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "Histograms.json",
            r#"{"ZETA": {"kind": "flag"}, "ALPHA": {"kind": "count"}, "MID": {}}"#,
        );
        let probes = load(&[&path]).unwrap();
        assert_eq!(names(&probes), vec!["ZETA", "ALPHA", "MID"]);
        assert_eq!(probes[0].source, path);
        assert_eq!(probes[0].attrs["kind"], "flag");
    }

    #[test]
    fn test_concatenates_files_in_order() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "a.json", r#"{"B": {}, "A": {}}"#);
        let second = write(&dir, "b.yaml", "Z:\n  kind: flag\nC: {}\n");
        let probes = load(&[&first, &second]).unwrap();
        assert_eq!(names(&probes), vec!["B", "A", "Z", "C"]);
        assert_eq!(probes[2].attrs["kind"], "flag");
    }

    #[test]
    fn test_duplicate_across_files() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "first.json", r#"{"D": {}}"#);
        let second = write(&dir, "second.json", r#"{"D": {}}"#);
        let err = load(&[&first, &second]).unwrap_err();
        assert_eq!(err.rule, Rule::DuplicateName);
        assert_eq!(err.probe.as_deref(), Some("D"));
        let message = err.to_string();
        assert!(message.contains("first.json"), "{message}");
        assert!(message.contains("second.json"), "{message}");
    }

    #[test]
    fn test_duplicate_within_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "dup.json", r#"{"D": {}, "E": {}, "D": {}}"#);
        let err = load(&[&path]).unwrap_err();
        assert_eq!(err.rule, Rule::DuplicateName);
        assert!(err.detail.contains("defined twice"));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.json", "{\n  \"A\": {\n}");
        let err = load(&[&path]).unwrap_err();
        assert_eq!(err.rule, Rule::Parse);
        assert!(err.detail.contains("line"), "{}", err.detail);
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "list.json", "[1, 2]");
        assert_eq!(load(&[&path]).unwrap_err().rule, Rule::Parse);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&[dir.path().join("absent.json")]).unwrap_err();
        assert_eq!(err.rule, Rule::Io);
    }
}
