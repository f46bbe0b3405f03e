//! Product version tags and probe expiry.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("Invalid version regex pattern"));

/// A dotted numeric version such as `70` or `68.0.1`.
///
/// Comparison treats missing components as zero, so `70` and `70.0` are
/// equal while keeping their original spelling for emission.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    parts: Vec<u64>,
}

impl Version {
    pub fn parse(text: &str) -> Option<Version> {
        if !VERSION_RE.is_match(text) {
            return None;
        }
        let parts = text
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Version {
            text: text.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s).ok_or_else(|| format!("'{s}' is not a dotted numeric version"))
    }
}

/// When a probe stops collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    Never,
    Version(Version),
}

impl Expiry {
    pub fn parse(text: &str) -> Option<Expiry> {
        if text == "never" {
            return Some(Expiry::Never);
        }
        Version::parse(text).map(Expiry::Version)
    }

    /// The spelling written into the string tables and the JSON artifact.
    pub fn as_str(&self) -> &str {
        match self {
            Expiry::Never => "never",
            Expiry::Version(version) => version.as_str(),
        }
    }

    /// A probe is expired once the application reaches its expiry version.
    pub fn is_expired_at(&self, app_version: &Version) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::Version(version) => version <= app_version,
        }
    }
}
