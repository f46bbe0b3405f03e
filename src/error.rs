//! Diagnostics produced while loading, validating and emitting probes.
//!
//! Every error is fatal and carries enough context to print a single
//! `path:probe: rule: detail` line. Warnings are collected next to the
//! validated probes and never stop generation.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The rule a probe definition (or the generator itself) violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// A definition file is not well-formed.
    Parse,
    /// A probe name occurs more than once across the inputs.
    DuplicateName,
    /// A required attribute is absent or empty.
    MissingField,
    /// An attribute is not valid for this kind of probe.
    UnknownField,
    /// An attribute was supplied under both its name and an alias.
    FieldConflict,
    /// An attribute has the wrong value type.
    Type,
    Name,
    Enum,
    Range,
    BugList,
    Contact,
    Expiry,
    /// A table index would not fit its declared width.
    OffsetOverflow,
    Io,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Parse => "ParseError",
            Rule::DuplicateName => "DuplicateName",
            Rule::MissingField => "MissingField",
            Rule::UnknownField => "UnknownField",
            Rule::FieldConflict => "FieldConflict",
            Rule::Type => "TypeError",
            Rule::Name => "NameError",
            Rule::Enum => "EnumError",
            Rule::Range => "RangeError",
            Rule::BugList => "BugListError",
            Rule::Contact => "ContactError",
            Rule::Expiry => "ExpiryError",
            Rule::OffsetOverflow => "OffsetOverflow",
            Rule::Io => "IOError",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal generator error.
///
/// Errors raised deep inside field parsing carry only a rule and a detail;
/// the validator attaches the source path and probe name on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError {
    pub path: Option<PathBuf>,
    pub probe: Option<String>,
    pub rule: Rule,
    pub detail: String,
}

impl ProbeError {
    pub fn new(rule: Rule, detail: impl Into<String>) -> Self {
        ProbeError {
            path: None,
            probe: None,
            rule,
            detail: detail.into(),
        }
    }

    /// Attach the source path, keeping one that is already set.
    #[must_use]
    pub fn at(mut self, path: &Path) -> Self {
        if self.path.is_none() {
            self.path = Some(path.to_path_buf());
        }
        self
    }

    /// Attach the probe name, keeping one that is already set.
    #[must_use]
    pub fn for_probe(mut self, name: &str) -> Self {
        if self.probe.is_none() {
            self.probe = Some(name.to_string());
        }
        self
    }

    pub fn io(path: &Path, err: io::Error) -> Self {
        ProbeError::new(Rule::Io, err.to_string()).at(path)
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, &self.probe) {
            (Some(path), Some(probe)) => {
                write!(f, "{}:{probe}: {}: {}", path.display(), self.rule, self.detail)
            }
            (Some(path), None) => write!(f, "{}: {}: {}", path.display(), self.rule, self.detail),
            (None, Some(probe)) => write!(f, "{probe}: {}: {}", self.rule, self.detail),
            (None, None) => write!(f, "{}: {}", self.rule, self.detail),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        ProbeError::new(Rule::Io, err.to_string())
    }
}

impl From<fmt::Error> for ProbeError {
    fn from(_: fmt::Error) -> Self {
        ProbeError::new(Rule::Io, "failed to format generated output")
    }
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;

/// Non-fatal findings reported on standard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The probe's expiry version is not newer than the application version.
    Expired {
        path: PathBuf,
        probe: String,
        expires: String,
        app_version: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Expired {
                path,
                probe,
                expires,
                app_version,
            } => write!(
                f,
                "{}:{probe}: expired in version {expires} (building {app_version}); code is still generated",
                path.display()
            ),
        }
    }
}
