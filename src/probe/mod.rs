//! The validated probe data model.
//!
//! A [`Probe`] is either a [`Histogram`] or an [`Event`]. Both share a
//! [`ProbeMeta`] record with the attributes every probe must declare.
//! Probes are built once by the validator and never mutated afterwards.
//!
//! # Module Organization
//!
//! - [`fields`]: typed access to raw attributes (defaults, aliases, unknown keys)
//! - [`histogram`]: histogram kinds and their rules
//! - [`buckets`]: bucket lower bound computation
//! - [`event`]: event rules and method/object expansion
//! - [`version`]: version grammar and expiry

pub mod buckets;
pub mod event;
pub mod fields;
pub mod histogram;
pub mod version;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Limits;
use crate::error::{ProbeError, Result, Rule};
use fields::Fields;

pub use event::Event;
pub use histogram::{Bounds, Histogram, HistogramKind};
pub use version::{Expiry, Version};

static PROBE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").expect("Invalid probe name regex pattern")
});

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("Invalid identifier regex pattern")
});

/// Attributes accepted on every probe, including their legacy aliases.
pub(crate) const COMMON_FIELDS: &[&str] = &[
    "kind",
    "description",
    "expires",
    "expires_in_version",
    "expiry_version",
    "bug_numbers",
    "notification_emails",
    "alert_emails",
    "record_in_processes",
    "products",
    "operating_systems",
    "release_channel_collection",
    "releaseChannelCollection",
    "keyed",
];

/// Check a probe name against the common naming rule.
pub(crate) fn check_probe_name(name: &str, limits: &Limits) -> Result<()> {
    if name.is_empty() {
        return Err(ProbeError::new(Rule::Name, "probe name must not be empty"));
    }
    if name.len() > limits.max_name_len {
        return Err(ProbeError::new(
            Rule::Name,
            format!(
                "name is {} characters long, the limit is {}",
                name.len(),
                limits.max_name_len
            ),
        ));
    }
    if !PROBE_NAME_RE.is_match(name) {
        return Err(ProbeError::new(
            Rule::Name,
            format!("'{name}' must match [A-Za-z][A-Za-z0-9_.]*"),
        ));
    }
    Ok(())
}

/// Check an identifier (label, key, method, object, extra key).
pub(crate) fn check_identifier(what: &str, value: &str, max_len: Option<usize>) -> Result<()> {
    if !IDENTIFIER_RE.is_match(value) {
        return Err(ProbeError::new(
            Rule::Name,
            format!("{what} '{value}' must match [A-Za-z][A-Za-z0-9_]*"),
        ));
    }
    if let Some(max) = max_len {
        if value.len() > max {
            return Err(ProbeError::new(
                Rule::Name,
                format!("{what} '{value}' is longer than {max} characters"),
            ));
        }
    }
    Ok(())
}

/// Reject repeated entries in a list of identifiers.
pub(crate) fn check_unique<'a>(what: &str, values: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(ProbeError::new(
                Rule::Name,
                format!("{what} '{value}' is listed more than once"),
            ));
        }
    }
    Ok(())
}

/// A closed enumeration of attribute values.
pub trait Enumeration: Copy + Ord + 'static {
    /// Canonical attribute name, used in diagnostics.
    const FIELD: &'static str;
    /// All variants in canonical order.
    const VARIANTS: &'static [Self];
    /// A variant that must be listed alone, if any.
    const EXCLUSIVE: Option<Self> = None;

    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.name() == name)
    }
}

/// Parse a non-empty list of enumeration values into canonical order.
pub(crate) fn parse_enum_set<T: Enumeration>(values: &[&str]) -> Result<Vec<T>> {
    if values.is_empty() {
        return Err(ProbeError::new(
            Rule::Enum,
            format!("{} must not be empty", T::FIELD),
        ));
    }
    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let variant = T::from_name(value).ok_or_else(|| {
            let valid: Vec<&str> = T::VARIANTS.iter().map(|v| v.name()).collect();
            ProbeError::new(
                Rule::Enum,
                format!(
                    "'{value}' is not a valid {} value. Valid values: {}",
                    T::FIELD,
                    valid.join(", ")
                ),
            )
        })?;
        if parsed.contains(&variant) {
            return Err(ProbeError::new(
                Rule::Enum,
                format!("'{value}' is listed more than once in {}", T::FIELD),
            ));
        }
        parsed.push(variant);
    }
    if let Some(exclusive) = T::EXCLUSIVE {
        if parsed.len() > 1 && parsed.contains(&exclusive) {
            return Err(ProbeError::new(
                Rule::Enum,
                format!("'{}' must appear alone in {}", exclusive.name(), T::FIELD),
            ));
        }
    }
    parsed.sort();
    Ok(parsed)
}

/// Processes a probe may record in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Process {
    Main,
    Content,
    Gpu,
    Rdd,
    Socket,
    Utility,
    GmPlugin,
    AllChildren,
    All,
}

impl Process {
    pub fn mask(self) -> u32 {
        match self {
            Process::Main => 1 << 0,
            Process::Content => 1 << 1,
            Process::Gpu => 1 << 2,
            Process::Rdd => 1 << 3,
            Process::Socket => 1 << 4,
            Process::Utility => 1 << 5,
            Process::GmPlugin => 1 << 6,
            Process::AllChildren => u32::MAX ^ 1,
            Process::All => u32::MAX,
        }
    }
}

impl Enumeration for Process {
    const FIELD: &'static str = "record_in_processes";
    const VARIANTS: &'static [Self] = &[
        Process::Main,
        Process::Content,
        Process::Gpu,
        Process::Rdd,
        Process::Socket,
        Process::Utility,
        Process::GmPlugin,
        Process::AllChildren,
        Process::All,
    ];
    const EXCLUSIVE: Option<Self> = Some(Process::All);

    fn name(self) -> &'static str {
        match self {
            Process::Main => "main",
            Process::Content => "content",
            Process::Gpu => "gpu",
            Process::Rdd => "rdd",
            Process::Socket => "socket",
            Process::Utility => "utility",
            Process::GmPlugin => "gmplugin",
            Process::AllChildren => "all_children",
            Process::All => "all",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "all_childs" => Some(Process::AllChildren),
            _ => Self::VARIANTS.iter().copied().find(|v| v.name() == name),
        }
    }
}

/// Products a probe is collected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Product {
    Firefox,
    Fennec,
    Geckoview,
    GeckoviewStreaming,
    Thunderbird,
}

impl Product {
    pub fn mask(self) -> u32 {
        match self {
            Product::Firefox => 1 << 0,
            Product::Fennec => 1 << 1,
            Product::Geckoview => 1 << 2,
            Product::GeckoviewStreaming => 1 << 3,
            Product::Thunderbird => 1 << 4,
        }
    }
}

impl Enumeration for Product {
    const FIELD: &'static str = "products";
    const VARIANTS: &'static [Self] = &[
        Product::Firefox,
        Product::Fennec,
        Product::Geckoview,
        Product::GeckoviewStreaming,
        Product::Thunderbird,
    ];

    fn name(self) -> &'static str {
        match self {
            Product::Firefox => "firefox",
            Product::Fennec => "fennec",
            Product::Geckoview => "geckoview",
            Product::GeckoviewStreaming => "geckoview_streaming",
            Product::Thunderbird => "thunderbird",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperatingSystem {
    Mac,
    Linux,
    Windows,
    Android,
    Unix,
    All,
}

impl Enumeration for OperatingSystem {
    const FIELD: &'static str = "operating_systems";
    const VARIANTS: &'static [Self] = &[
        OperatingSystem::Mac,
        OperatingSystem::Linux,
        OperatingSystem::Windows,
        OperatingSystem::Android,
        OperatingSystem::Unix,
        OperatingSystem::All,
    ];
    const EXCLUSIVE: Option<Self> = Some(OperatingSystem::All);

    fn name(self) -> &'static str {
        match self {
            OperatingSystem::Mac => "mac",
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
            OperatingSystem::Android => "android",
            OperatingSystem::Unix => "unix",
            OperatingSystem::All => "all",
        }
    }
}

/// Release channel collection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dataset {
    #[default]
    OptIn,
    OptOut,
}

impl Dataset {
    pub fn parse(text: &str) -> Option<Dataset> {
        match text {
            "opt-in" => Some(Dataset::OptIn),
            "opt-out" => Some(Dataset::OptOut),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dataset::OptIn => "opt-in",
            Dataset::OptOut => "opt-out",
        }
    }

    /// The consumer's dataset constant.
    pub fn cpp_name(self) -> &'static str {
        match self {
            Dataset::OptIn => "nsITelemetry::DATASET_PRERELEASE_CHANNELS",
            Dataset::OptOut => "nsITelemetry::DATASET_ALL_CHANNELS",
        }
    }
}

/// Attributes shared by histograms and events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMeta {
    pub name: String,
    pub description: String,
    pub expires: Expiry,
    pub bug_numbers: Vec<u64>,
    pub notification_emails: Vec<String>,
    pub record_in_processes: Vec<Process>,
    pub products: Vec<Product>,
    pub operating_systems: Vec<OperatingSystem>,
    pub dataset: Dataset,
    pub keyed: bool,
    /// Definition file the probe was declared in.
    pub source: PathBuf,
}

impl ProbeMeta {
    /// Read and validate the common attributes. The name itself is checked
    /// by the caller because events and histograms differ in its shape.
    pub(crate) fn from_fields(name: &str, source: &Path, fields: &Fields<'_>) -> Result<ProbeMeta> {
        let description = fields.required_str("description", &[], Rule::Type)?;
        if description.trim().is_empty() {
            return Err(ProbeError::new(
                Rule::MissingField,
                "description must not be empty",
            ));
        }

        let expires_text =
            fields.required_str("expires", &["expires_in_version", "expiry_version"], Rule::Expiry)?;
        let expires = Expiry::parse(expires_text).ok_or_else(|| {
            ProbeError::new(
                Rule::Expiry,
                format!("'{expires_text}' is neither \"never\" nor a version like 70 or 68.0.1"),
            )
        })?;

        let bug_numbers = fields.required_u64_list("bug_numbers", Rule::BugList)?;
        if bug_numbers.is_empty() {
            return Err(ProbeError::new(
                Rule::BugList,
                "bug_numbers must list at least one bug",
            ));
        }
        if let Some(zero) = bug_numbers.iter().find(|bug| **bug == 0) {
            return Err(ProbeError::new(
                Rule::BugList,
                format!("bug number {zero} is not positive"),
            ));
        }

        let emails =
            fields.required_str_list("notification_emails", &["alert_emails"], Rule::Contact)?;
        if emails.is_empty() {
            return Err(ProbeError::new(
                Rule::Contact,
                "notification_emails must list at least one contact",
            ));
        }
        if emails.iter().any(|email| email.trim().is_empty()) {
            return Err(ProbeError::new(
                Rule::Contact,
                "notification_emails must not contain empty entries",
            ));
        }

        let processes = fields.required_str_list("record_in_processes", &[], Rule::Enum)?;
        let record_in_processes = parse_enum_set::<Process>(&processes)?;

        let products = fields.required_str_list("products", &[], Rule::Enum)?;
        let products = parse_enum_set::<Product>(&products)?;

        let operating_systems = match fields.str_list("operating_systems", &[], Rule::Enum)? {
            Some(values) => parse_enum_set::<OperatingSystem>(&values)?,
            None => vec![OperatingSystem::All],
        };

        let dataset = match fields.str(
            "release_channel_collection",
            &["releaseChannelCollection"],
            Rule::Enum,
        )? {
            Some(text) => Dataset::parse(text).ok_or_else(|| {
                ProbeError::new(
                    Rule::Enum,
                    format!("release_channel_collection must be opt-in or opt-out, not '{text}'"),
                )
            })?,
            None => Dataset::default(),
        };

        let keyed = fields.bool("keyed")?.unwrap_or(false);

        Ok(ProbeMeta {
            name: name.to_string(),
            description: description.to_string(),
            expires,
            bug_numbers,
            notification_emails: emails.into_iter().map(String::from).collect(),
            record_in_processes,
            products,
            operating_systems,
            dataset,
            keyed,
            source: source.to_path_buf(),
        })
    }

    pub fn process_mask(&self) -> u32 {
        self.record_in_processes
            .iter()
            .fold(0, |mask, process| mask | process.mask())
    }

    pub fn product_mask(&self) -> u32 {
        self.products
            .iter()
            .fold(0, |mask, product| mask | product.mask())
    }
}

/// A validated probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Histogram(Histogram),
    Event(Event),
}

impl Probe {
    pub fn meta(&self) -> &ProbeMeta {
        match self {
            Probe::Histogram(histogram) => &histogram.meta,
            Probe::Event(event) => &event.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }
}
