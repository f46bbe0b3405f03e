//! Histogram kinds and their validation rules.

use std::path::Path;

use crate::config::Limits;
use crate::error::{ProbeError, Result, Rule};

use super::buckets::{exponential_buckets, linear_buckets};
use super::fields::Fields;
use super::{check_identifier, check_probe_name, check_unique, ProbeMeta, COMMON_FIELDS};

/// Largest `high` that still leaves room for the `INT_MAX` sentinel.
const MAX_HIGH: u64 = (i32::MAX - 1) as u64;

/// Bucket layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub low: u32,
    pub high: u32,
    pub n_buckets: u32,
}

impl Bounds {
    const FIXED: Bounds = Bounds {
        low: 1,
        high: 2,
        n_buckets: 3,
    };

    /// One bucket per value in `1..=n_values`, plus the underflow bucket.
    fn values(n_values: u32) -> Bounds {
        Bounds {
            low: 1,
            high: n_values,
            n_buckets: n_values + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistogramKind {
    Boolean,
    Flag,
    Count,
    Enumerated { n_values: u32 },
    Categorical { labels: Vec<String> },
    Linear(Bounds),
    Exponential(Bounds),
}

impl HistogramKind {
    pub const NAMES: &'static [&'static str] = &[
        "boolean",
        "flag",
        "count",
        "enumerated",
        "categorical",
        "linear",
        "exponential",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HistogramKind::Boolean => "boolean",
            HistogramKind::Flag => "flag",
            HistogramKind::Count => "count",
            HistogramKind::Enumerated { .. } => "enumerated",
            HistogramKind::Categorical { .. } => "categorical",
            HistogramKind::Linear(_) => "linear",
            HistogramKind::Exponential(_) => "exponential",
        }
    }

    /// The consumer's kind constant. Enumerated histograms are linear.
    pub fn cpp_name(&self) -> &'static str {
        match self {
            HistogramKind::Boolean => "nsITelemetry::HISTOGRAM_BOOLEAN",
            HistogramKind::Flag => "nsITelemetry::HISTOGRAM_FLAG",
            HistogramKind::Count => "nsITelemetry::HISTOGRAM_COUNT",
            HistogramKind::Enumerated { .. } | HistogramKind::Linear(_) => {
                "nsITelemetry::HISTOGRAM_LINEAR"
            }
            HistogramKind::Categorical { .. } => "nsITelemetry::HISTOGRAM_CATEGORICAL",
            HistogramKind::Exponential(_) => "nsITelemetry::HISTOGRAM_EXPONENTIAL",
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            HistogramKind::Boolean | HistogramKind::Flag | HistogramKind::Count => Bounds::FIXED,
            HistogramKind::Enumerated { n_values } => Bounds::values(*n_values),
            HistogramKind::Categorical { labels } => Bounds::values(labels.len() as u32),
            HistogramKind::Linear(bounds) | HistogramKind::Exponential(bounds) => *bounds,
        }
    }

    /// Attributes a kind accepts on top of the common ones.
    fn extra_fields(kind: &str) -> &'static [&'static str] {
        match kind {
            "enumerated" => &["keys", "n_values", "high"],
            "categorical" => &["keys", "labels"],
            "linear" | "exponential" => &["keys", "low", "high", "n_buckets"],
            _ => &["keys"],
        }
    }
}

/// A validated histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub meta: ProbeMeta,
    pub kind: HistogramKind,
    /// Allowed keys of a keyed histogram; empty means any key.
    pub keys: Vec<String>,
}

impl Histogram {
    pub(crate) fn from_fields(
        name: &str,
        kind: &str,
        source: &Path,
        fields: &Fields<'_>,
        limits: &Limits,
    ) -> Result<Histogram> {
        let allowed: Vec<&str> = COMMON_FIELDS
            .iter()
            .chain(HistogramKind::extra_fields(kind))
            .copied()
            .collect();
        fields.check_known(&allowed, kind)?;
        check_probe_name(name, limits)?;

        let meta = ProbeMeta::from_fields(name, source, fields)?;
        let kind = match kind {
            "boolean" => HistogramKind::Boolean,
            "flag" => HistogramKind::Flag,
            "count" => HistogramKind::Count,
            "enumerated" => parse_enumerated(fields)?,
            "categorical" => parse_categorical(fields, limits)?,
            "linear" => HistogramKind::Linear(parse_bounds(fields)?),
            "exponential" => HistogramKind::Exponential(parse_bounds(fields)?),
            other => {
                return Err(ProbeError::new(
                    Rule::Enum,
                    format!(
                        "'{other}' is not a histogram kind. Valid kinds: {}",
                        HistogramKind::NAMES.join(", ")
                    ),
                ))
            }
        };
        let keys = parse_keys(fields, meta.keyed, limits)?;

        Ok(Histogram { meta, kind, keys })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn low(&self) -> u32 {
        self.kind.bounds().low
    }

    pub fn high(&self) -> u32 {
        self.kind.bounds().high
    }

    pub fn n_buckets(&self) -> u32 {
        self.kind.bounds().n_buckets
    }

    pub fn labels(&self) -> &[String] {
        match &self.kind {
            HistogramKind::Categorical { labels } => labels,
            _ => &[],
        }
    }

    /// Bucket lower bounds, `n_buckets` of them, without the sentinel.
    pub fn ranges(&self) -> Vec<i64> {
        let Bounds {
            low,
            high,
            n_buckets,
        } = self.kind.bounds();
        match self.kind {
            HistogramKind::Exponential(_) => exponential_buckets(low, high, n_buckets),
            _ => linear_buckets(low, high, n_buckets),
        }
    }
}

fn to_u32(key: &str, value: u64) -> Result<u32> {
    if value > MAX_HIGH {
        return Err(ProbeError::new(
            Rule::Range,
            format!("{key} = {value} does not fit in an int bucket bound"),
        ));
    }
    Ok(value as u32)
}

fn parse_enumerated(fields: &Fields<'_>) -> Result<HistogramKind> {
    let n_values = to_u32("n_values", fields.required_u64("n_values", &["high"])?)?;
    if n_values <= 2 {
        return Err(ProbeError::new(
            Rule::Range,
            format!("n_values must be greater than 2, found {n_values}"),
        ));
    }
    Ok(HistogramKind::Enumerated { n_values })
}

fn parse_categorical(fields: &Fields<'_>, limits: &Limits) -> Result<HistogramKind> {
    let labels = fields.required_str_list("labels", &[], Rule::Name)?;
    for label in &labels {
        check_identifier("label", label, None)?;
    }
    check_unique("label", labels.iter().copied())?;
    if labels.len() < 2 {
        return Err(ProbeError::new(
            Rule::Range,
            format!(
                "categorical histograms need at least 2 labels, found {}",
                labels.len()
            ),
        ));
    }
    if labels.len() > limits.max_labels {
        return Err(ProbeError::new(
            Rule::Range,
            format!(
                "{} labels exceed the limit of {}",
                labels.len(),
                limits.max_labels
            ),
        ));
    }
    Ok(HistogramKind::Categorical {
        labels: labels.into_iter().map(String::from).collect(),
    })
}

fn parse_bounds(fields: &Fields<'_>) -> Result<Bounds> {
    let low = fields.required_u64("low", &[])?;
    let high = fields.required_u64("high", &[])?;
    let n_buckets = fields.required_u64("n_buckets", &[])?;

    if low < 1 {
        return Err(ProbeError::new(Rule::Range, "low must be at least 1"));
    }
    if low >= high {
        return Err(ProbeError::new(
            Rule::Range,
            format!("low ({low}) must be less than high ({high})"),
        ));
    }
    if n_buckets <= 2 {
        return Err(ProbeError::new(
            Rule::Range,
            format!("n_buckets must be greater than 2, found {n_buckets}"),
        ));
    }
    if high <= n_buckets {
        return Err(ProbeError::new(
            Rule::Range,
            format!(
                "high ({high}) must be greater than n_buckets ({n_buckets}); you may want an enumerated histogram"
            ),
        ));
    }
    // Buckets 1..n_buckets need n_buckets - 1 distinct bounds in [low, high].
    if high - low < n_buckets - 2 {
        return Err(ProbeError::new(
            Rule::Range,
            format!(
                "high - low ({}) must be at least n_buckets - 2 ({}) to fit {n_buckets} distinct bucket bounds",
                high - low,
                n_buckets - 2
            ),
        ));
    }

    Ok(Bounds {
        low: to_u32("low", low)?,
        high: to_u32("high", high)?,
        n_buckets: to_u32("n_buckets", n_buckets)?,
    })
}

fn parse_keys(fields: &Fields<'_>, keyed: bool, limits: &Limits) -> Result<Vec<String>> {
    let Some(keys) = fields.str_list("keys", &[], Rule::Name)? else {
        return Ok(Vec::new());
    };
    if !keyed {
        return Err(ProbeError::new(
            Rule::UnknownField,
            "'keys' is only allowed on keyed histograms",
        ));
    }
    if keys.is_empty() {
        return Err(ProbeError::new(
            Rule::Range,
            "keys must list at least one key when supplied",
        ));
    }
    if keys.len() > limits.max_keys {
        return Err(ProbeError::new(
            Rule::Range,
            format!("{} keys exceed the limit of {}", keys.len(), limits.max_keys),
        ));
    }
    for key in &keys {
        check_identifier("key", key, None)?;
    }
    check_unique("key", keys.iter().copied())?;
    Ok(keys.into_iter().map(String::from).collect())
}
