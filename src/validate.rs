//! Validation and normalization of raw probe definitions.
//!
//! Each [`RawProbe`] is turned into a typed [`Probe`], or the run stops at
//! the first rule violation. Expired probes are not errors: they are
//! reported as [`Warning`]s and still generated.

use tracing::{debug, trace};

use crate::config::Limits;
use crate::error::{ProbeError, Result, Rule, Warning};
use crate::loader::RawProbe;
use crate::probe::fields::Fields;
use crate::probe::{Event, Expiry, Histogram, HistogramKind, Probe, Version};

/// Validated probes in input order, with any warnings raised on the way.
#[derive(Debug, Default)]
pub struct Validated {
    pub probes: Vec<Probe>,
    pub warnings: Vec<Warning>,
}

pub struct Validator<'a> {
    limits: &'a Limits,
    app_version: Option<&'a Version>,
}

impl<'a> Validator<'a> {
    pub fn new(limits: &'a Limits, app_version: Option<&'a Version>) -> Self {
        Validator {
            limits,
            app_version,
        }
    }

    pub fn validate(&self, raw: &[RawProbe]) -> Result<Validated> {
        let mut validated = Validated::default();
        for entry in raw {
            let probe = self
                .validate_one(entry)
                .map_err(|e| e.at(&entry.source).for_probe(&entry.name))?;
            trace!("Validated {}", probe.name());
            if let Some(warning) = self.check_expiry(&probe) {
                validated.warnings.push(warning);
            }
            validated.probes.push(probe);
        }
        debug!(
            "Validated {} probes with {} warnings",
            validated.probes.len(),
            validated.warnings.len()
        );
        Ok(validated)
    }

    fn validate_one(&self, entry: &RawProbe) -> Result<Probe> {
        let attrs = entry.attrs.as_object().ok_or_else(|| {
            ProbeError::new(Rule::Type, "a probe definition must be a mapping of attributes")
        })?;
        let fields = Fields::new(attrs);

        match fields.str("kind", &[], Rule::Type)? {
            Some("event") => {
                Event::from_fields(&entry.name, &entry.source, &fields, self.limits).map(Probe::Event)
            }
            Some(kind) => {
                Histogram::from_fields(&entry.name, kind, &entry.source, &fields, self.limits)
                    .map(Probe::Histogram)
            }
            None if Event::is_implied(&fields) => {
                Event::from_fields(&entry.name, &entry.source, &fields, self.limits).map(Probe::Event)
            }
            None => Err(ProbeError::new(
                Rule::MissingField,
                format!(
                    "required attribute 'kind' is missing (one of {}, or event)",
                    HistogramKind::NAMES.join(", ")
                ),
            )),
        }
    }

    fn check_expiry(&self, probe: &Probe) -> Option<Warning> {
        let app_version = self.app_version?;
        let meta = probe.meta();
        if !meta.expires.is_expired_at(app_version) {
            return None;
        }
        let Expiry::Version(expires) = &meta.expires else {
            return None;
        };
        Some(Warning::Expired {
            path: meta.source.clone(),
            probe: meta.name.clone(),
            expires: expires.to_string(),
            app_version: app_version.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn raw(name: &str, attrs: serde_json::Value) -> RawProbe {
        RawProbe {
            name: name.to_string(),
            source: PathBuf::from("Histograms.json"),
            attrs,
        }
    }

    fn boolean(expires: &str) -> serde_json::Value {
        json!({
            "kind": "boolean",
            "description": "d",
            "expires": expires,
            "bug_numbers": [1],
            "notification_emails": ["a@example.com"],
            "record_in_processes": ["main"],
            "products": ["firefox"],
        })
    }

    fn event() -> serde_json::Value {
        json!({
            "description": "d",
            "expires": "never",
            "bug_numbers": [1],
            "notification_emails": ["a@example.com"],
            "record_in_processes": ["main"],
            "products": ["firefox"],
            "methods": ["click"],
            "objects": ["button"],
        })
    }

    #[test]
    fn test_dispatches_by_kind() {
        let limits = Limits::default();
        let validator = Validator::new(&limits, None);
        let mut explicit = event();
        explicit["kind"] = json!("event");
        let validated = validator
            .validate(&[
                raw("A.B.C", boolean("never")),
                raw("ui.click", event()),
                raw("ui.other", explicit),
            ])
            .unwrap();
        assert!(matches!(validated.probes[0], Probe::Histogram(_)));
        assert!(matches!(validated.probes[1], Probe::Event(_)));
        assert!(matches!(validated.probes[2], Probe::Event(_)));
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_error_carries_context() {
        let limits = Limits::default();
        let validator = Validator::new(&limits, None);
        let mut attrs = boolean("never");
        attrs["bug_numbers"] = json!([]);
        let err = validator.validate(&[raw("BAD", attrs)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Histograms.json:BAD: BugListError: bug_numbers must list at least one bug"
        );
    }

    #[test]
    fn test_first_error_is_fatal() {
        let limits = Limits::default();
        let validator = Validator::new(&limits, None);
        let err = validator
            .validate(&[
                raw("OK", boolean("never")),
                raw("FIRST", json!({"kind": "boolean"})),
                raw("SECOND", json!(3)),
            ])
            .unwrap_err();
        assert_eq!(err.probe.as_deref(), Some("FIRST"));
    }

    #[test]
    fn test_missing_kind_and_non_mapping() {
        let limits = Limits::default();
        let validator = Validator::new(&limits, None);
        let mut attrs = boolean("never");
        attrs.as_object_mut().unwrap().remove("kind");
        assert_eq!(
            validator.validate(&[raw("X", attrs)]).unwrap_err().rule,
            Rule::MissingField
        );
        assert_eq!(
            validator.validate(&[raw("X", json!("flag"))]).unwrap_err().rule,
            Rule::Type
        );
    }

    #[test]
    fn test_expiry_warnings() {
        let limits = Limits::default();
        let app = Version::parse("70.0").unwrap();
        let validator = Validator::new(&limits, Some(&app));
        let validated = validator
            .validate(&[
                raw("OLD", boolean("60")),
                raw("SAME", boolean("70")),
                raw("NEW", boolean("71")),
                raw("FOREVER", boolean("never")),
            ])
            .unwrap();
        assert_eq!(validated.probes.len(), 4);
        let expired: Vec<_> = validated
            .warnings
            .iter()
            .map(|Warning::Expired { probe, .. }| probe.as_str())
            .collect();
        assert_eq!(expired, vec!["OLD", "SAME"]);
    }

    #[test]
    fn test_no_expiry_warnings_without_app_version() {
        let limits = Limits::default();
        let validator = Validator::new(&limits, None);
        let validated = validator.validate(&[raw("OLD", boolean("1"))]).unwrap();
        assert!(validated.warnings.is_empty());
    }
}
