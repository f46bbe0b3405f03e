//! Events: a category, one or more methods and objects, and optional extra keys.

use std::path::Path;

use crate::config::Limits;
use crate::error::{ProbeError, Result, Rule};

use super::fields::Fields;
use super::{check_identifier, check_probe_name, check_unique, ProbeMeta, COMMON_FIELDS};

const EVENT_FIELDS: &[&str] = &["methods", "objects", "extra_keys"];

/// A validated event definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub meta: ProbeMeta,
    /// Everything before the last `.` of the probe name.
    pub category: String,
    /// The final component of the probe name.
    pub event_name: String,
    pub methods: Vec<String>,
    pub objects: Vec<String>,
    /// Extra key names and descriptions, in declaration order.
    pub extra_keys: Vec<(String, String)>,
}

impl Event {
    /// True when a definition without a `kind` looks like an event.
    pub(crate) fn is_implied(fields: &Fields<'_>) -> bool {
        EVENT_FIELDS.iter().any(|key| fields.has(key))
    }

    pub(crate) fn from_fields(
        name: &str,
        source: &Path,
        fields: &Fields<'_>,
        limits: &Limits,
    ) -> Result<Event> {
        let allowed: Vec<&str> = COMMON_FIELDS.iter().chain(EVENT_FIELDS).copied().collect();
        fields.check_known(&allowed, "event")?;
        check_probe_name(name, limits)?;

        let (category, event_name) = name.rsplit_once('.').ok_or_else(|| {
            ProbeError::new(
                Rule::Name,
                format!("event name '{name}' must have the form category.name"),
            )
        })?;
        if category.is_empty() || category.ends_with('.') {
            return Err(ProbeError::new(
                Rule::Name,
                format!("event name '{name}' has an empty category"),
            ));
        }
        check_identifier("event name", event_name, Some(limits.max_identifier_len))?;

        let meta = ProbeMeta::from_fields(name, source, fields)?;
        let methods = identifier_list(fields, "methods", "method", limits)?;
        let objects = identifier_list(fields, "objects", "object", limits)?;
        let extra_keys = parse_extra_keys(fields, limits)?;

        Ok(Event {
            meta,
            category: category.to_string(),
            event_name: event_name.to_string(),
            methods,
            objects,
            extra_keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Every (method, object) pair, methods-major.
    pub fn expansions(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.methods.iter().flat_map(move |method| {
            self.objects
                .iter()
                .map(move |object| (method.as_str(), object.as_str()))
        })
    }

    pub fn expansion_count(&self) -> usize {
        self.methods.len() * self.objects.len()
    }
}

fn identifier_list(
    fields: &Fields<'_>,
    key: &str,
    what: &str,
    limits: &Limits,
) -> Result<Vec<String>> {
    let values = fields.required_str_list(key, &[], Rule::Name)?;
    if values.is_empty() {
        return Err(ProbeError::new(
            Rule::MissingField,
            format!("{key} must list at least one {what}"),
        ));
    }
    for value in &values {
        check_identifier(what, value, Some(limits.max_identifier_len))?;
    }
    check_unique(what, values.iter().copied())?;
    Ok(values.into_iter().map(String::from).collect())
}

fn parse_extra_keys(fields: &Fields<'_>, limits: &Limits) -> Result<Vec<(String, String)>> {
    let Some(map) = fields.object("extra_keys", Rule::Type)? else {
        return Ok(Vec::new());
    };
    if map.len() > limits.max_extra_keys {
        return Err(ProbeError::new(
            Rule::Range,
            format!(
                "{} extra keys exceed the limit of {}",
                map.len(),
                limits.max_extra_keys
            ),
        ));
    }
    let mut extra_keys = Vec::with_capacity(map.len());
    for (key, value) in map {
        check_identifier("extra key", key, Some(limits.max_identifier_len))?;
        let description = value.as_str().ok_or_else(|| {
            ProbeError::new(
                Rule::Type,
                format!("description of extra key '{key}' must be a string"),
            )
        })?;
        if description.trim().is_empty() {
            return Err(ProbeError::new(
                Rule::MissingField,
                format!("extra key '{key}' needs a description"),
            ));
        }
        extra_keys.push((key.clone(), description.to_string()));
    }
    Ok(extra_keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn base() -> Map<String, Value> {
        let value = json!({
            "description": "Clicks on things",
            "expires": "never",
            "bug_numbers": [1],
            "notification_emails": ["ui@example.com"],
            "record_in_processes": ["main", "content"],
            "products": ["firefox", "geckoview"],
            "methods": ["click"],
            "objects": ["button", "link"],
            "extra_keys": {"x": "desc", "y": "desc"},
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn build(name: &str, attrs: &Map<String, Value>) -> Result<Event> {
        Event::from_fields(
            name,
            Path::new("Events.yaml"),
            &Fields::new(attrs),
            &Limits::default(),
        )
    }

    #[test]
    fn test_event_with_extras() {
        let event = build("category.name", &base()).unwrap();
        assert_eq!(event.category, "category");
        assert_eq!(event.event_name, "name");
        assert_eq!(event.expansion_count(), 2);
        let expansions: Vec<_> = event.expansions().collect();
        assert_eq!(expansions, vec![("click", "button"), ("click", "link")]);
        assert_eq!(
            event.extra_keys,
            vec![
                ("x".to_string(), "desc".to_string()),
                ("y".to_string(), "desc".to_string())
            ]
        );
    }

    #[test]
    fn test_category_keeps_inner_dots() {
        let event = build("a.b.c", &base()).unwrap();
        assert_eq!(event.category, "a.b");
        assert_eq!(event.event_name, "c");
    }

    #[test]
    fn test_expansions_are_methods_major() {
        let mut attrs = base();
        attrs.insert("methods".into(), json!(["open", "close"]));
        attrs.insert("objects".into(), json!(["tab", "window"]));
        let event = build("ui.action", &attrs).unwrap();
        let expansions: Vec<_> = event.expansions().collect();
        assert_eq!(
            expansions,
            vec![
                ("open", "tab"),
                ("open", "window"),
                ("close", "tab"),
                ("close", "window")
            ]
        );
    }

    #[test]
    fn test_name_shape() {
        assert_eq!(build("nocategory", &base()).unwrap_err().rule, Rule::Name);
        let long = format!("ui.{}", "e".repeat(41));
        assert_eq!(build(&long, &base()).unwrap_err().rule, Rule::Name);
    }

    #[test]
    fn test_method_and_object_rules() {
        let mut attrs = base();
        attrs.insert("methods".into(), json!([]));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::MissingField);

        attrs.insert("methods".into(), json!(["has-dash"]));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::Name);

        attrs.insert("methods".into(), json!(["m".repeat(41)]));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::Name);

        let mut attrs = base();
        attrs.insert("objects".into(), json!(["a", "a"]));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::Name);

        let mut attrs = base();
        attrs.remove("objects");
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::MissingField);
    }

    #[test]
    fn test_extra_key_rules() {
        let mut attrs = base();
        let many: Map<String, Value> = (0..11)
            .map(|i| (format!("k{i}"), json!("desc")))
            .collect();
        attrs.insert("extra_keys".into(), Value::Object(many));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::Range);

        attrs.insert("extra_keys".into(), json!({"x": ""}));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::MissingField);

        attrs.insert("extra_keys".into(), json!({"x": 3}));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::Type);

        attrs.insert("extra_keys".into(), json!({"1x": "desc"}));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::Name);

        attrs.remove("extra_keys");
        assert!(build("ui.x", &attrs).unwrap().extra_keys.is_empty());
    }

    #[test]
    fn test_histogram_attributes_rejected() {
        let mut attrs = base();
        attrs.insert("n_buckets".into(), json!(10));
        assert_eq!(build("ui.x", &attrs).unwrap_err().rule, Rule::UnknownField);
    }

    #[test]
    fn test_implied_event() {
        let attrs = base();
        assert!(Event::is_implied(&Fields::new(&attrs)));
        let empty = Map::new();
        assert!(!Event::is_implied(&Fields::new(&empty)));
    }
}
