//! Typed access to the attributes of a raw probe definition.
//!
//! Every accessor takes the rule to report when the value has the wrong
//! shape, so a malformed `bug_numbers` is a `BugListError` rather than a
//! generic type error. Aliases are resolved here: asking for `expires`
//! with alias `expires_in_version` finds whichever spelling is present and
//! rejects definitions that use both.

use serde_json::{Map, Value};

use crate::error::{ProbeError, Result, Rule};

pub struct Fields<'a> {
    attrs: &'a Map<String, Value>,
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

fn wrong_type(rule: Rule, key: &str, expected: &str, value: &Value) -> ProbeError {
    ProbeError::new(
        rule,
        format!("{key} must be {expected}, found {}", json_type(value)),
    )
}

impl<'a> Fields<'a> {
    pub fn new(attrs: &'a Map<String, Value>) -> Self {
        Fields { attrs }
    }

    /// Reject attributes outside `allowed`.
    pub fn check_known(&self, allowed: &[&str], kind: &str) -> Result<()> {
        for key in self.attrs.keys() {
            if !allowed.contains(&key.as_str()) {
                return Err(ProbeError::new(
                    Rule::UnknownField,
                    format!("attribute '{key}' is not allowed for {kind} probes"),
                ));
            }
        }
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Look up `key` or one of its aliases, returning the spelling found.
    pub fn get(&self, key: &str, aliases: &[&str]) -> Result<Option<(&'a str, &'a Value)>> {
        let mut found: Option<(&'a str, &'a Value)> = None;
        for name in std::iter::once(&key).chain(aliases.iter()) {
            if let Some((spelling, value)) = self.attrs.iter().find(|(k, _)| k.as_str() == *name) {
                if let Some((first, _)) = found {
                    return Err(ProbeError::new(
                        Rule::FieldConflict,
                        format!("'{spelling}' duplicates '{first}'"),
                    ));
                }
                found = Some((spelling.as_str(), value));
            }
        }
        Ok(found)
    }

    fn require(&self, key: &str, aliases: &[&str]) -> Result<(&'a str, &'a Value)> {
        self.get(key, aliases)?.ok_or_else(|| {
            ProbeError::new(Rule::MissingField, format!("required attribute '{key}' is missing"))
        })
    }

    pub fn str(&self, key: &str, aliases: &[&str], rule: Rule) -> Result<Option<&'a str>> {
        match self.get(key, aliases)? {
            Some((spelling, value)) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| wrong_type(rule, spelling, "a string", value)),
            None => Ok(None),
        }
    }

    pub fn required_str(&self, key: &str, aliases: &[&str], rule: Rule) -> Result<&'a str> {
        let (spelling, value) = self.require(key, aliases)?;
        value
            .as_str()
            .ok_or_else(|| wrong_type(rule, spelling, "a string", value))
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.attrs.get(key) {
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| wrong_type(Rule::Type, key, "true or false", value)),
            None => Ok(None),
        }
    }

    /// A non-negative integer attribute.
    pub fn u64(&self, key: &str, aliases: &[&str]) -> Result<Option<u64>> {
        match self.get(key, aliases)? {
            Some((spelling, value)) => match value.as_u64() {
                Some(number) => Ok(Some(number)),
                None if value.as_i64().is_some() => Err(ProbeError::new(
                    Rule::Range,
                    format!("{spelling} must not be negative"),
                )),
                None => Err(wrong_type(Rule::Range, spelling, "an integer", value)),
            },
            None => Ok(None),
        }
    }

    pub fn required_u64(&self, key: &str, aliases: &[&str]) -> Result<u64> {
        self.require(key, aliases)?;
        self.u64(key, aliases)?.ok_or_else(|| {
            ProbeError::new(Rule::MissingField, format!("required attribute '{key}' is missing"))
        })
    }

    fn list(&self, key: &str, aliases: &[&str], rule: Rule) -> Result<Option<(&'a str, &'a [Value])>> {
        match self.get(key, aliases)? {
            Some((spelling, Value::Array(items))) => Ok(Some((spelling, items.as_slice()))),
            Some((spelling, value)) => Err(wrong_type(rule, spelling, "a list", value)),
            None => Ok(None),
        }
    }

    pub fn str_list(&self, key: &str, aliases: &[&str], rule: Rule) -> Result<Option<Vec<&'a str>>> {
        let Some((spelling, items)) = self.list(key, aliases, rule)? else {
            return Ok(None);
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| wrong_type(rule, spelling, "a list of strings", item))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    pub fn required_str_list(&self, key: &str, aliases: &[&str], rule: Rule) -> Result<Vec<&'a str>> {
        self.require(key, aliases)?;
        Ok(self.str_list(key, aliases, rule)?.unwrap_or_default())
    }

    pub fn required_u64_list(&self, key: &str, rule: Rule) -> Result<Vec<u64>> {
        let (spelling, items) = self.list(key, &[], rule)?.ok_or_else(|| {
            ProbeError::new(Rule::MissingField, format!("required attribute '{key}' is missing"))
        })?;
        items
            .iter()
            .map(|item| match item.as_u64() {
                Some(number) => Ok(number),
                None if item.as_i64().is_some() => Err(ProbeError::new(
                    rule,
                    format!("{spelling} entry {item} is not positive"),
                )),
                None => Err(wrong_type(rule, spelling, "a list of integers", item)),
            })
            .collect()
    }

    pub fn object(&self, key: &str, rule: Rule) -> Result<Option<&'a Map<String, Value>>> {
        match self.attrs.get(key) {
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(value) => Err(wrong_type(rule, key, "a mapping", value)),
            None => Ok(None),
        }
    }
}
