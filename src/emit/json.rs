//! JSON listing of every probe, grouped by category.
//!
//! Object keys are sorted at every level; lists keep their declared or
//! canonical order.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::{ProbeError, Result, Rule};
use crate::order::ProbeSet;
use crate::probe::{Enumeration, Event, Histogram, HistogramKind, ProbeMeta};

use super::Emitter;

/// Category of histograms whose names contain no `.`.
const DEFAULT_HISTOGRAM_CATEGORY: &str = "histograms";

type Record = BTreeMap<&'static str, Value>;
type Listing = BTreeMap<String, BTreeMap<String, Record>>;

pub struct JsonEmitter;

fn names<T: Enumeration>(values: &[T]) -> Vec<&'static str> {
    values.iter().map(|value| value.name()).collect()
}

fn common_fields(id: u32, kind: &str, meta: &ProbeMeta) -> Record {
    let mut fields = Record::new();
    fields.insert("id", json!(id));
    fields.insert("kind", json!(kind));
    fields.insert("description", json!(meta.description));
    fields.insert("expires", json!(meta.expires.as_str()));
    fields.insert("bug_numbers", json!(meta.bug_numbers));
    fields.insert("notification_emails", json!(meta.notification_emails));
    fields.insert("record_in_processes", json!(names(&meta.record_in_processes)));
    fields.insert("products", json!(names(&meta.products)));
    fields.insert("operating_systems", json!(names(&meta.operating_systems)));
    fields.insert(
        "release_channel_collection",
        json!(meta.dataset.as_str()),
    );
    fields.insert("keyed", json!(meta.keyed));
    fields
}

fn histogram_fields(id: u32, histogram: &Histogram) -> Record {
    let mut fields = common_fields(id, histogram.kind.name(), &histogram.meta);
    fields.insert("low", json!(histogram.low()));
    fields.insert("high", json!(histogram.high()));
    fields.insert("n_buckets", json!(histogram.n_buckets()));
    if let HistogramKind::Categorical { labels } = &histogram.kind {
        fields.insert("labels", json!(labels));
    }
    if !histogram.keys.is_empty() {
        fields.insert("keys", json!(histogram.keys));
    }
    fields
}

fn event_fields(id: u32, event: &Event) -> Record {
    let mut fields = common_fields(id, "event", &event.meta);
    fields.insert("methods", json!(event.methods));
    fields.insert("objects", json!(event.objects));
    let extra_keys: BTreeMap<&str, &str> = event
        .extra_keys
        .iter()
        .map(|(key, description)| (key.as_str(), description.as_str()))
        .collect();
    fields.insert("extra_keys", json!(extra_keys));
    fields
}

fn histogram_category(name: &str) -> &str {
    name.rsplit_once('.')
        .map_or(DEFAULT_HISTOGRAM_CATEGORY, |(category, _)| category)
}

impl JsonEmitter {
    fn listing(probes: &ProbeSet) -> Listing {
        let mut listing = Listing::new();
        for (id, histogram) in probes.histograms().iter().enumerate() {
            listing
                .entry(histogram_category(histogram.name()).to_string())
                .or_default()
                .insert(
                    histogram.name().to_string(),
                    histogram_fields(id as u32, histogram),
                );
        }
        for (id, event) in probes.events().iter().enumerate() {
            listing
                .entry(event.category.clone())
                .or_default()
                .insert(event.name().to_string(), event_fields(id as u32, event));
        }
        listing
    }
}

impl Emitter for JsonEmitter {
    fn emit(&self, probes: &ProbeSet) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&Self::listing(probes))
            .map_err(|e| ProbeError::new(Rule::Io, format!("failed to serialize probes: {e}")))?;
        out.push('\n');
        Ok(out)
    }
}
