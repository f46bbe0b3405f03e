//! Deterministic probe ordering and numeric IDs.
//!
//! Histograms and events are numbered independently. Within each kind the
//! order is input-file order, then declaration order, and a probe's ID is
//! its position in that order. Nothing here sorts, hashes or otherwise
//! reorders probes, so appending a probe never renumbers existing ones.

use crate::probe::{Event, Histogram, Probe};

#[derive(Debug, Default)]
pub struct ProbeSet {
    histograms: Vec<Histogram>,
    events: Vec<Event>,
}

impl ProbeSet {
    /// Stable partition of validated probes by kind.
    pub fn new(probes: Vec<Probe>) -> Self {
        let mut set = ProbeSet::default();
        for probe in probes {
            match probe {
                Probe::Histogram(histogram) => set.histograms.push(histogram),
                Probe::Event(event) => set.events.push(event),
            }
        }
        set
    }

    /// Histograms in ID order.
    pub fn histograms(&self) -> &[Histogram] {
        &self.histograms
    }

    /// Events in ID order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.histograms.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn histogram_id(&self, name: &str) -> Option<u32> {
        let id = self.histograms.iter().position(|h| h.name() == name)?;
        Some(id as u32)
    }

    #[cfg(test)]
    pub(crate) fn event_id(&self, name: &str) -> Option<u32> {
        let id = self.events.iter().position(|e| e.name() == name)?;
        Some(id as u32)
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::{attrs, probe_set};
    use super::*;
    use serde_json::json;

    fn event_attrs() -> serde_json::Value {
        attrs(json!({"methods": ["click"], "objects": ["button"]}))
    }

    #[test]
    fn test_ids_follow_input_order_per_kind() {
        let set = probe_set(vec![
            ("ZZZ", attrs(json!({"kind": "flag"}))),
            ("ui.click", event_attrs()),
            ("AAA", attrs(json!({"kind": "count"}))),
            ("nav.load", event_attrs()),
        ]);
        assert_eq!(set.histogram_id("ZZZ"), Some(0));
        assert_eq!(set.histogram_id("AAA"), Some(1));
        assert_eq!(set.event_id("ui.click"), Some(0));
        assert_eq!(set.event_id("nav.load"), Some(1));
        assert_eq!(set.histogram_id("ui.click"), None);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_appending_keeps_existing_ids() {
        let before = probe_set(vec![
            ("FIRST", attrs(json!({"kind": "flag"}))),
            ("SECOND", attrs(json!({"kind": "flag"}))),
        ]);
        let after = probe_set(vec![
            ("FIRST", attrs(json!({"kind": "flag"}))),
            ("SECOND", attrs(json!({"kind": "flag"}))),
            ("AAA_NEW", attrs(json!({"kind": "flag"}))),
        ]);
        for name in ["FIRST", "SECOND"] {
            assert_eq!(before.histogram_id(name), after.histogram_id(name));
        }
        assert_eq!(after.histogram_id("AAA_NEW"), Some(2));
    }

    #[test]
    fn test_empty_set() {
        let set = ProbeSet::new(Vec::new());
        assert!(set.is_empty());
        assert!(set.histograms().is_empty());
    }
}
