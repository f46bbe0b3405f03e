//! Auxiliary tables referenced by the generated C++.
//!
//! Tables are built in probe ID order, so the n-th info record always
//! describes the probe with ID n. All string references are offsets into
//! the table's own [`StringTable`].

use std::collections::HashMap;

use tracing::debug;

use crate::config::Limits;
use crate::error::{ProbeError, Result, Rule};
use crate::interner::StringTable;
use crate::order::ProbeSet;
use crate::probe::Dataset;

/// Bounds of the reserved range used for expired histograms.
pub const EXPIRED_RANGE: [i32; 4] = [0, 1, 2, i32::MAX];

/// An (offset, count) reference into a flat `uint32_t` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slice {
    pub offset: u32,
    pub count: u32,
}

/// One `gHistogramInfos` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramInfo {
    pub low: u32,
    pub high: u32,
    pub n_buckets: u32,
    /// The consumer's kind constant.
    pub kind: &'static str,
    pub name_index: u32,
    pub expiry_index: u32,
    pub dataset: Dataset,
    pub labels: Slice,
    pub keys: Slice,
    pub process_mask: u32,
    pub keyed: bool,
    pub product_mask: u32,
}

#[derive(Debug, Default)]
pub struct HistogramTables {
    pub strings: StringTable,
    pub infos: Vec<HistogramInfo>,
    pub labels: Vec<u32>,
    pub keys: Vec<u32>,
    /// Distinct bucket lists in order of first use, each ending in `INT_MAX`.
    pub ranges: Vec<Vec<i32>>,
    /// Per histogram, the element index of its bucket list.
    pub range_offsets: Vec<i16>,
}

/// Append the string indexes of `values` to `table`.
fn push_slice(
    table: &mut Vec<u32>,
    strings: &mut StringTable,
    values: &[String],
) -> Result<Slice> {
    if values.is_empty() {
        return Ok(Slice::default());
    }
    let offset = table.len() as u32;
    table.extend(strings.indexes(values.iter().map(String::as_str))?);
    Ok(Slice {
        offset,
        count: values.len() as u32,
    })
}

fn range_overflow(length: usize, limit: usize) -> ProbeError {
    ProbeError::new(
        Rule::OffsetOverflow,
        format!(
            "bucket lower bound table would grow to {length} entries, \
             past the int16_t index limit of {limit}"
        ),
    )
}

impl HistogramTables {
    pub fn build(probes: &ProbeSet, limits: &Limits) -> Result<HistogramTables> {
        let mut tables = HistogramTables::default();
        let mut range_table_len = EXPIRED_RANGE.len();
        let mut seen_ranges: HashMap<Vec<i32>, usize> = HashMap::new();

        for histogram in probes.histograms() {
            let name = histogram.name();
            let context = |e: ProbeError| e.at(&histogram.meta.source).for_probe(name);

            let name_index = tables.strings.index(name).map_err(context)?;
            let expiry_index = tables
                .strings
                .index(histogram.meta.expires.as_str())
                .map_err(context)?;
            let labels = push_slice(&mut tables.labels, &mut tables.strings, histogram.labels())
                .map_err(context)?;
            let keys = push_slice(&mut tables.keys, &mut tables.strings, &histogram.keys)
                .map_err(context)?;

            // A bucket list longer than the whole index space can never fit.
            let needed = histogram.n_buckets() as usize + 1;
            if needed > limits.max_range_offset {
                return Err(context(range_overflow(
                    range_table_len + needed,
                    limits.max_range_offset,
                )));
            }

            let mut ranges = histogram
                .ranges()
                .into_iter()
                .map(|bound| {
                    i32::try_from(bound).map_err(|_| {
                        ProbeError::new(
                            Rule::Range,
                            format!("bucket bound {bound} does not fit in an int"),
                        )
                    })
                })
                .collect::<Result<Vec<i32>>>()
                .map_err(context)?;
            if let Some(&last) = ranges.last().filter(|last| **last == i32::MAX) {
                return Err(context(ProbeError::new(
                    Rule::Range,
                    format!("last bucket bound {last} collides with the INT_MAX sentinel"),
                )));
            }
            ranges.push(i32::MAX);

            let offset = match seen_ranges.get(&ranges) {
                Some(offset) => *offset,
                None => {
                    let offset = range_table_len;
                    if offset + ranges.len() > limits.max_range_offset {
                        return Err(context(range_overflow(
                            offset + ranges.len(),
                            limits.max_range_offset,
                        )));
                    }
                    range_table_len += ranges.len();
                    seen_ranges.insert(ranges.clone(), offset);
                    tables.ranges.push(ranges);
                    offset
                }
            };
            let offset = i16::try_from(offset)
                .map_err(|_| context(range_overflow(offset, limits.max_range_offset)))?;
            tables.range_offsets.push(offset);

            tables.infos.push(HistogramInfo {
                low: histogram.low(),
                high: histogram.high(),
                n_buckets: histogram.n_buckets(),
                kind: histogram.kind.cpp_name(),
                name_index,
                expiry_index,
                dataset: histogram.meta.dataset,
                labels,
                keys,
                process_mask: histogram.meta.process_mask(),
                keyed: histogram.meta.keyed,
                product_mask: histogram.meta.product_mask(),
            });
        }

        debug!(
            "Histogram tables: {} infos, {} string bytes, {} labels, {} keys, {} bucket bounds",
            tables.infos.len(),
            tables.strings.len_bytes(),
            tables.labels.len(),
            tables.keys.len(),
            range_table_len + 1
        );
        Ok(tables)
    }

    /// The flat `gHistogramBucketLowerBounds` contents.
    pub fn bucket_lower_bounds(&self) -> Vec<i32> {
        let mut bounds = EXPIRED_RANGE.to_vec();
        for ranges in &self.ranges {
            bounds.extend_from_slice(ranges);
        }
        bounds.push(0);
        bounds
    }
}

/// One `gCommonEventInfo` record, shared by every expansion of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonEventInfo {
    pub category_index: u32,
    pub expiry_index: u32,
    pub extra_keys: Slice,
    pub dataset: Dataset,
    pub process_mask: u32,
    pub product_mask: u32,
}

/// One `gEventInfo` record: a single (method, object) expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventInfo {
    pub common_index: u32,
    pub method_index: u32,
    pub object_index: u32,
}

#[derive(Debug, Default)]
pub struct EventTables {
    pub strings: StringTable,
    pub extra_keys: Vec<u32>,
    pub common: Vec<CommonEventInfo>,
    pub infos: Vec<EventInfo>,
}

impl EventTables {
    pub fn build(probes: &ProbeSet) -> Result<EventTables> {
        let mut tables = EventTables::default();

        for event in probes.events() {
            let context = |e: ProbeError| e.at(&event.meta.source).for_probe(event.name());

            let category_index = tables.strings.index(&event.category).map_err(context)?;
            let expiry_index = tables
                .strings
                .index(event.meta.expires.as_str())
                .map_err(context)?;
            let extra_names: Vec<String> =
                event.extra_keys.iter().map(|(key, _)| key.clone()).collect();
            let extra_keys = push_slice(&mut tables.extra_keys, &mut tables.strings, &extra_names)
                .map_err(context)?;

            let common_index = tables.common.len() as u32;
            tables.common.push(CommonEventInfo {
                category_index,
                expiry_index,
                extra_keys,
                dataset: event.meta.dataset,
                process_mask: event.meta.process_mask(),
                product_mask: event.meta.product_mask(),
            });

            tables.infos.reserve(event.expansion_count());
            for (method, object) in event.expansions() {
                let method_index = tables.strings.index(method).map_err(context)?;
                let object_index = tables.strings.index(object).map_err(context)?;
                tables.infos.push(EventInfo {
                    common_index,
                    method_index,
                    object_index,
                });
            }
        }

        debug!(
            "Event tables: {} events, {} expansions, {} string bytes, {} extra keys",
            tables.common.len(),
            tables.infos.len(),
            tables.strings.len_bytes(),
            tables.extra_keys.len()
        );
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RawProbe;
    use crate::order::test_utils::{attrs, probe_set};
    use crate::probe::{Bounds, HistogramKind, Probe};
    use crate::validate::Validator;
    use serde_json::json;
    use std::path::PathBuf;

    /// Resolve a string table offset back to its string.
    fn string_at(strings: &StringTable, offset: u32) -> String {
        let bytes = strings.as_bytes();
        let start = offset as usize;
        let end = start + bytes[start..].iter().position(|b| *b == 0).unwrap();
        String::from_utf8(bytes[start..end].to_vec()).unwrap()
    }

    fn linear(high: u32, n_buckets: u32) -> serde_json::Value {
        attrs(json!({"kind": "linear", "low": 1, "high": high, "n_buckets": n_buckets}))
    }

    #[test]
    fn test_boolean_histogram() {
        let set = probe_set(vec![("A.B.C", attrs(json!({"kind": "boolean"})))]);
        let tables = HistogramTables::build(&set, &Limits::default()).unwrap();
        let info = &tables.infos[0];
        assert_eq!((info.low, info.high, info.n_buckets), (1, 2, 3));
        assert_eq!(info.kind, "nsITelemetry::HISTOGRAM_BOOLEAN");
        assert_eq!(string_at(&tables.strings, info.name_index), "A.B.C");
        assert_eq!(string_at(&tables.strings, info.expiry_index), "never");
        assert_eq!(info.process_mask, 0x3);
        assert_eq!(info.product_mask, 0x1);

        let offset = tables.range_offsets[0] as usize;
        let bounds = tables.bucket_lower_bounds();
        assert_eq!(&bounds[offset..offset + 4], &[0, 1, 2, i32::MAX]);
    }

    #[test]
    fn test_bucket_table_layout() {
        let set = probe_set(vec![
            ("FIRST", attrs(json!({"kind": "flag"}))),
            ("SECOND", linear(10, 5)),
        ]);
        let tables = HistogramTables::build(&set, &Limits::default()).unwrap();
        let bounds = tables.bucket_lower_bounds();
        assert_eq!(&bounds[..4], &EXPIRED_RANGE);
        assert_eq!(tables.range_offsets, vec![4, 8]);
        assert_eq!(bounds[8..].last(), Some(&0));
        let second = &bounds[8..8 + 6];
        assert_eq!(second[0], 0);
        assert_eq!(second[1], 1);
        assert_eq!(second[4], 10);
        assert_eq!(second[5], i32::MAX);
    }

    #[test]
    fn test_equal_ranges_are_shared() {
        let set = probe_set(vec![
            ("ONE", linear(100, 10)),
            ("TWO", attrs(json!({"kind": "count"}))),
            ("THREE", linear(100, 10)),
        ]);
        let tables = HistogramTables::build(&set, &Limits::default()).unwrap();
        assert_eq!(tables.ranges.len(), 2);
        assert_eq!(tables.range_offsets[0], tables.range_offsets[2]);
        assert_ne!(tables.range_offsets[0], tables.range_offsets[1]);
    }

    #[test]
    fn test_categorical_labels() {
        let set = probe_set(vec![
            ("FLAG", attrs(json!({"kind": "flag"}))),
            (
                "CAT",
                attrs(json!({"kind": "categorical", "labels": ["Foo", "Bar", "Baz"]})),
            ),
        ]);
        let tables = HistogramTables::build(&set, &Limits::default()).unwrap();
        let info = &tables.infos[1];
        assert_eq!((info.high, info.n_buckets), (3, 4));
        assert_eq!(info.labels, Slice { offset: 0, count: 3 });
        assert_eq!(tables.infos[0].labels, Slice::default());
        let labels: Vec<String> = tables.labels[..3]
            .iter()
            .map(|offset| string_at(&tables.strings, *offset))
            .collect();
        assert_eq!(labels, vec!["Foo", "Bar", "Baz"]);
    }

    #[test]
    fn test_keys_table() {
        let set = probe_set(vec![(
            "KEYED",
            attrs(json!({"kind": "count", "keyed": true, "keys": ["alpha", "beta"]})),
        )]);
        let tables = HistogramTables::build(&set, &Limits::default()).unwrap();
        let info = &tables.infos[0];
        assert!(info.keyed);
        assert_eq!(info.keys.count, 2);
        assert_eq!(string_at(&tables.strings, tables.keys[1]), "beta");
    }

    #[test]
    fn test_strings_are_shared_across_histograms() {
        let set = probe_set(vec![
            ("ONE", attrs(json!({"kind": "flag"}))),
            ("TWO", attrs(json!({"kind": "flag"}))),
        ]);
        let tables = HistogramTables::build(&set, &Limits::default()).unwrap();
        assert_eq!(tables.infos[0].expiry_index, tables.infos[1].expiry_index);
        assert_eq!(tables.strings.entries().count(), 3);
    }

    #[test]
    fn test_range_offset_overflow_names_first_offender() {
        let entries: Vec<(String, serde_json::Value)> = (0..40)
            .map(|i| (format!("H{i}"), linear(100_000 + i, 1000)))
            .collect();
        let set = probe_set(
            entries
                .iter()
                .map(|(name, attrs)| (name.as_str(), attrs.clone()))
                .collect(),
        );
        let err = HistogramTables::build(&set, &Limits::default()).unwrap_err();
        assert_eq!(err.rule, Rule::OffsetOverflow);
        // 4 reserved entries plus 1001 per histogram: the 33rd one overflows.
        assert_eq!(err.probe.as_deref(), Some("H32"));
    }

    #[test]
    fn test_single_oversized_range() {
        let set = probe_set(vec![("HUGE", linear(1_000_000, 40_000))]);
        let err = HistogramTables::build(&set, &Limits::default()).unwrap_err();
        assert_eq!(err.rule, Rule::OffsetOverflow);
        assert_eq!(err.probe.as_deref(), Some("HUGE"));
    }

    #[test]
    fn test_bound_at_sentinel_is_rejected() {
        let limits = Limits::default();
        let raw = vec![RawProbe {
            name: "EDGE".to_string(),
            source: PathBuf::from("Probes.json"),
            attrs: linear(100, 10),
        }];
        let mut probes = Validator::new(&limits, None).validate(&raw).unwrap().probes;
        if let Probe::Histogram(histogram) = &mut probes[0] {
            histogram.kind = HistogramKind::Linear(Bounds {
                low: 2_147_483_644,
                high: 2_147_483_647,
                n_buckets: 5,
            });
        }
        let set = ProbeSet::new(probes);
        let err = HistogramTables::build(&set, &limits).unwrap_err();
        assert_eq!(err.rule, Rule::Range);
        assert_eq!(err.probe.as_deref(), Some("EDGE"));
        assert!(err.detail.contains("sentinel"), "{}", err.detail);
    }

    #[test]
    fn test_event_with_extras() {
        let set = probe_set(vec![(
            "category.name",
            attrs(json!({
                "methods": ["click"],
                "objects": ["button", "link"],
                "extra_keys": {"x": "desc", "y": "desc"},
            })),
        )]);
        let tables = EventTables::build(&set).unwrap();
        assert_eq!(tables.common.len(), 1);
        assert_eq!(tables.infos.len(), 2);

        let common = &tables.common[0];
        assert_eq!(string_at(&tables.strings, common.category_index), "category");
        assert_eq!(common.extra_keys.count, 2);
        let k = common.extra_keys.offset as usize;
        assert_eq!(string_at(&tables.strings, tables.extra_keys[k]), "x");
        assert_eq!(string_at(&tables.strings, tables.extra_keys[k + 1]), "y");

        let objects: Vec<String> = tables
            .infos
            .iter()
            .map(|info| {
                assert_eq!(info.common_index, 0);
                assert_eq!(string_at(&tables.strings, info.method_index), "click");
                string_at(&tables.strings, info.object_index)
            })
            .collect();
        assert_eq!(objects, vec!["button", "link"]);
    }

    #[test]
    fn test_event_without_extras() {
        let set = probe_set(vec![
            (
                "a.first",
                attrs(json!({"methods": ["m"], "objects": ["o"], "extra_keys": {"k": "d"}})),
            ),
            ("a.second", attrs(json!({"methods": ["m"], "objects": ["o"]}))),
        ]);
        let tables = EventTables::build(&set).unwrap();
        assert_eq!(tables.common[1].extra_keys, Slice::default());
        assert_eq!(tables.infos[1].common_index, 1);
        assert_eq!(tables.common[0].category_index, tables.common[1].category_index);
    }
}
