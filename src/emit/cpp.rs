//! C++ data tables for the telemetry runtime.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::config::Limits;
use crate::error::Result;
use crate::order::ProbeSet;
use crate::probe::{Histogram, HistogramKind};
use crate::tables::{EventTables, HistogramTables, EXPIRED_RANGE};

use super::{Emitter, GENERATED_BANNER};

const INCLUDE_GUARD: &str = "mozilla_TelemetryProbeData_h";

/// Maximum label count the runtime accepts for categorical histograms.
const MAX_CATEGORICAL_LABELS: usize = 100;

pub struct CppDataEmitter {
    limits: Limits,
}

impl CppDataEmitter {
    pub fn new(limits: Limits) -> Self {
        CppDataEmitter { limits }
    }
}

impl Emitter for CppDataEmitter {
    fn emit(&self, probes: &ProbeSet) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{GENERATED_BANNER}\n")?;
        writeln!(out, "#ifndef {INCLUDE_GUARD}")?;
        writeln!(out, "#define {INCLUDE_GUARD}\n")?;
        writeln!(out, "#include <climits>")?;
        writeln!(out, "#include <cstdint>\n")?;
        writeln!(out, "namespace {{\n")?;

        let tables = HistogramTables::build(probes, &self.limits)?;
        write_histograms(&mut out, probes.histograms(), &tables)?;
        let tables = EventTables::build(probes)?;
        write_events(&mut out, probes, &tables)?;

        writeln!(out, "}} // namespace\n")?;
        writeln!(out, "#endif // {INCLUDE_GUARD}")?;
        Ok(out)
    }
}

fn size_assert(out: &mut String, table: &str) -> std::fmt::Result {
    writeln!(
        out,
        "static_assert(sizeof({table}) <= UINT32_MAX,\n              \"index overflow of {table}\");\n"
    )
}

/// Zero-length arrays are ill-formed, so empty tables get one element.
fn placeholder(out: &mut String, empty: bool, element: &str) -> std::fmt::Result {
    if empty {
        writeln!(out, "  {element},")?;
    }
    Ok(())
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn bound(value: i32) -> String {
    if value == i32::MAX {
        "INT_MAX".to_string()
    } else {
        value.to_string()
    }
}

/// A flat `uint32_t` table of string offsets, one row per owning probe.
fn write_index_table<'a>(
    out: &mut String,
    table: &str,
    values: &[u32],
    rows: impl Iterator<Item = (&'a str, u32, u32)>,
) -> std::fmt::Result {
    writeln!(out, "constexpr uint32_t {table}[] = {{")?;
    for (name, offset, count) in rows.filter(|(_, _, count)| *count > 0) {
        let start = offset as usize;
        let slice = &values[start..start + count as usize];
        writeln!(out, "  /* {offset}: {name} */ {},", join(slice))?;
    }
    placeholder(out, values.is_empty(), "0")?;
    writeln!(out, "}};\n")?;
    size_assert(out, table)
}

/// Compile-time re-checks of the bucket layout rules.
fn layout_assert(out: &mut String, histogram: &Histogram) -> std::fmt::Result {
    let name = histogram.name();
    let (low, high, n) = (histogram.low(), histogram.high(), histogram.n_buckets());
    match &histogram.kind {
        HistogramKind::Linear(_) | HistogramKind::Exponential(_) => writeln!(
            out,
            "static_assert({low} >= 1 && {low} < {high} && {n} > 2 && {high} > {n},\n              \"bucket layout of {name}\");"
        ),
        HistogramKind::Enumerated { .. } => writeln!(
            out,
            "static_assert({high} > 2, \"n_values of {name}\");"
        ),
        HistogramKind::Categorical { labels } => writeln!(
            out,
            "static_assert({count} >= 2 && {count} <= {MAX_CATEGORICAL_LABELS}, \"label count of {name}\");",
            count = labels.len()
        ),
        HistogramKind::Boolean | HistogramKind::Flag | HistogramKind::Count => Ok(()),
    }
}

fn write_histograms(
    out: &mut String,
    histograms: &[Histogram],
    tables: &HistogramTables,
) -> std::fmt::Result {
    writeln!(out, "constexpr HistogramInfo gHistogramInfos[] = {{")?;
    for (id, (histogram, info)) in histograms.iter().zip(&tables.infos).enumerate() {
        writeln!(out, "  // {id}: {}", histogram.name())?;
        writeln!(
            out,
            "  {{ {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {:#010x}, {}, {:#010x} }},",
            info.low,
            info.high,
            info.n_buckets,
            info.kind,
            info.name_index,
            info.expiry_index,
            info.dataset.cpp_name(),
            info.labels.offset,
            info.labels.count,
            info.keys.offset,
            info.keys.count,
            info.process_mask,
            info.keyed,
            info.product_mask,
        )?;
    }
    placeholder(out, histograms.is_empty(), "{}")?;
    writeln!(out, "}};\n")?;
    size_assert(out, "gHistogramInfos")?;

    let mut wrote_layout = false;
    for histogram in histograms {
        let before = out.len();
        layout_assert(out, histogram)?;
        wrote_layout |= out.len() > before;
    }
    if wrote_layout {
        writeln!(out)?;
    }

    tables.strings.write_definition(out, "gProbeStringTable")?;

    write_index_table(
        out,
        "gHistogramLabelTable",
        &tables.labels,
        histograms
            .iter()
            .zip(&tables.infos)
            .map(|(h, info)| (h.name(), info.labels.offset, info.labels.count)),
    )?;
    write_index_table(
        out,
        "gHistogramKeyTable",
        &tables.keys,
        histograms
            .iter()
            .zip(&tables.infos)
            .map(|(h, info)| (h.name(), info.keys.offset, info.keys.count)),
    )?;

    writeln!(out, "constexpr int gHistogramBucketLowerBounds[] = {{")?;
    writeln!(out, "  // Reserved for expired histograms.")?;
    writeln!(out, "  {},", join(&EXPIRED_RANGE.map(bound)[..]))?;
    let mut ranges = tables.ranges.iter();
    let mut written = HashSet::new();
    for (histogram, offset) in histograms.iter().zip(&tables.range_offsets) {
        if !written.insert(*offset) {
            continue;
        }
        if let Some(range) = ranges.next() {
            writeln!(out, "  // {offset}: {}", histogram.name())?;
            let bounds: Vec<String> = range.iter().copied().map(bound).collect();
            writeln!(out, "  {},", bounds.join(", "))?;
        }
    }
    writeln!(out, "  0")?;
    writeln!(out, "}};\n")?;
    size_assert(out, "gHistogramBucketLowerBounds")?;

    writeln!(out, "constexpr int16_t gHistogramBucketLowerBoundIndex[] = {{")?;
    for (histogram, offset) in histograms.iter().zip(&tables.range_offsets) {
        writeln!(out, "  {offset}, // {}", histogram.name())?;
    }
    placeholder(out, histograms.is_empty(), "0")?;
    writeln!(out, "}};\n")?;
    size_assert(out, "gHistogramBucketLowerBoundIndex")
}

fn write_events(out: &mut String, probes: &ProbeSet, tables: &EventTables) -> std::fmt::Result {
    let events = probes.events();

    write_index_table(
        out,
        "gExtraKeysTable",
        &tables.extra_keys,
        events
            .iter()
            .zip(&tables.common)
            .map(|(e, common)| (e.name(), common.extra_keys.offset, common.extra_keys.count)),
    )?;

    writeln!(out, "constexpr CommonEventInfo gCommonEventInfo[] = {{")?;
    for (event, common) in events.iter().zip(&tables.common) {
        writeln!(out, "  // {}", event.name())?;
        writeln!(
            out,
            "  {{ {}, {}, {}, {}, {}, {:#010x}, {:#010x} }},",
            common.category_index,
            common.expiry_index,
            common.extra_keys.offset,
            common.extra_keys.count,
            common.dataset.cpp_name(),
            common.process_mask,
            common.product_mask,
        )?;
    }
    placeholder(out, events.is_empty(), "{}")?;
    writeln!(out, "}};\n")?;
    size_assert(out, "gCommonEventInfo")?;

    writeln!(out, "constexpr EventInfo gEventInfo[] = {{")?;
    let expansions = events
        .iter()
        .flat_map(|event| event.expansions().map(move |(m, o)| (event.name(), m, o)));
    for ((name, method, object), info) in expansions.zip(&tables.infos) {
        writeln!(
            out,
            "  {{ {}, {}, {} }}, // {name}: {method} {object}",
            info.common_index, info.method_index, info.object_index
        )?;
    }
    placeholder(out, tables.infos.is_empty(), "{}")?;
    writeln!(out, "}};\n")?;
    size_assert(out, "gEventInfo")?;

    tables.strings.write_definition(out, "gEventsStringTable")
}
