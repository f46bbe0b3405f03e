//! C++ enums naming each histogram and event expansion by its numeric ID.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::{ProbeError, Result, Rule};
use crate::order::ProbeSet;

use super::{Emitter, GENERATED_BANNER};

const INCLUDE_GUARD: &str = "mozilla_TelemetryProbeEnums_h";

pub struct EnumsEmitter;

fn enumerator(name: &str) -> String {
    name.replace('.', "_")
}

/// Rejects enumerators that collide with each other or with `sentinel`.
struct Enumerators<'a> {
    sentinel: &'a str,
    seen: HashSet<String>,
}

impl<'a> Enumerators<'a> {
    fn new(sentinel: &'a str) -> Self {
        Enumerators {
            sentinel,
            seen: HashSet::new(),
        }
    }

    fn add(&mut self, probe: &str, enumerator: String) -> Result<String> {
        if enumerator == self.sentinel || !self.seen.insert(enumerator.clone()) {
            return Err(ProbeError::new(
                Rule::Name,
                format!("enumerator {enumerator} is already used by another probe"),
            )
            .for_probe(probe));
        }
        Ok(enumerator)
    }
}

impl Emitter for EnumsEmitter {
    fn emit(&self, probes: &ProbeSet) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{GENERATED_BANNER}\n")?;
        writeln!(out, "#ifndef {INCLUDE_GUARD}")?;
        writeln!(out, "#define {INCLUDE_GUARD}\n")?;
        writeln!(out, "#include <cstdint>\n")?;
        writeln!(out, "namespace mozilla {{")?;
        writeln!(out, "namespace Telemetry {{\n")?;

        let mut histograms = Enumerators::new("HistogramCount");
        writeln!(out, "enum HistogramID : uint32_t {{")?;
        for (id, histogram) in probes.histograms().iter().enumerate() {
            let name = histograms
                .add(histogram.name(), enumerator(histogram.name()))
                .map_err(|e| e.at(&histogram.meta.source))?;
            writeln!(out, "  {name} = {id},")?;
        }
        writeln!(out, "  HistogramCount = {}", probes.histograms().len())?;
        writeln!(out, "}};\n")?;

        let mut events = Enumerators::new("EventCount");
        let mut count = 0;
        writeln!(out, "enum class EventID : uint32_t {{")?;
        for event in probes.events() {
            for (method, object) in event.expansions() {
                let name = events
                    .add(
                        event.name(),
                        format!("{}_{method}_{object}", enumerator(event.name())),
                    )
                    .map_err(|e| e.at(&event.meta.source))?;
                writeln!(out, "  {name} = {count},")?;
                count += 1;
            }
        }
        writeln!(out, "  EventCount = {count}")?;
        writeln!(out, "}};\n")?;

        writeln!(out, "}} // namespace Telemetry")?;
        writeln!(out, "}} // namespace mozilla\n")?;
        writeln!(out, "#endif // {INCLUDE_GUARD}")?;
        Ok(out)
    }
}
