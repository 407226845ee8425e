//! SDF text output.
//!
//! Re-parsing the emitted text gives back the same [`SdfFile`], except for
//! the timescale which is replaced by the one requested.

use crate::*;
use either::Either;
use std::fmt::{self, Display, Formatter};

/// Renders `file` as SDF text with `(TIMESCALE {timescale})`.
pub fn emit_sdf(file: &SdfFile, timescale: &str) -> String {
    SdfText { file, timescale }.to_string()
}

struct SdfText<'a> {
    file: &'a SdfFile,
    timescale: &'a str,
}

/// `min:avg:max` with empty unset slots, nothing at all when no slot is set.
struct Triple<'a>(&'a Values);

impl Display for Triple<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_empty() {
            return Ok(());
        }
        let slot = |f: &mut Formatter<'_>, x: Option<f64>| match x {
            Some(x) => write!(f, "{}", x),
            None => Ok(()),
        };
        slot(f, v.min)?;
        f.write_str(":")?;
        slot(f, v.avg)?;
        f.write_str(":")?;
        slot(f, v.max)
    }
}

struct Port<'a>(&'a str, Option<EdgeType>);

impl Display for Port<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(edge) => write!(f, "({} {})", edge.as_str(), self.0),
            None => f.write_str(self.0),
        }
    }
}

/// The triples of a delay list, by which of `fast`/`nominal`/`slow` are set.
fn delval_list(dp: &DelayPaths) -> impl Iterator<Item = &Values> {
    use Either::*;
    match (&dp.fast, &dp.nominal, &dp.slow) {
        (Some(fast), Some(nominal), Some(slow)) => Right(vec![fast, nominal, slow].into_iter()),
        (Some(fast), None, Some(slow)) => Right(vec![fast, slow].into_iter()),
        _ => {
            if dp.fast.is_some() || dp.slow.is_some() {
                log::warn!("unpaired fast/slow delay cannot be written, keeping nominal only");
            }
            Left(dp.nominal.as_ref().into_iter())
        }
    }
}

fn write_rvalues<'v>(f: &mut Formatter<'_>, values: impl Iterator<Item = &'v Values>) -> fmt::Result {
    for v in values {
        write!(f, " ({})", Triple(v))?;
    }
    Ok(())
}

fn pins(e: &Entry) -> Option<(Port<'_>, Port<'_>)> {
    match (&e.from_pin, &e.to_pin) {
        (Some(from), Some(to)) => Some((Port(from, e.from_pin_edge), Port(to, e.to_pin_edge))),
        _ => {
            log::warn!("entry {} has no pins, not written", e.name);
            None
        }
    }
}

fn field<'e>(e: &'e Entry, field: DelayField) -> &'e Values {
    static EMPTY: Values = Values::new(None, None, None);
    e.delay_paths.as_ref().and_then(|dp| dp.get(field)).unwrap_or(&EMPTY)
}

/// One delay entry, wrapped in `COND`/`CONDELSE` when conditional.
fn write_delay(f: &mut Formatter<'_>, e: &Entry) -> fmt::Result {
    let Some((from, to)) = pins(e) else {
        return Ok(());
    };
    let close = match (e.is_cond, &e.cond_equation) {
        (true, Some(eq)) => {
            write!(f, "      (COND {} ", eq)?;
            ")"
        }
        (true, None) if e.kind == EntryKind::Iopath => {
            f.write_str("      (CONDELSE ")?;
            ")"
        }
        _ => {
            f.write_str("      ")?;
            ""
        }
    };
    match e.kind {
        EntryKind::Iopath | EntryKind::Interconnect => write!(f, "({} {} {}", e.kind.keyword(), from, to)?,
        _ => write!(f, "({} {}", e.kind.keyword(), from)?,
    }
    if let Some(dp) = &e.delay_paths {
        write_rvalues(f, delval_list(dp))?;
    }
    writeln!(f, "){}", close)
}

/// One timing check or path constraint. Checks are written reference port
/// (`from`) second, which is also where a condition goes.
fn write_check(f: &mut Formatter<'_>, e: &Entry) -> fmt::Result {
    let Some((from, to)) = pins(e) else {
        return Ok(());
    };
    let kw = e.kind.keyword();
    let cond_from = |f: &mut Formatter<'_>| match &e.cond_equation {
        Some(eq) => write!(f, "(COND {} {})", eq, from),
        None => write!(f, "{}", from),
    };
    f.write_str("      (")?;
    f.write_str(kw)?;
    f.write_str(" ")?;
    match e.kind {
        EntryKind::Width => {
            cond_from(f)?;
            write_rvalues(f, [field(e, DelayField::Nominal)].into_iter())?;
        }
        EntryKind::SetupHold => {
            write!(f, "{} ", to)?;
            cond_from(f)?;
            let sh = [field(e, DelayField::Setup), field(e, DelayField::Hold)];
            write_rvalues(f, sh.into_iter())?;
        }
        EntryKind::PathConstraint => {
            write!(f, "{} {}", to, from)?;
            let rf = [field(e, DelayField::Rise), field(e, DelayField::Fall)];
            write_rvalues(f, rf.into_iter())?;
        }
        _ => {
            write!(f, "{} ", to)?;
            cond_from(f)?;
            write_rvalues(f, [field(e, DelayField::Nominal)].into_iter())?;
        }
    }
    writeln!(f, ")")
}

fn write_section<'e>(
    f: &mut Formatter<'_>,
    indent: &str,
    keyword: &str,
    entries: &[&'e Entry],
    write_one: fn(&mut Formatter<'_>, &'e Entry) -> fmt::Result,
) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}({}", indent, keyword)?;
    for e in entries {
        write_one(f, *e)?;
    }
    writeln!(f, "{})", indent)
}

fn write_cell(f: &mut Formatter<'_>, celltype: &str, instance: &str, entries: &EntryMap) -> fmt::Result {
    writeln!(f, "  (CELL")?;
    writeln!(f, "    (CELLTYPE \"{}\")", celltype)?;
    if instance.is_empty() {
        writeln!(f, "    (INSTANCE)")?;
    } else {
        writeln!(f, "    (INSTANCE {})", instance)?;
    }

    let mut delays = Vec::new();
    let mut checks = Vec::new();
    let mut env = Vec::new();
    for e in entries.values() {
        if e.kind.is_delay() {
            delays.push(e);
        } else if e.kind.is_timing_check() {
            checks.push(e);
        } else {
            env.push(e);
        }
    }

    // Delay entries keep their stored order, so a new ABSOLUTE/INCREMENT
    // block starts wherever the flag changes. Builder entries carry neither
    // flag and count as absolute.
    if !delays.is_empty() {
        writeln!(f, "    (DELAY")?;
        for run in delays.chunk_by(|a, b| a.is_incremental == b.is_incremental) {
            let keyword = if run[0].is_incremental { "INCREMENT" } else { "ABSOLUTE" };
            write_section(f, "     ", keyword, run, write_delay)?;
        }
        writeln!(f, "    )")?;
    }
    write_section(f, "    ", "TIMINGCHECK", &checks, write_check)?;
    write_section(f, "    ", "TIMINGENV", &env, write_check)?;
    writeln!(f, "  )")
}

impl Display for SdfText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let h = &self.file.header;
        writeln!(f, "(DELAYFILE")?;
        let quoted = [
            ("SDFVERSION", &h.sdfversion),
            ("DESIGN", &h.design),
            ("DATE", &h.date),
            ("VENDOR", &h.vendor),
            ("PROGRAM", &h.program),
            ("VERSION", &h.version),
        ];
        for (kw, v) in quoted {
            if let Some(v) = v {
                writeln!(f, "  ({} \"{}\")", kw, v)?;
            }
        }
        if let Some(d) = &h.divider {
            writeln!(f, "  (DIVIDER {})", d)?;
        }
        if let Some(v) = &h.voltage {
            writeln!(f, "  (VOLTAGE {})", v)?;
        }
        if let Some(v) = &h.process {
            writeln!(f, "  (PROCESS \"{}\")", v)?;
        }
        if let Some(v) = &h.temperature {
            writeln!(f, "  (TEMPERATURE {})", v)?;
        }
        writeln!(f, "  (TIMESCALE {})", self.timescale)?;
        for (celltype, instances) in &self.file.cells {
            for (instance, entries) in instances {
                write_cell(f, celltype, instance, entries)?;
            }
        }
        writeln!(f, ")")
    }
}
