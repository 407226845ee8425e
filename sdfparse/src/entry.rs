//! Timing entries stored per cell instance.

use crate::values::DelayPaths;
use crate::SdfError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The fixed vocabulary of entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Port,
    Interconnect,
    Iopath,
    Device,
    Setup,
    Hold,
    Removal,
    Recovery,
    Width,
    SetupHold,
    PathConstraint,
}

impl EntryKind {
    pub const ALL: [EntryKind; 11] = [
        EntryKind::Port,
        EntryKind::Interconnect,
        EntryKind::Iopath,
        EntryKind::Device,
        EntryKind::Setup,
        EntryKind::Hold,
        EntryKind::Removal,
        EntryKind::Recovery,
        EntryKind::Width,
        EntryKind::SetupHold,
        EntryKind::PathConstraint,
    ];

    /// Lowercase name, used both as the entry name prefix and as the
    /// serialized `type` discriminator.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Port => "port",
            EntryKind::Interconnect => "interconnect",
            EntryKind::Iopath => "iopath",
            EntryKind::Device => "device",
            EntryKind::Setup => "setup",
            EntryKind::Hold => "hold",
            EntryKind::Removal => "removal",
            EntryKind::Recovery => "recovery",
            EntryKind::Width => "width",
            EntryKind::SetupHold => "setuphold",
            EntryKind::PathConstraint => "pathconstraint",
        }
    }

    /// SDF keyword for this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            EntryKind::Port => "PORT",
            EntryKind::Interconnect => "INTERCONNECT",
            EntryKind::Iopath => "IOPATH",
            EntryKind::Device => "DEVICE",
            EntryKind::Setup => "SETUP",
            EntryKind::Hold => "HOLD",
            EntryKind::Removal => "REMOVAL",
            EntryKind::Recovery => "RECOVERY",
            EntryKind::Width => "WIDTH",
            EntryKind::SetupHold => "SETUPHOLD",
            EntryKind::PathConstraint => "PATHCONSTRAINT",
        }
    }

    pub fn is_delay(self) -> bool {
        matches!(
            self,
            EntryKind::Port | EntryKind::Interconnect | EntryKind::Iopath | EntryKind::Device
        )
    }

    pub fn is_timing_check(self) -> bool {
        matches!(
            self,
            EntryKind::Setup
                | EntryKind::Hold
                | EntryKind::Removal
                | EntryKind::Recovery
                | EntryKind::Width
                | EntryKind::SetupHold
        )
    }

    /// Kinds whose entries carry a single pin (`from_pin == to_pin`).
    pub fn is_single_pin(self) -> bool {
        matches!(self, EntryKind::Port | EntryKind::Device | EntryKind::Width)
    }
}

impl FromStr for EntryKind {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SdfError::UnknownEntryKind(s.to_string()))
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge qualifier on an entry pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Posedge,
    Negedge,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::Posedge => "posedge",
            EdgeType::Negedge => "negedge",
        }
    }
}

/// One timing entry of a cell instance.
///
/// All kinds share this record; `kind` says which [`DelayPaths`] fields
/// carry meaning. `delay_paths == None` means "no delay data", which is
/// not the same as a zero delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: CompactString,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub from_pin: Option<CompactString>,
    pub to_pin: Option<CompactString>,
    pub from_pin_edge: Option<EdgeType>,
    pub to_pin_edge: Option<EdgeType>,
    pub delay_paths: Option<DelayPaths>,
    pub cond_equation: Option<CompactString>,
    pub is_timing_check: bool,
    pub is_timing_env: bool,
    pub is_absolute: bool,
    pub is_incremental: bool,
    pub is_cond: bool,
}

/// A pin reference with its optional edge qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinSpec {
    pub pin: CompactString,
    pub edge: Option<EdgeType>,
}

impl PinSpec {
    pub fn new(pin: impl Into<CompactString>) -> Self {
        PinSpec { pin: pin.into(), edge: None }
    }

    pub fn edge(pin: impl Into<CompactString>, edge: EdgeType) -> Self {
        PinSpec { pin: pin.into(), edge: Some(edge) }
    }
}

impl From<&str> for PinSpec {
    fn from(pin: &str) -> Self {
        PinSpec::new(pin)
    }
}

impl From<String> for PinSpec {
    fn from(pin: String) -> Self {
        PinSpec::new(pin)
    }
}

impl From<CompactString> for PinSpec {
    fn from(pin: CompactString) -> Self {
        PinSpec::new(pin)
    }
}

impl Entry {
    /// A bare entry with the kind's default flags and no pins.
    pub fn empty(kind: EntryKind, name: impl Into<CompactString>) -> Self {
        Entry {
            name: name.into(),
            kind,
            from_pin: None,
            to_pin: None,
            from_pin_edge: None,
            to_pin_edge: None,
            delay_paths: None,
            cond_equation: None,
            is_timing_check: kind.is_timing_check(),
            is_timing_env: kind == EntryKind::PathConstraint,
            is_absolute: false,
            is_incremental: false,
            is_cond: false,
        }
    }

    /// A two-pin entry named `{kind}_{from}_{to}`.
    pub fn two_pin(
        kind: EntryKind,
        from: impl Into<PinSpec>,
        to: impl Into<PinSpec>,
        delay_paths: DelayPaths,
    ) -> Self {
        let (from, to) = (from.into(), to.into());
        let name = format!("{}_{}_{}", kind.as_str(), from.pin, to.pin);
        Entry {
            from_pin: Some(from.pin),
            to_pin: Some(to.pin),
            from_pin_edge: from.edge,
            to_pin_edge: to.edge,
            delay_paths: Some(delay_paths),
            ..Entry::empty(kind, name)
        }
    }

    /// A single-pin entry named `{kind}_{pin}`, the pin repeated on both ends.
    pub fn single_pin(kind: EntryKind, pin: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        let pin = pin.into();
        let name = format!("{}_{}", kind.as_str(), pin.pin);
        Entry {
            from_pin: Some(pin.pin.clone()),
            to_pin: Some(pin.pin),
            from_pin_edge: pin.edge,
            to_pin_edge: pin.edge,
            delay_paths: Some(delay_paths),
            ..Entry::empty(kind, name)
        }
    }

    pub fn iopath(from: impl Into<PinSpec>, to: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        Entry::two_pin(EntryKind::Iopath, from, to, delay_paths)
    }

    pub fn interconnect(from: impl Into<PinSpec>, to: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        Entry::two_pin(EntryKind::Interconnect, from, to, delay_paths)
    }

    pub fn port(pin: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        Entry::single_pin(EntryKind::Port, pin, delay_paths)
    }

    pub fn device(pin: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        Entry::single_pin(EntryKind::Device, pin, delay_paths)
    }

    pub fn path_constraint(from: impl Into<PinSpec>, to: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        Entry::two_pin(EntryKind::PathConstraint, from, to, delay_paths)
    }

    /// Builds a timing check of `kind`. `WIDTH` uses `from` for both pins
    /// and is named `width_{pin}_{pin}`.
    ///
    /// Fails with [`SdfError::UnknownEntryKind`] when `kind` is not a
    /// timing check.
    pub fn timing_check(
        kind: EntryKind,
        from: impl Into<PinSpec>,
        to: impl Into<PinSpec>,
        delay_paths: DelayPaths,
    ) -> Result<Self, SdfError> {
        if !kind.is_timing_check() {
            return Err(SdfError::UnknownEntryKind(kind.to_string()));
        }
        if kind == EntryKind::Width {
            let pin = from.into();
            return Ok(Entry::two_pin(kind, pin.clone(), pin, delay_paths));
        }
        Ok(Entry::two_pin(kind, from, to, delay_paths))
    }

    /// Marks the entry as conditional on `equation`.
    pub fn with_cond(mut self, equation: impl Into<CompactString>) -> Self {
        self.is_cond = true;
        self.cond_equation = Some(equation.into());
        self
    }
}
