//! Standard delay format (SDF) parser for EDA applications.
//!
//! ## How to use
//! See [`SdfFile::parse_str`] and [`SdfFile::parse_file`], or build a file
//! programmatically with [`SdfBuilder`]. [`emit_sdf`] turns a model back into
//! SDF text.
//!
//! The model keeps every timing entry of a cell instance in a map keyed by a
//! synthesized name (`iopath_A_Y`, `setup_CLK_D`, ...). Names that collide
//! inside one instance get `_1`, `_2`, ... appended, see [`store_entry`].

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

mod builder;
mod entry;
mod error;
mod sdfpest;
mod timescale;
mod values;
mod writer;

pub use builder::{CellBuilder, SdfBuilder};
pub use entry::{EdgeType, Entry, EntryKind, PinSpec};
pub use error::{ParseError, SdfError};
pub use sdfpest::{parse_tree, Rule, SdfTransformer, SyntaxTree};
pub use timescale::{scale_fs, scale_seconds};
pub use values::{DelayField, DelayPaths, Metric, Values, DEFAULT_TOLERANCE};
pub use writer::emit_sdf;

/// Entry name -> entry, for one cell instance, in the order the entries
/// were stored. Collision suffixes depend on that order.
pub type EntryMap = IndexMap<CompactString, Entry>;
/// Instance name -> entries, for one cell type.
pub type InstanceMap = BTreeMap<CompactString, EntryMap>;
/// Cell type -> instances.
pub type CellMap = BTreeMap<CompactString, InstanceMap>;

/// Divider assumed when the header carries none.
pub const DEFAULT_DIVIDER: &str = "/";

/// The header information of SDF. Every field is optional text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdfHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdfversion: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divider: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timescale: Option<CompactString>,
}

impl SdfHeader {
    pub const FIELDS: [&'static str; 11] = [
        "sdfversion",
        "design",
        "vendor",
        "program",
        "version",
        "divider",
        "date",
        "voltage",
        "process",
        "temperature",
        "timescale",
    ];

    fn slot(&mut self, name: &str) -> Result<&mut Option<CompactString>, SdfError> {
        Ok(match name {
            "sdfversion" => &mut self.sdfversion,
            "design" => &mut self.design,
            "vendor" => &mut self.vendor,
            "program" => &mut self.program,
            "version" => &mut self.version,
            "divider" => &mut self.divider,
            "date" => &mut self.date,
            "voltage" => &mut self.voltage,
            "process" => &mut self.process,
            "temperature" => &mut self.temperature,
            "timescale" => &mut self.timescale,
            _ => {
                return Err(SdfError::InvalidName {
                    kind: "header field",
                    name: name.to_string(),
                })
            }
        })
    }

    /// Looks up a header field by its name.
    pub fn get(&self, name: &str) -> Result<Option<&str>, SdfError> {
        let v = match name {
            "sdfversion" => &self.sdfversion,
            "design" => &self.design,
            "vendor" => &self.vendor,
            "program" => &self.program,
            "version" => &self.version,
            "divider" => &self.divider,
            "date" => &self.date,
            "voltage" => &self.voltage,
            "process" => &self.process,
            "temperature" => &self.temperature,
            "timescale" => &self.timescale,
            _ => {
                return Err(SdfError::InvalidName {
                    kind: "header field",
                    name: name.to_string(),
                })
            }
        };
        Ok(v.as_deref())
    }

    pub fn set(&mut self, name: &str, value: impl Into<CompactString>) -> Result<(), SdfError> {
        *self.slot(name)? = Some(value.into());
        Ok(())
    }

    /// The set fields, in [`SdfHeader::FIELDS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        Self::FIELDS
            .into_iter()
            .filter_map(move |f| self.get(f).ok().flatten().map(|v| (f, v)))
    }

    /// Hierarchy divider, `/` when unset.
    pub fn divider(&self) -> &str {
        self.divider.as_deref().unwrap_or(DEFAULT_DIVIDER)
    }
}

/// The main entry of SDF: a header plus
/// cell type -> instance -> entry name -> [`Entry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdfFile {
    pub header: SdfHeader,
    pub cells: CellMap,
}

/// Stores `entry` under its name, appending `_1`, `_2`, ... on collision.
/// The stored entry's own name is rewritten to the key it lands under,
/// which is returned.
pub fn store_entry(entries: &mut EntryMap, mut entry: Entry) -> CompactString {
    let mut key = entry.name.clone();
    if entries.contains_key(&key) {
        let mut counter = 1usize;
        loop {
            key = format!("{}_{}", entry.name, counter).into();
            if !entries.contains_key(&key) {
                break;
            }
            counter += 1;
        }
        log::trace!("entry name {} taken, stored as {}", entry.name, key);
        entry.name = key.clone();
    }
    entries.insert(key.clone(), entry);
    key
}

impl SdfFile {
    /// Parse a SDF source string to the SDF object, or an error with line
    /// and column. This is the main entry.
    #[inline]
    pub fn parse_str(s: &str) -> Result<SdfFile, ParseError> {
        sdfpest::parse_sdf(s)
    }

    /// Reads and parses one SDF file.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<SdfFile, SdfError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_str(&content)?)
    }

    /// Entry map of one instance, created if missing.
    pub fn instance_mut(
        &mut self,
        celltype: impl Into<CompactString>,
        instance: impl Into<CompactString>,
    ) -> &mut EntryMap {
        self.cells
            .entry(celltype.into())
            .or_default()
            .entry(instance.into())
            .or_default()
    }

    /// All entries as `(celltype, instance, entry)`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Entry)> + '_ {
        self.cells.iter().flat_map(|(celltype, instances)| {
            instances.iter().flat_map(move |(instance, entries)| {
                entries
                    .values()
                    .map(move |e| (celltype.as_str(), instance.as_str(), e))
            })
        })
    }

    pub fn num_instances(&self) -> usize {
        self.cells.values().map(|i| i.len()).sum()
    }

    pub fn num_entries(&self) -> usize {
        self.cells
            .values()
            .flat_map(|i| i.values())
            .map(|e| e.len())
            .sum()
    }

    /// Size of one timescale unit in femtoseconds. Fails when the header
    /// has no timescale or it is malformed.
    pub fn timescale_fs(&self) -> Result<u64, SdfError> {
        let ts = self
            .header
            .timescale
            .as_deref()
            .ok_or(SdfError::MissingHeaderField("timescale"))?;
        scale_fs(ts)
    }
}
