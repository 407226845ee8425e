//! Programmatic construction of [`SdfFile`]s.
//!
//! ```
//! use sdfparse::{DelayPaths, SdfBuilder, Values};
//!
//! let sdf = SdfBuilder::new()
//!     .set_header("timescale", "1ps")
//!     .unwrap()
//!     .add_cell("BUF", "b0")
//!     .add_iopath("A", "Y", DelayPaths::nominal(Values::triple(1.0, 2.0, 3.0)))
//!     .build();
//! assert_eq!(sdf.num_entries(), 1);
//! ```

use crate::*;

/// Collects header fields and cells, then [`build`](SdfBuilder::build)s a
/// file.
#[derive(Debug, Default)]
pub struct SdfBuilder {
    file: SdfFile,
}

impl SdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(mut self, field: &str, value: impl Into<CompactString>) -> Result<Self, SdfError> {
        self.file.header.set(field, value)?;
        Ok(self)
    }

    /// Starts (or reopens) the entry map of one cell instance.
    pub fn add_cell(
        mut self,
        celltype: impl Into<CompactString>,
        instance: impl Into<CompactString>,
    ) -> CellBuilder {
        let celltype = celltype.into();
        let instance = instance.into();
        self.file.instance_mut(celltype.clone(), instance.clone());
        CellBuilder {
            sdf: self,
            celltype,
            instance,
        }
    }

    pub fn build(self) -> SdfFile {
        log::debug!(
            "built SDF: {} instances, {} entries",
            self.file.num_instances(),
            self.file.num_entries()
        );
        self.file
    }
}

/// Adds entries to one cell instance. Names follow the same collision rule
/// as parsing (see [`store_entry`]).
#[derive(Debug)]
pub struct CellBuilder {
    sdf: SdfBuilder,
    celltype: CompactString,
    instance: CompactString,
}

impl CellBuilder {
    fn entries(&mut self) -> &mut EntryMap {
        self.sdf
            .file
            .instance_mut(self.celltype.clone(), self.instance.clone())
    }

    pub fn add_entry(mut self, entry: Entry) -> Self {
        store_entry(self.entries(), entry);
        self
    }

    pub fn add_iopath(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        self.add_entry(Entry::iopath(from, to, delay_paths))
    }

    pub fn add_interconnect(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        self.add_entry(Entry::interconnect(from, to, delay_paths))
    }

    pub fn add_port(self, pin: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        self.add_entry(Entry::port(pin, delay_paths))
    }

    pub fn add_device(self, pin: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        self.add_entry(Entry::device(pin, delay_paths))
    }

    fn add_check(self, kind: EntryKind, from: impl Into<PinSpec>, to: impl Into<PinSpec>, delay_paths: DelayPaths) -> Self {
        self.add_entry(Entry::two_pin(kind, from, to, delay_paths))
    }

    pub fn add_setup(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, values: Values) -> Self {
        self.add_check(EntryKind::Setup, from, to, DelayPaths::nominal(values))
    }

    pub fn add_hold(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, values: Values) -> Self {
        self.add_check(EntryKind::Hold, from, to, DelayPaths::nominal(values))
    }

    pub fn add_removal(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, values: Values) -> Self {
        self.add_check(EntryKind::Removal, from, to, DelayPaths::nominal(values))
    }

    pub fn add_recovery(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, values: Values) -> Self {
        self.add_check(EntryKind::Recovery, from, to, DelayPaths::nominal(values))
    }

    pub fn add_setuphold(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, setup: Values, hold: Values) -> Self {
        let delay_paths = DelayPaths {
            setup: Some(setup),
            hold: Some(hold),
            ..Default::default()
        };
        self.add_check(EntryKind::SetupHold, from, to, delay_paths)
    }

    pub fn add_width(self, pin: impl Into<PinSpec>, values: Values) -> Self {
        let pin = pin.into();
        self.add_check(EntryKind::Width, pin.clone(), pin, DelayPaths::nominal(values))
    }

    pub fn add_path_constraint(self, from: impl Into<PinSpec>, to: impl Into<PinSpec>, rise: Values, fall: Values) -> Self {
        let delay_paths = DelayPaths {
            rise: Some(rise),
            fall: Some(fall),
            ..Default::default()
        };
        self.add_entry(Entry::path_constraint(from, to, delay_paths))
    }

    /// Finishes this cell and starts another one.
    pub fn add_cell(self, celltype: impl Into<CompactString>, instance: impl Into<CompactString>) -> CellBuilder {
        self.sdf.add_cell(celltype, instance)
    }

    pub fn build(self) -> SdfFile {
        self.sdf.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_names_get_suffixes() {
        let dp = DelayPaths::nominal(Values::triple(0.1, 0.2, 0.3));
        let sdf = SdfBuilder::new()
            .add_cell("DFF", "ff0")
            .add_iopath("CP", "Q", dp.clone())
            .add_iopath("CP", "Q", dp.clone())
            .add_iopath("CP", "Q", dp)
            .build();
        let entries = &sdf.cells["DFF"]["ff0"];
        let keys: Vec<&str> = entries.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["iopath_CP_Q", "iopath_CP_Q_1", "iopath_CP_Q_2"]);
        assert!(entries.iter().all(|(k, e)| *k == e.name));
    }

    #[test]
    fn checks_and_constraints() {
        let sdf = SdfBuilder::new()
            .set_header("design", "top")
            .unwrap()
            .add_cell("DFF", "ff0")
            .add_setup("D", PinSpec::edge("CLK", EdgeType::Posedge), Values::bare(0.1))
            .add_setuphold("D", "CLK", Values::bare(0.1), Values::bare(0.05))
            .add_width("CLK", Values::bare(1.0))
            .add_cell("top", "")
            .add_path_constraint("a", "b", Values::bare(1.0), Values::bare(2.0))
            .build();
        assert_eq!(sdf.header.design.as_deref(), Some("top"));
        let ff = &sdf.cells["DFF"]["ff0"];
        assert!(ff["setup_D_CLK"].is_timing_check);
        assert_eq!(ff["setup_D_CLK"].to_pin_edge, Some(EdgeType::Posedge));
        assert_eq!(ff["setuphold_D_CLK"].delay_paths.as_ref().unwrap().hold, Some(Values::bare(0.05)));
        assert!(ff.contains_key("width_CLK_CLK"));
        let pc = &sdf.cells["top"][""]["pathconstraint_a_b"];
        assert!(pc.is_timing_env);
        assert_eq!(pc.delay_paths.as_ref().unwrap().fall, Some(Values::bare(2.0)));
    }

    #[test]
    fn empty_cell_is_kept() {
        let sdf = SdfBuilder::new().add_cell("BUF", "b0").build();
        assert!(sdf.cells["BUF"]["b0"].is_empty());
    }

    #[test]
    fn bad_header_field() {
        assert!(SdfBuilder::new().set_header("colour", "red").is_err());
    }
}
