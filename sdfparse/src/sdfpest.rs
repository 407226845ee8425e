//! Pest token to data structure.
//!
//! [`SdfTransformer`] folds one syntax tree into one [`SdfFile`]. The
//! entries found inside a `CELL` are gathered in a pending list owned by
//! that cell's fold and committed to the instance map when the cell ends,
//! so nothing survives from one parse to the next.

use super::*;
use parsing_utils::PairsHelper;
use pest::Parser;
use pest_derive::Parser;
use std::str::FromStr;

#[derive(Parser)]
#[grammar = "sdf.pest"]
struct SDFParser;

/// A syntax tree rooted at [`Rule::main`], as produced by [`parse_tree`].
pub type SyntaxTree<'i> = pest::iterators::Pair<'i, Rule>;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/// Runs the grammar only.
pub fn parse_tree(s: &str) -> Result<SyntaxTree<'_>, ParseError> {
    let mut pairs = SDFParser::parse(Rule::main, s)?;
    Ok(pairs.next().unwrap())
}

pub(crate) fn parse_sdf(s: &str) -> Result<SdfFile, ParseError> {
    let tree = parse_tree(s)?;
    let file = SdfTransformer::new().transform(tree);
    log::debug!(
        "parsed SDF: {} cell types, {} instances, {} entries",
        file.cells.len(),
        file.num_instances(),
        file.num_entries()
    );
    Ok(file)
}

#[inline]
fn unwrap_one(p: Pair) -> Pair {
    let mut p = PairsHelper(p.into_inner());
    p.next()
}

#[inline]
fn parse_qstring(p: Pair) -> CompactString {
    assert_eq!(p.as_rule(), Rule::qstring);
    let s = p.as_str();
    s[1..s.len() - 1].into()
}

#[inline]
fn parse_real(p: Pair) -> f64 {
    assert_eq!(p.as_rule(), Rule::real);
    f64::from_str(p.as_str()).unwrap()
}

/// A triple: each lexical slot contributes a number only if one is written
/// there.
#[inline]
fn parse_triple(p: Pair) -> Values {
    assert_eq!(p.as_rule(), Rule::triple);
    let mut p = PairsHelper(p.into_inner());
    let mut slot = || p.next().into_inner().next().map(parse_real);
    let min = slot();
    let avg = slot();
    let max = slot();
    Values { min, avg, max }
}

/// A bare number with no colons lands in `avg` only.
#[inline]
fn parse_value(p: Pair) -> Values {
    assert_eq!(p.as_rule(), Rule::value);
    let p = unwrap_one(p);
    match p.as_rule() {
        Rule::triple => parse_triple(p),
        Rule::real => Values::bare(parse_real(p)),
        _ => unreachable!(),
    }
}

#[inline]
fn parse_rvalue(p: Pair) -> Values {
    assert_eq!(p.as_rule(), Rule::rvalue);
    p.into_inner().next().map(parse_value).unwrap_or_default()
}

/// Positional dispatch: one triple is `nominal`, two are `fast, slow`,
/// three are `fast, nominal, slow`. Any other count gives an empty
/// `nominal`.
fn parse_delval_list(p: Pair) -> DelayPaths {
    assert_eq!(p.as_rule(), Rule::delval_list);
    let triples: Vec<Values> = p.into_inner().map(parse_rvalue).collect();
    match triples[..] {
        [nominal] => DelayPaths { nominal: Some(nominal), ..Default::default() },
        [fast, slow] => DelayPaths { fast: Some(fast), slow: Some(slow), ..Default::default() },
        [fast, nominal, slow] => DelayPaths {
            fast: Some(fast),
            nominal: Some(nominal),
            slow: Some(slow),
            ..Default::default()
        },
        _ => DelayPaths::nominal(Values::default()),
    }
}

/// Header triples are kept as text, `min:avg:max` with empty unset slots.
fn format_triple(v: &Values) -> CompactString {
    let slot = |x: Option<f64>| x.map(|x| x.to_string()).unwrap_or_default();
    format!("{}:{}:{}", slot(v.min), slot(v.avg), slot(v.max)).into()
}

fn header_text(p: Pair) -> CompactString {
    p.into_inner().next().map(parse_qstring).unwrap_or_default()
}

fn header_triple(p: Pair) -> CompactString {
    format_triple(&p.into_inner().next().map(parse_value).unwrap_or_default())
}

#[inline]
fn parse_port_spec(p: Pair) -> PinSpec {
    assert_eq!(p.as_rule(), Rule::port_spec);
    let p = unwrap_one(p);
    match p.as_rule() {
        Rule::path => PinSpec::new(p.as_str()),
        Rule::edge_spec => {
            let mut p = PairsHelper(p.into_inner());
            let edge = match p.next().as_str().to_ascii_lowercase().as_str() {
                "posedge" => EdgeType::Posedge,
                "negedge" => EdgeType::Negedge,
                _ => unreachable!(),
            };
            PinSpec::edge(p.next().as_str(), edge)
        }
        _ => unreachable!(),
    }
}

/// Condition tokens joined by one space.
#[inline]
fn parse_cond_expr(p: Pair) -> CompactString {
    assert!(matches!(p.as_rule(), Rule::cond_expr | Rule::tchk_cond_expr));
    let tokens: Vec<&str> = p.into_inner().map(|t| t.as_str()).collect();
    tokens.join(" ").into()
}

/// A timing check port and the condition attached to it, if any.
fn parse_port_tchk(p: Pair) -> (PinSpec, Option<CompactString>) {
    assert_eq!(p.as_rule(), Rule::port_tchk);
    let p = unwrap_one(p);
    match p.as_rule() {
        Rule::port_spec => (parse_port_spec(p), None),
        Rule::cond_port => {
            let mut p = PairsHelper(p.into_inner());
            p.next_rule_opt(Rule::qstring);
            let cond = parse_cond_expr(p.next());
            (parse_port_spec(p.next()), Some(cond))
        }
        _ => unreachable!(),
    }
}

fn parse_del_entry(p: Pair) -> Entry {
    let rule = p.as_rule();
    let mut p = PairsHelper(p.into_inner());
    match rule {
        Rule::iopath => {
            let from = parse_port_spec(p.next());
            let to = parse_port_spec(p.next());
            // RETAIN limits are accepted but not modelled.
            p.next_rule_opt(Rule::retain);
            Entry::iopath(from, to, parse_delval_list(p.next()))
        }
        Rule::interconnect => {
            let from = parse_port_spec(p.next());
            let to = parse_port_spec(p.next());
            Entry::interconnect(from, to, parse_delval_list(p.next()))
        }
        Rule::port_delay => {
            let pin = parse_port_spec(p.next());
            Entry::port(pin, parse_delval_list(p.next()))
        }
        Rule::device => {
            let pin = parse_port_spec(p.next());
            Entry::device(pin, parse_delval_list(p.next()))
        }
        _ => unreachable!("unexpected delay entry {:?}", rule),
    }
}

/// Collects the entries of one `ABSOLUTE`/`INCREMENT` child, applying a
/// `COND`/`CONDELSE` wrapper to everything it wraps.
fn parse_del_def(p: Pair, out: &mut Vec<Entry>) {
    match p.as_rule() {
        Rule::cond_delay => {
            let mut p = PairsHelper(p.into_inner());
            p.next_rule_opt(Rule::qstring);
            let cond = parse_cond_expr(p.next());
            for entry in (&mut p.0).map(parse_del_entry) {
                out.push(entry.with_cond(cond.clone()));
            }
        }
        Rule::condelse_delay => {
            let mut entry = parse_del_entry(unwrap_one(p));
            entry.is_cond = true;
            out.push(entry);
        }
        _ => out.push(parse_del_entry(p)),
    }
}

fn parse_timing_check(p: Pair) -> Entry {
    let kind = match p.as_rule() {
        Rule::setup_check => EntryKind::Setup,
        Rule::hold_check => EntryKind::Hold,
        Rule::removal_check => EntryKind::Removal,
        Rule::recovery_check => EntryKind::Recovery,
        Rule::setuphold_check => EntryKind::SetupHold,
        Rule::width_check => EntryKind::Width,
        _ => unreachable!(),
    };
    let mut p = PairsHelper(p.into_inner());
    if kind == EntryKind::Width {
        let (pin, cond) = parse_port_tchk(p.next());
        let entry = Entry::two_pin(kind, pin.clone(), pin, DelayPaths::nominal(parse_rvalue(p.next())));
        return match cond {
            Some(cond) => entry.with_cond(cond),
            None => entry,
        };
    }
    // (CHECK data reference ...): the reference port is the `from` side,
    // and only its condition is kept.
    let (to, _) = parse_port_tchk(p.next());
    let (from, from_cond) = parse_port_tchk(p.next());
    let delay_paths = match kind {
        EntryKind::SetupHold => DelayPaths {
            setup: Some(parse_rvalue(p.next())),
            hold: Some(parse_rvalue(p.next())),
            ..Default::default()
        },
        _ => DelayPaths::nominal(parse_rvalue(p.next())),
    };
    let entry = Entry::two_pin(kind, from, to, delay_paths);
    match from_cond {
        Some(cond) => entry.with_cond(cond),
        None => entry,
    }
}

fn parse_path_constraint(p: Pair) -> Entry {
    assert_eq!(p.as_rule(), Rule::path_constraint);
    let mut p = PairsHelper(p.into_inner());
    let to = parse_port_spec(p.next());
    let from = parse_port_spec(p.next());
    let delay_paths = DelayPaths {
        rise: Some(parse_rvalue(p.next())),
        fall: Some(parse_rvalue(p.next())),
        ..Default::default()
    };
    Entry::two_pin(EntryKind::PathConstraint, from, to, delay_paths)
}

/// Folds one syntax tree into one [`SdfFile`].
///
/// `transform` consumes the transformer, so an instance serves exactly one
/// parse; build a new one for the next tree.
#[derive(Debug, Default)]
pub struct SdfTransformer {
    file: SdfFile,
}

impl SdfTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, tree: SyntaxTree<'_>) -> SdfFile {
        assert_eq!(tree.as_rule(), Rule::main);
        let mut p = PairsHelper(tree.into_inner());
        self.fold_header(p.next());
        for cell in p.iter_while(Rule::cell) {
            self.fold_cell(cell);
        }
        p.next_rule(Rule::EOI);
        self.file
    }

    fn fold_header(&mut self, p: Pair) {
        assert_eq!(p.as_rule(), Rule::header);
        let header = &mut self.file.header;
        for item in p.into_inner() {
            match item.as_rule() {
                Rule::sdf_version => header.sdfversion = Some(header_text(item)),
                Rule::design => header.design = Some(header_text(item)),
                Rule::date => header.date = Some(header_text(item)),
                Rule::vendor => header.vendor = Some(header_text(item)),
                Rule::program => header.program = Some(header_text(item)),
                Rule::version => header.version = Some(header_text(item)),
                Rule::process => header.process = Some(header_text(item)),
                Rule::divider => header.divider = Some(unwrap_one(item).as_str().into()),
                Rule::voltage => header.voltage = Some(header_triple(item)),
                Rule::temperature => header.temperature = Some(header_triple(item)),
                Rule::timescale => {
                    let mut p = PairsHelper(item.into_inner());
                    let number = f64::from_str(p.next().as_str()).unwrap();
                    let unit = p.next().as_str().to_ascii_lowercase();
                    header.timescale = Some(format!("{}{}", number, unit).into());
                }
                rule => unreachable!("unexpected header item {:?}", rule),
            }
        }
    }

    fn fold_cell(&mut self, p: Pair) {
        assert_eq!(p.as_rule(), Rule::cell);
        let mut p = PairsHelper(p.into_inner());
        let celltype = parse_qstring(unwrap_one(p.next()));
        let instance: CompactString = p
            .next_rule_opt(Rule::instance)
            .and_then(|i| i.into_inner().next())
            .map(|i| i.as_str().into())
            .unwrap_or_default();

        let mut pending: Vec<Entry> = Vec::new();
        for spec in &mut p.0 {
            match spec.as_rule() {
                Rule::delay => {
                    for block in spec.into_inner() {
                        let incremental = match block.as_rule() {
                            Rule::absolute => false,
                            Rule::increment => true,
                            _ => unreachable!(),
                        };
                        let mut entries = Vec::new();
                        for def in block.into_inner() {
                            parse_del_def(def, &mut entries);
                        }
                        for mut entry in entries {
                            if incremental {
                                entry.is_incremental = true;
                            } else {
                                entry.is_absolute = true;
                            }
                            pending.push(entry);
                        }
                    }
                }
                Rule::timingcheck => pending.extend(spec.into_inner().map(parse_timing_check)),
                Rule::timingenv => pending.extend(spec.into_inner().map(parse_path_constraint)),
                _ => unreachable!(),
            }
        }

        log::trace!("cell {} {:?}: {} entries", celltype, instance, pending.len());
        let entries = self.file.instance_mut(celltype, instance);
        for entry in pending {
            store_entry(entries, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> SdfFile {
        match SdfFile::parse_str(s) {
            Ok(sdf) => sdf,
            Err(e) => panic!("Parsing error: {e}"),
        }
    }

    fn wrap_cell(body: &str) -> String {
        format!(r#"(DELAYFILE (SDFVERSION "3.0") (CELL (CELLTYPE "C") (INSTANCE i0) {body}))"#)
    }

    fn only_entry(sdf: &SdfFile) -> &Entry {
        let entries = &sdf.cells["C"]["i0"];
        assert_eq!(entries.len(), 1);
        entries.values().next().unwrap()
    }

    #[test]
    fn single_buffer() {
        let sdf = parse(
            r#"(DELAYFILE (SDFVERSION "3.0")(TIMESCALE 1ps)(CELL(CELLTYPE "BUF")(INSTANCE b0)(DELAY(ABSOLUTE(IOPATH A Y (1.0:2.0:3.0))))))"#,
        );
        let entries = &sdf.cells["BUF"]["b0"];
        let e = &entries["iopath_A_Y"];
        assert_eq!(entries.len(), 1);
        assert_eq!(e.kind, EntryKind::Iopath);
        assert!(e.is_absolute);
        assert_eq!(e.delay_paths.as_ref().unwrap().nominal, Some(Values::triple(1.0, 2.0, 3.0)));
    }

    #[test]
    fn tree_is_fully_consumed() {
        let tree = parse_tree("(DELAYFILE) // trailing comment\n").unwrap();
        assert_eq!(tree.clone().into_inner().last().map(|p| p.as_rule()), Some(Rule::EOI));
        let sdf = SdfTransformer::new().transform(tree);
        assert_eq!(sdf, SdfFile::default());
    }

    #[test]
    fn bare_value_goes_to_avg() {
        let sdf = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH A Y (2.5))))"));
        let e = only_entry(&sdf);
        assert_eq!(e.delay_paths.as_ref().unwrap().nominal, Some(Values::bare(2.5)));
    }

    #[test]
    fn elided_slots_stay_unset() {
        let sdf = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH A Y (1.0::3.0))))"));
        let nominal = only_entry(&sdf).delay_paths.as_ref().unwrap().nominal.unwrap();
        assert_eq!(nominal, Values::new(Some(1.0), None, Some(3.0)));
        let sdf = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH A Y (::))))"));
        let nominal = only_entry(&sdf).delay_paths.as_ref().unwrap().nominal.unwrap();
        assert!(nominal.is_empty());
    }

    #[test]
    fn arity_dispatch() {
        let sdf = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH A Y (1:1:1) (2:2:2))))"));
        let dp = only_entry(&sdf).delay_paths.clone().unwrap();
        assert_eq!(dp.fast, Some(Values::triple(1.0, 1.0, 1.0)));
        assert_eq!(dp.slow, Some(Values::triple(2.0, 2.0, 2.0)));
        assert_eq!(dp.nominal, None);

        let sdf = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH A Y (1:1:1) (2:2:2) (3:3:3))))"));
        let dp = only_entry(&sdf).delay_paths.clone().unwrap();
        assert_eq!(dp.fast, Some(Values::triple(1.0, 1.0, 1.0)));
        assert_eq!(dp.nominal, Some(Values::triple(2.0, 2.0, 2.0)));
        assert_eq!(dp.slow, Some(Values::triple(3.0, 3.0, 3.0)));

        for body in ["(IOPATH A Y)", "(IOPATH A Y (1) (2) (3) (4))"] {
            let sdf = parse(&wrap_cell(&format!("(DELAY (ABSOLUTE {body}))")));
            let dp = only_entry(&sdf).delay_paths.clone().unwrap();
            assert_eq!(dp, DelayPaths::nominal(Values::default()));
        }
    }

    #[test]
    fn increment_and_cond_flags() {
        let sdf = parse(&wrap_cell(
            "(DELAY (INCREMENT (COND A==1'b1 (IOPATH B Y (1)) (IOPATH C Y (2)))))",
        ));
        let entries = &sdf.cells["C"]["i0"];
        assert_eq!(entries.len(), 2);
        for e in entries.values() {
            assert!(e.is_incremental);
            assert!(!e.is_absolute);
            assert!(e.is_cond);
            assert_eq!(e.cond_equation.as_deref(), Some("A == 1'b1"));
        }
    }

    #[test]
    fn cond_group_with_keyword_prefix() {
        let sdf = parse(&wrap_cell(
            "(DELAY (ABSOLUTE (COND (PORTSEL == 1'b1) && DEVICE_EN (IOPATH A Y (1)))))",
        ));
        let e = only_entry(&sdf);
        assert_eq!(e.name, "iopath_A_Y");
        assert_eq!(e.cond_equation.as_deref(), Some("( PORTSEL == 1'b1 ) && DEVICE_EN"));
        assert!(SdfFile::parse_str(&wrap_cell("(DELAY (ABSOLUTE (PORTA (1))))")).is_err());
    }

    #[test]
    fn condelse_marks_cond_without_equation() {
        let sdf = parse(&wrap_cell("(DELAY (ABSOLUTE (CONDELSE (IOPATH A Y (1)))))"));
        let e = only_entry(&sdf);
        assert!(e.is_cond);
        assert_eq!(e.cond_equation, None);
    }

    #[test]
    fn edges_and_retain() {
        let sdf = parse(&wrap_cell(
            "(DELAY (ABSOLUTE (IOPATH (posedge CLK) Q[9] (RETAIN (0.5)) (1) (2))))",
        ));
        let e = only_entry(&sdf);
        assert_eq!(e.name, "iopath_CLK_Q[9]");
        assert_eq!(e.from_pin_edge, Some(EdgeType::Posedge));
        assert_eq!(e.to_pin_edge, None);
        assert!(e.delay_paths.as_ref().unwrap().fast.is_some());
    }

    #[test]
    fn timing_checks() {
        let sdf = parse(&wrap_cell(
            r#"(TIMINGCHECK
                (SETUP D (posedge CLK) (1:2:3))
                (HOLD D (COND EN == 1 (posedge CLK)) (0.5))
                (SETUPHOLD D (negedge CLK) (1) (2))
                (RECOVERY RN (posedge CLK) (3))
                (REMOVAL RN (posedge CLK) (4))
                (WIDTH (COND ENABLE (posedge CLK)) (5)))"#,
        ));
        let entries = &sdf.cells["C"]["i0"];
        let setup = &entries["setup_CLK_D"];
        assert!(setup.is_timing_check);
        assert_eq!(setup.from_pin.as_deref(), Some("CLK"));
        assert_eq!(setup.to_pin.as_deref(), Some("D"));
        assert_eq!(setup.from_pin_edge, Some(EdgeType::Posedge));
        assert_eq!(setup.delay_paths.as_ref().unwrap().nominal, Some(Values::triple(1.0, 2.0, 3.0)));
        assert!(!setup.is_cond);

        let hold = &entries["hold_CLK_D"];
        assert!(hold.is_cond);
        assert_eq!(hold.cond_equation.as_deref(), Some("EN == 1"));

        let sh = entries["setuphold_CLK_D"].delay_paths.clone().unwrap();
        assert_eq!(sh.setup, Some(Values::bare(1.0)));
        assert_eq!(sh.hold, Some(Values::bare(2.0)));
        assert_eq!(sh.nominal, None);

        assert_eq!(entries["recovery_CLK_RN"].kind, EntryKind::Recovery);
        assert_eq!(entries["removal_CLK_RN"].kind, EntryKind::Removal);

        let width = &entries["width_CLK_CLK"];
        assert_eq!(width.from_pin, width.to_pin);
        assert_eq!(width.cond_equation.as_deref(), Some("ENABLE"));
    }

    #[test]
    fn check_condition_from_reference_port_only() {
        let sdf = parse(&wrap_cell("(TIMINGCHECK (SETUP (COND SCAN D) (posedge CLK) (1)))"));
        let e = only_entry(&sdf);
        assert_eq!(e.name, "setup_CLK_D");
        assert!(!e.is_cond);
        assert_eq!(e.cond_equation, None);
    }

    #[test]
    fn path_constraint() {
        let sdf = parse(&wrap_cell("(TIMINGENV (PATHCONSTRAINT Y A (1:2:3) (4:5:6)))"));
        let e = only_entry(&sdf);
        assert_eq!(e.name, "pathconstraint_A_Y");
        assert!(e.is_timing_env);
        let dp = e.delay_paths.as_ref().unwrap();
        assert_eq!(dp.rise, Some(Values::triple(1.0, 2.0, 3.0)));
        assert_eq!(dp.fall, Some(Values::triple(4.0, 5.0, 6.0)));
    }

    #[test]
    fn header_fields() {
        let sdf = parse(
            r#"(DELAYFILE
                (SDFVERSION "3.0")
                (DESIGN "spm")
                (DATE "Wed Oct 13 19:52:19 2021")
                (VENDOR "Parallax")
                (PROGRAM "STA")
                (VERSION "2.3.0")
                (DIVIDER .)
                (VOLTAGE 1.95::1.95)
                (PROCESS "1.000::1.000")
                (TEMPERATURE 25)
                (TIMESCALE 1.0 ns))"#,
        );
        let h = &sdf.header;
        assert_eq!(h.sdfversion.as_deref(), Some("3.0"));
        assert_eq!(h.date.as_deref(), Some("Wed Oct 13 19:52:19 2021"));
        assert_eq!(h.divider(), ".");
        assert_eq!(h.voltage.as_deref(), Some("1.95::1.95"));
        assert_eq!(h.process.as_deref(), Some("1.000::1.000"));
        assert_eq!(h.temperature.as_deref(), Some(":25:"));
        assert_eq!(h.timescale.as_deref(), Some("1ns"));
        assert!(sdf.cells.is_empty());
    }

    #[test]
    fn timescale_unit_is_lowercased() {
        let sdf = parse("(DELAYFILE (TIMESCALE 10 NS))");
        assert_eq!(sdf.header.timescale.as_deref(), Some("10ns"));
        assert_eq!(sdf.timescale_fs().unwrap(), 10_000_000);
    }

    #[test]
    fn empty_and_wildcard_instances() {
        let sdf = parse(
            r#"(DELAYFILE (CELL (CELLTYPE "top") (INSTANCE))
                          (CELL (CELLTYPE "BUF") (INSTANCE *)))"#,
        );
        assert!(sdf.cells["top"][""].is_empty());
        assert!(sdf.cells["BUF"].contains_key("*"));
    }

    #[test]
    fn malformed_input_reports_position() {
        let err = SdfFile::parse_str("(DELAYFILE\n  (CELL (CELLTYPE BUF)))").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(format!("{err}").starts_with("SDF parsing failed at 2:"));
        assert!(SdfFile::parse_str("THIS IS NOT VALID SDF").is_err());
    }

    #[test]
    fn transformers_do_not_share_state() {
        let a = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH A Y (1))))"));
        let b = parse(&wrap_cell("(DELAY (ABSOLUTE (IOPATH B Y (1))))"));
        assert_eq!(a.num_entries(), 1);
        assert_eq!(b.num_entries(), 1);
        assert!(b.cells["C"]["i0"].contains_key("iopath_B_Y"));
    }
}
