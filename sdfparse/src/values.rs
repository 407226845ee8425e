//! Delay value triples and the named bundles built from them.
//!
//! Every arithmetic operation here works per slot: a slot of the result
//! holds a number only if the matching slot of every operand does. An
//! unset slot never turns into zero.

use crate::SdfError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// Tolerance used by [`Values::approx_eq`] and [`DelayPaths::approx_eq`]
/// when the caller has no better figure.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// A `min:avg:max` triple with each position optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Values {
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
}

/// Selects one position of a [`Values`] triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Min,
    Avg,
    Max,
}

/// Selects one named triple of a [`DelayPaths`] bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayField {
    Nominal,
    Fast,
    Slow,
    Setup,
    Hold,
    Rise,
    Fall,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Min, Metric::Avg, Metric::Max];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Min => "min",
            Metric::Avg => "avg",
            Metric::Max => "max",
        }
    }
}

impl DelayField {
    pub const ALL: [DelayField; 7] = [
        DelayField::Nominal,
        DelayField::Fast,
        DelayField::Slow,
        DelayField::Setup,
        DelayField::Hold,
        DelayField::Rise,
        DelayField::Fall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DelayField::Nominal => "nominal",
            DelayField::Fast => "fast",
            DelayField::Slow => "slow",
            DelayField::Setup => "setup",
            DelayField::Hold => "hold",
            DelayField::Rise => "rise",
            DelayField::Fall => "fall",
        }
    }
}

impl FromStr for Metric {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| SdfError::InvalidName { kind: "metric", name: s.to_string() })
    }
}

impl FromStr for DelayField {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DelayField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| SdfError::InvalidName { kind: "field", name: s.to_string() })
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for DelayField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[inline]
fn zip_slot(a: Option<f64>, b: Option<f64>, op: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(op(a, b)),
        _ => None,
    }
}

impl Values {
    pub const fn new(min: Option<f64>, avg: Option<f64>, max: Option<f64>) -> Self {
        Values { min, avg, max }
    }

    /// All three positions set.
    pub const fn triple(min: f64, avg: f64, max: f64) -> Self {
        Values { min: Some(min), avg: Some(avg), max: Some(max) }
    }

    /// A bare value with no colons: only `avg` is populated.
    pub const fn bare(avg: f64) -> Self {
        Values { min: None, avg: Some(avg), max: None }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Min => self.min,
            Metric::Avg => self.avg,
            Metric::Max => self.max,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.avg.is_none() && self.max.is_none()
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Values {
            min: self.min.map(&f),
            avg: self.avg.map(&f),
            max: self.max.map(&f),
        }
    }

    fn zip(self, rhs: Self, op: impl Fn(f64, f64) -> f64 + Copy) -> Self {
        Values {
            min: zip_slot(self.min, rhs.min, op),
            avg: zip_slot(self.avg, rhs.avg, op),
            max: zip_slot(self.max, rhs.max, op),
        }
    }

    /// Slot-wise comparison within `tolerance`. Two unset slots match,
    /// an unset slot never matches a set one.
    pub fn approx_eq(&self, other: &Values, tolerance: f64) -> bool {
        Metric::ALL.into_iter().all(|m| match (self.get(m), other.get(m)) {
            (None, None) => true,
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            _ => false,
        })
    }
}

impl Add for Values {
    type Output = Values;

    fn add(self, rhs: Values) -> Values {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Values {
    type Output = Values;

    fn sub(self, rhs: Values) -> Values {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Neg for Values {
    type Output = Values;

    fn neg(self) -> Values {
        self.map(|v| -v)
    }
}

impl Mul<f64> for Values {
    type Output = Values;

    fn mul(self, rhs: f64) -> Values {
        self.map(|v| v * rhs)
    }
}

impl Mul<Values> for f64 {
    type Output = Values;

    fn mul(self, rhs: Values) -> Values {
        rhs * self
    }
}

/// Up to seven named delay triples attached to one entry.
///
/// Which fields are meaningful depends on the entry kind: propagation
/// delays use `nominal`/`fast`/`slow`, `SETUPHOLD` uses `setup`/`hold`,
/// `PATHCONSTRAINT` uses `rise`/`fall`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rise: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fall: Option<Values>,
}

impl DelayPaths {
    pub fn nominal(values: Values) -> Self {
        DelayPaths { nominal: Some(values), ..Default::default() }
    }

    pub fn get(&self, field: DelayField) -> Option<&Values> {
        match field {
            DelayField::Nominal => self.nominal.as_ref(),
            DelayField::Fast => self.fast.as_ref(),
            DelayField::Slow => self.slow.as_ref(),
            DelayField::Setup => self.setup.as_ref(),
            DelayField::Hold => self.hold.as_ref(),
            DelayField::Rise => self.rise.as_ref(),
            DelayField::Fall => self.fall.as_ref(),
        }
    }

    pub fn get_mut(&mut self, field: DelayField) -> &mut Option<Values> {
        match field {
            DelayField::Nominal => &mut self.nominal,
            DelayField::Fast => &mut self.fast,
            DelayField::Slow => &mut self.slow,
            DelayField::Setup => &mut self.setup,
            DelayField::Hold => &mut self.hold,
            DelayField::Rise => &mut self.rise,
            DelayField::Fall => &mut self.fall,
        }
    }

    pub fn with(mut self, field: DelayField, values: Values) -> Self {
        *self.get_mut(field) = Some(values);
        self
    }

    /// The set fields, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (DelayField, &Values)> + '_ {
        DelayField::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// One number out of the bundle, `None` when the field or the
    /// metric is unset.
    pub fn scalar(&self, field: DelayField, metric: Metric) -> Option<f64> {
        self.get(field)?.get(metric)
    }

    /// Like [`DelayPaths::scalar`] but with names, failing on any name
    /// outside the fixed field and metric sets.
    pub fn get_scalar(&self, field: &str, metric: &str) -> Result<Option<f64>, SdfError> {
        let field: DelayField = field.parse()?;
        let metric: Metric = metric.parse()?;
        Ok(self.scalar(field, metric))
    }

    pub fn map(&self, f: impl Fn(f64) -> f64 + Copy) -> Self {
        let mut out = DelayPaths::default();
        for (field, values) in self.iter() {
            *out.get_mut(field) = Some(values.map(f));
        }
        out
    }

    fn zip(&self, rhs: &DelayPaths, op: impl Fn(Values, Values) -> Values) -> Self {
        let mut out = DelayPaths::default();
        for field in DelayField::ALL {
            if let (Some(a), Some(b)) = (self.get(field), rhs.get(field)) {
                *out.get_mut(field) = Some(op(*a, *b));
            }
        }
        out
    }

    /// Field-wise comparison; a field set on one side only is a mismatch.
    pub fn approx_eq(&self, other: &DelayPaths, tolerance: f64) -> bool {
        DelayField::ALL.into_iter().all(|f| match (self.get(f), other.get(f)) {
            (None, None) => true,
            (Some(a), Some(b)) => a.approx_eq(b, tolerance),
            _ => false,
        })
    }
}

impl Add for &DelayPaths {
    type Output = DelayPaths;

    fn add(self, rhs: &DelayPaths) -> DelayPaths {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for &DelayPaths {
    type Output = DelayPaths;

    fn sub(self, rhs: &DelayPaths) -> DelayPaths {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Add for DelayPaths {
    type Output = DelayPaths;

    fn add(self, rhs: DelayPaths) -> DelayPaths {
        &self + &rhs
    }
}

impl Sub for DelayPaths {
    type Output = DelayPaths;

    fn sub(self, rhs: DelayPaths) -> DelayPaths {
        &self - &rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: Option<f64> = None;

    #[test]
    fn add_absorbs_unset_per_slot() {
        let a = Values::new(Some(1.0), NONE, Some(3.0));
        let b = Values::new(Some(4.0), Some(5.0), NONE);
        assert_eq!(a + b, Values::new(Some(5.0), NONE, NONE));
        assert_eq!(Values::default() + Values::default(), Values::default());
    }

    #[test]
    fn sub_neg_and_scale() {
        assert_eq!(
            Values::triple(5.0, 7.0, 9.0) - Values::triple(4.0, 5.0, 6.0),
            Values::triple(1.0, 2.0, 3.0)
        );
        assert_eq!(-Values::new(Some(1.0), NONE, Some(3.0)), Values::new(Some(-1.0), NONE, Some(-3.0)));
        assert_eq!(Values::triple(1.0, 2.0, 3.0) * 2.0, Values::triple(2.0, 4.0, 6.0));
        assert_eq!(2.0 * Values::new(Some(1.0), NONE, Some(3.0)), Values::new(Some(2.0), NONE, Some(6.0)));
    }

    #[test]
    fn approx_eq_rules() {
        let a = Values::triple(1.0, 2.0, 3.0);
        assert!(a.approx_eq(&Values::triple(1.0 + 1e-10, 2.0, 3.0), DEFAULT_TOLERANCE));
        assert!(!a.approx_eq(&Values::triple(1.1, 2.0, 3.0), DEFAULT_TOLERANCE));
        assert!(Values::default().approx_eq(&Values::default(), DEFAULT_TOLERANCE));
        assert!(!Values::new(Some(1.0), NONE, Some(3.0)).approx_eq(&a, DEFAULT_TOLERANCE));
        assert!(a.approx_eq(&Values::triple(1.05, 2.0, 3.0), 0.1));
        assert!(!a.approx_eq(&Values::triple(1.05, 2.0, 3.0), 0.01));
    }

    #[test]
    fn add_then_sub_restores() {
        let a = Values::new(Some(1.5), NONE, Some(3.9));
        let b = Values::triple(4.1, 5.3, 6.8);
        let back = a + b - b;
        assert!(back.approx_eq(&a, DEFAULT_TOLERANCE));
        assert_eq!(back.avg, None);
    }

    #[test]
    fn delay_paths_add_drops_one_sided_fields() {
        let a = DelayPaths::nominal(Values::triple(1.0, 2.0, 3.0)).with(DelayField::Fast, Values::triple(0.5, 1.0, 1.5));
        let b = DelayPaths::nominal(Values::triple(4.0, 5.0, 6.0)).with(DelayField::Slow, Values::triple(2.0, 3.0, 4.0));
        let sum = &a + &b;
        assert_eq!(sum.nominal, Some(Values::triple(5.0, 7.0, 9.0)));
        assert_eq!(sum.fast, None);
        assert_eq!(sum.slow, None);
        assert!((sum - b).approx_eq(&DelayPaths::nominal(Values::triple(1.0, 2.0, 3.0)), DEFAULT_TOLERANCE));
    }

    #[test]
    fn get_scalar_by_name() {
        let dp = DelayPaths::default().with(DelayField::Slow, Values::new(Some(1.0), NONE, Some(3.0)));
        assert_eq!(dp.get_scalar("slow", "max").unwrap(), Some(3.0));
        assert_eq!(dp.get_scalar("slow", "avg").unwrap(), None);
        assert_eq!(dp.get_scalar("fast", "max").unwrap(), None);
        assert!(matches!(
            dp.get_scalar("typical", "max"),
            Err(SdfError::InvalidName { kind: "field", .. })
        ));
        assert!(matches!(
            dp.get_scalar("slow", "median"),
            Err(SdfError::InvalidName { kind: "metric", .. })
        ));
    }

    #[test]
    fn delay_paths_approx_eq_one_sided_field() {
        let a = DelayPaths::nominal(Values::triple(1.0, 2.0, 3.0)).with(DelayField::Fast, Values::triple(0.5, 1.0, 1.5));
        let b = DelayPaths::nominal(Values::triple(1.0, 2.0, 3.0));
        assert!(a.approx_eq(&a.clone(), DEFAULT_TOLERANCE));
        assert!(!a.approx_eq(&b, DEFAULT_TOLERANCE));
    }

    #[test]
    fn serialized_shape_keeps_only_set_fields() {
        let dp = DelayPaths::default().with(DelayField::Setup, Values::bare(1.0));
        let json = serde_json::to_value(&dp).unwrap();
        assert_eq!(json, serde_json::json!({"setup": {"min": null, "avg": 1.0, "max": null}}));
        let back: DelayPaths = serde_json::from_value(json).unwrap();
        assert_eq!(back, dp);
    }
}
