//! Weighted selection counters and the end-of-run report.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use vvjj_core::{EventFlavorTopo, JetTopo};

/// Running weight sums of one selection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightCounters {
    /// Every processed event.
    pub total: f64,
    /// Events passing the baseline selection.
    pub baseline: f64,
    /// Quark-quark events.
    pub qq: f64,
    /// Quark-gluon events.
    pub qg: f64,
    /// Gluon-gluon events.
    pub gg: f64,
    /// Quark-gluon events with a quark-initiated leading jet.
    pub qg_first_jet_quark: f64,
    /// Quark-gluon events with a gluon-initiated leading jet.
    pub qg_first_jet_gluon: f64,
    /// Baseline events dropped because a jet is neither quark nor gluon.
    pub non_quark_gluon: f64,
}

impl WeightCounters {
    /// Book an accepted event under its topology.
    pub fn record_topology(
        &mut self,
        event_topo: EventFlavorTopo,
        first_jet: JetTopo,
        weight: f64,
    ) {
        match event_topo {
            EventFlavorTopo::QuarkQuark => self.qq += weight,
            EventFlavorTopo::GluonGluon => self.gg += weight,
            EventFlavorTopo::QuarkGluon => {
                self.qg += weight;
                match first_jet {
                    JetTopo::Quark => self.qg_first_jet_quark += weight,
                    JetTopo::Gluon => self.qg_first_jet_gluon += weight,
                }
            }
        }
    }

    /// Fractions relative to the report's denominators.
    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            total: self.total,
            baseline: Fraction::of(self.baseline, self.total),
            qq: Fraction::of(self.qq, self.baseline),
            qg: Fraction::of(self.qg, self.baseline),
            gg: Fraction::of(self.gg, self.baseline),
            non_quark_gluon: Fraction::of(self.non_quark_gluon, self.baseline),
            qg_first_jet_quark: Fraction::of(self.qg_first_jet_quark, self.qg),
            qg_first_jet_gluon: Fraction::of(self.qg_first_jet_gluon, self.qg),
        }
    }
}

impl AddAssign for WeightCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.baseline += rhs.baseline;
        self.qq += rhs.qq;
        self.qg += rhs.qg;
        self.gg += rhs.gg;
        self.qg_first_jet_quark += rhs.qg_first_jet_quark;
        self.qg_first_jet_gluon += rhs.qg_first_jet_gluon;
        self.non_quark_gluon += rhs.non_quark_gluon;
    }
}

/// A weight and its percentage of a denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fraction {
    /// Numerator weight.
    pub weight: f64,
    /// `100 * weight / denominator`; `None` when the denominator is zero.
    pub percent: Option<f64>,
}

impl Fraction {
    /// `weight` as a share of `denominator`.
    pub fn of(weight: f64, denominator: f64) -> Self {
        let percent = if denominator == 0.0 { None } else { Some(100.0 * weight / denominator) };
        Self { weight, percent }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent {
            Some(p) => write!(f, "{:.4} ({:.4}%)", self.weight, p),
            None => write!(f, "{:.4} (n/a)", self.weight),
        }
    }
}

/// End-of-run report. `Display` renders the multi-line text form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    /// Total processed weight.
    pub total: f64,
    /// Baseline share of the total.
    pub baseline: Fraction,
    /// Quark-quark share of the baseline.
    pub qq: Fraction,
    /// Quark-gluon share of the baseline.
    pub qg: Fraction,
    /// Gluon-gluon share of the baseline.
    pub gg: Fraction,
    /// Non-quark/gluon rejections as a share of the baseline.
    pub non_quark_gluon: Fraction,
    /// Quark-led share of the quark-gluon weight.
    pub qg_first_jet_quark: Fraction,
    /// Gluon-led share of the quark-gluon weight.
    pub qg_first_jet_gluon: Fraction,
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TOTAL EVENT WEIGHT PROCESSED: {:.4}", self.total)?;
        writeln!(f, "WEIGHT OF EVENTS PASSING BASELINE CUTS: {}", self.baseline)?;
        writeln!(f, "WEIGHT OF BASELINE QUARK-QUARK EVENTS: {}", self.qq)?;
        writeln!(f, "WEIGHT OF BASELINE QUARK-GLUON EVENTS: {}", self.qg)?;
        writeln!(f, "WEIGHT OF BASELINE GLUON-GLUON EVENTS: {}", self.gg)?;
        writeln!(f, "WEIGHT OF NON-QUARK-GLUON REJECTED EVENTS: {}", self.non_quark_gluon)?;
        writeln!(f, "IN BASELINE QUARK-GLUON EVENTS:")?;
        writeln!(
            f,
            "    WEIGHT OF QUARK-INITIATED LEADING JET EVENTS: {}",
            self.qg_first_jet_quark
        )?;
        write!(f, "    WEIGHT OF GLUON-INITIATED LEADING JET EVENTS: {}", self.qg_first_jet_gluon)
    }
}
