//! The thirteen histogrammed variables and their fixed binnings.

use vvjj_core::{EventFlavorTopo, JetTopo, Result};
use vvjj_hist::{FlowPolicy, HistogramSink, TopoHistogramSet};

use crate::record::{FIRST_JET_PREFIX, JetRecord, SECOND_JET_PREFIX};
use crate::selection::MEV_PER_GEV;

/// Name of the dijet invariant-mass set.
pub const DIJET_MASS: &str = "dijet_mass";
/// `(x_min, x_max, bin_spacing)` of the dijet mass in GeV.
pub const DIJET_MASS_BINNING: (f64, f64, f64) = (0.0, 8000.0, 100.0);

/// Per-jet histogrammed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetVariable {
    /// Transverse momentum (GeV).
    Pt,
    /// Pseudorapidity.
    Eta,
    /// Azimuth.
    Phi,
    /// Mass (GeV).
    M,
    /// D2.
    D2,
    /// Mass-ordered ungroomed track count.
    Ntrk,
}

impl JetVariable {
    /// Export order.
    pub const ALL: [JetVariable; 6] = [
        JetVariable::Pt,
        JetVariable::Eta,
        JetVariable::Phi,
        JetVariable::M,
        JetVariable::D2,
        JetVariable::Ntrk,
    ];

    /// Suffix after the jet prefix, e.g. `first_jet_D2`.
    pub fn suffix(self) -> &'static str {
        match self {
            JetVariable::Pt => "pt",
            JetVariable::Eta => "eta",
            JetVariable::Phi => "phi",
            JetVariable::M => "m",
            JetVariable::D2 => "D2",
            JetVariable::Ntrk => "ntrk",
        }
    }

    /// `(x_min, x_max, bin_spacing)`.
    pub fn binning(self) -> (f64, f64, f64) {
        match self {
            JetVariable::Pt => (0.0, 4000.0, 100.0),
            JetVariable::Eta => (-2.5, 2.5, 0.2),
            JetVariable::Phi => (-3.2, 3.2, 0.2),
            JetVariable::M => (0.0, 400.0, 10.0),
            JetVariable::D2 => (0.0, 5.0, 0.2),
            JetVariable::Ntrk => (0.0, 100.0, 2.0),
        }
    }
}

/// Histogram values of one jet, in GeV where applicable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetValues {
    /// pT in GeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
    /// Mass in GeV.
    pub m: f64,
    /// D2.
    pub d2: f64,
    /// Mass-ordered ungroomed track count.
    pub ntrk: f64,
}

impl JetValues {
    /// Convert a jet record, attaching its reassigned track count.
    pub fn new(jet: &JetRecord, ungroomed_ntrk: f64) -> Self {
        Self {
            pt: jet.pt / MEV_PER_GEV,
            eta: jet.eta,
            phi: jet.phi,
            m: jet.m / MEV_PER_GEV,
            d2: jet.d2,
            ntrk: ungroomed_ntrk,
        }
    }

    /// Value of one variable.
    pub fn get(&self, var: JetVariable) -> f64 {
        match var {
            JetVariable::Pt => self.pt,
            JetVariable::Eta => self.eta,
            JetVariable::Phi => self.phi,
            JetVariable::M => self.m,
            JetVariable::D2 => self.d2,
            JetVariable::Ntrk => self.ntrk,
        }
    }
}

/// Variables that also receive tagged fills.
const TAGGED_VARIABLES: [JetVariable; 2] = [JetVariable::Pt, JetVariable::M];

/// The six histogram sets of one jet.
#[derive(Debug, Clone)]
pub struct JetHistograms {
    sets: [TopoHistogramSet; 6],
}

impl JetHistograms {
    /// Sets named `<prefix>_<suffix>` for every [`JetVariable`].
    pub fn new(prefix: &str, flow_policy: FlowPolicy) -> Result<Self> {
        let make = |var: JetVariable| {
            let (x_min, x_max, spacing) = var.binning();
            TopoHistogramSet::with_flow_policy(
                format!("{prefix}_{}", var.suffix()),
                x_min,
                x_max,
                spacing,
                flow_policy,
            )
        };
        Ok(Self {
            sets: [
                make(JetVariable::Pt)?,
                make(JetVariable::Eta)?,
                make(JetVariable::Phi)?,
                make(JetVariable::M)?,
                make(JetVariable::D2)?,
                make(JetVariable::Ntrk)?,
            ],
        })
    }

    /// Set of one variable.
    pub fn get(&self, var: JetVariable) -> &TopoHistogramSet {
        &self.sets[var as usize]
    }

    fn get_mut(&mut self, var: JetVariable) -> &mut TopoHistogramSet {
        &mut self.sets[var as usize]
    }

    /// Sets in export order.
    pub fn iter(&self) -> impl Iterator<Item = &TopoHistogramSet> {
        self.sets.iter()
    }

    /// Inclusive, event-topology and jet-topology fills of every variable.
    pub fn fill(
        &mut self,
        values: &JetValues,
        jet_topo: JetTopo,
        event_topo: EventFlavorTopo,
        weight: f64,
    ) {
        for var in JetVariable::ALL {
            let value = values.get(var);
            let set = self.get_mut(var);
            set.fill_inclusive(value, weight);
            set.fill_event_topo(event_topo, value, weight);
            set.fill_jet_topo(jet_topo, value, weight);
        }
    }

    /// Event-topology fill of pt and m under an event tag.
    pub fn fill_event_tagged(
        &mut self,
        values: &JetValues,
        event_topo: EventFlavorTopo,
        tag: &str,
        condition: bool,
        weight: f64,
    ) {
        for var in TAGGED_VARIABLES {
            let value = values.get(var);
            self.get_mut(var).fill_event_topo_tagged(event_topo, tag, condition, value, weight);
        }
    }

    /// Jet-topology fill of pt and m under one of this jet's tags.
    pub fn fill_jet_tagged(
        &mut self,
        values: &JetValues,
        jet_topo: JetTopo,
        tag: &str,
        condition: bool,
        weight: f64,
    ) {
        for var in TAGGED_VARIABLES {
            let value = values.get(var);
            self.get_mut(var).fill_jet_topo_tagged(jet_topo, tag, condition, value, weight);
        }
    }

    /// Merge set by set.
    pub fn merge(&mut self, other: &JetHistograms) -> Result<()> {
        for (mine, theirs) in self.sets.iter_mut().zip(&other.sets) {
            mine.merge(theirs)?;
        }
        Ok(())
    }
}

/// All thirteen sets filled by the selector.
#[derive(Debug, Clone)]
pub struct SelectorHistograms {
    /// Leading-pT jet.
    pub first_jet: JetHistograms,
    /// Subleading-pT jet.
    pub second_jet: JetHistograms,
    /// Dijet invariant mass (GeV).
    pub dijet_mass: TopoHistogramSet,
}

impl SelectorHistograms {
    /// Empty sets with the fixed binnings.
    pub fn new(flow_policy: FlowPolicy) -> Result<Self> {
        let (x_min, x_max, spacing) = DIJET_MASS_BINNING;
        Ok(Self {
            first_jet: JetHistograms::new(FIRST_JET_PREFIX, flow_policy)?,
            second_jet: JetHistograms::new(SECOND_JET_PREFIX, flow_policy)?,
            dijet_mass: TopoHistogramSet::with_flow_policy(
                DIJET_MASS,
                x_min,
                x_max,
                spacing,
                flow_policy,
            )?,
        })
    }

    /// First-jet sets, second-jet sets, then dijet mass.
    pub fn iter(&self) -> impl Iterator<Item = &TopoHistogramSet> {
        self.first_jet.iter().chain(self.second_jet.iter()).chain(std::iter::once(&self.dijet_mass))
    }

    /// Export every set in [`SelectorHistograms::iter`] order.
    pub fn export_all<S: HistogramSink + ?Sized>(&self, sink: &mut S) -> Result<usize> {
        let mut n = 0;
        for set in self.iter() {
            n += set.export_all(sink)?;
        }
        Ok(n)
    }

    /// Total number of created distributions.
    pub fn num_distributions(&self) -> usize {
        self.iter().map(TopoHistogramSet::len).sum()
    }

    /// Merge all thirteen sets.
    pub fn merge(&mut self, other: &SelectorHistograms) -> Result<()> {
        self.first_jet.merge(&other.first_jet)?;
        self.second_jet.merge(&other.second_jet)?;
        self.dijet_mass.merge(&other.dijet_mass)
    }
}
