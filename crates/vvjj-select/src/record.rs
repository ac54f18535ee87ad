//! One event row, as consumed by the selection pipeline.
//!
//! Momenta and masses are in MeV. Boolean branches arrive as numbers and are
//! decoded with "non-zero is true".

use serde::{Deserialize, Serialize};

/// Prefix of the leading-pT jet's columns.
pub const FIRST_JET_PREFIX: &str = "first_jet";
/// Prefix of the subleading-pT jet's columns.
pub const SECOND_JET_PREFIX: &str = "second_jet";

/// Per-jet column suffixes, in [`JetRecord`] field order.
pub const JET_FIELDS: [&str; 10] = [
    "pt",
    "eta",
    "phi",
    "m",
    "D2",
    "passedWSubstructure",
    "passedZSubstructure",
    "passedWMassCut",
    "passedZMassCut",
    "pdgid",
];

/// Event-level columns, in [`EventRecord`] field order.
pub const EVENT_FIELDS: [&str; 9] = [
    "weight",
    "pileup_weight",
    "dijet_mass_massordered",
    "dyjj",
    "ptasym",
    "jet1_m",
    "jet2_m",
    "jet1_ungrtrk500",
    "jet2_ungrtrk500",
];

/// Every column an event table must provide, event fields first, then the
/// first and second jet's fields.
pub fn required_columns() -> Vec<String> {
    let mut cols: Vec<String> = EVENT_FIELDS.iter().map(|s| s.to_string()).collect();
    for prefix in [FIRST_JET_PREFIX, SECOND_JET_PREFIX] {
        cols.extend(JET_FIELDS.iter().map(|f| jet_column(prefix, f)));
    }
    cols
}

pub(crate) fn jet_column(prefix: &str, field: &str) -> String {
    format!("{prefix}_{field}")
}

/// Kinematics, substructure flags and truth label of one large-R jet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JetRecord {
    /// Transverse momentum (MeV).
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
    /// Mass (MeV).
    pub m: f64,
    /// Energy-correlation ratio D2.
    pub d2: f64,
    /// D2 cut of the W tagger.
    pub passed_w_substructure: bool,
    /// D2 cut of the Z tagger.
    pub passed_z_substructure: bool,
    /// Mass window of the W tagger.
    pub passed_w_mass_cut: bool,
    /// Mass window of the Z tagger.
    pub passed_z_mass_cut: bool,
    /// Truth-matched parton PDG ID.
    pub pdgid: f64,
}

/// One row of the event table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EventRecord {
    /// Generator event weight.
    pub weight: f64,
    /// Pileup reweighting factor.
    pub pileup_weight: f64,
    /// Invariant mass of the two leading jets (MeV).
    pub dijet_mass: f64,
    /// Rapidity separation of the two leading jets.
    pub dyjj: f64,
    /// pT asymmetry of the two leading jets.
    pub ptasym: f64,
    /// Leading-pT jet.
    pub first_jet: JetRecord,
    /// Subleading-pT jet.
    pub second_jet: JetRecord,
    /// Mass of the jet behind `jet1_ungrtrk500` (MeV).
    pub jet1_m: f64,
    /// Mass of the jet behind `jet2_ungrtrk500` (MeV).
    pub jet2_m: f64,
    /// Ungroomed track multiplicity (pT > 500 MeV) of jet 1.
    pub jet1_ungrtrk500: f64,
    /// Ungroomed track multiplicity (pT > 500 MeV) of jet 2.
    pub jet2_ungrtrk500: f64,
}

impl EventRecord {
    /// `weight * pileup_weight`, carried by every counter and fill.
    pub fn full_weight(&self) -> f64 {
        self.weight * self.pileup_weight
    }
}
