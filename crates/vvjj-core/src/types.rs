//! Flavor-topology categories shared by the histogram and selection crates.

use serde::{Deserialize, Serialize};

/// Parton origin of a single jet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JetTopo {
    /// Quark-initiated jet (PDG ID 1..=6).
    Quark,
    /// Gluon-initiated jet (PDG ID 21).
    Gluon,
}

impl JetTopo {
    /// All jet topologies, in export order.
    pub const ALL: [JetTopo; 2] = [JetTopo::Quark, JetTopo::Gluon];

    /// Classify a jet from its truth-matched PDG ID.
    ///
    /// IDs arrive as floating-point ntuple values; an integral value in
    /// `[1, 6]` is a quark, exactly `21` is a gluon, everything else
    /// (including fractional or non-finite values) is unclassified.
    pub fn from_pdgid(pdgid: f64) -> Option<Self> {
        if pdgid.fract() != 0.0 {
            None
        } else if (1.0..=6.0).contains(&pdgid) {
            Some(JetTopo::Quark)
        } else if pdgid == 21.0 {
            Some(JetTopo::Gluon)
        } else {
            None
        }
    }

    /// Histogram name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            JetTopo::Quark => "q",
            JetTopo::Gluon => "g",
        }
    }
}

/// Flavor topology of the two leading jets of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFlavorTopo {
    /// Both jets quark-initiated.
    QuarkQuark,
    /// One quark and one gluon jet, in either order.
    QuarkGluon,
    /// Both jets gluon-initiated.
    GluonGluon,
}

impl EventFlavorTopo {
    /// All event topologies, in export order.
    pub const ALL: [EventFlavorTopo; 3] =
        [EventFlavorTopo::QuarkQuark, EventFlavorTopo::QuarkGluon, EventFlavorTopo::GluonGluon];

    /// Combine the labels of the first and second jet.
    pub fn from_jets(first: JetTopo, second: JetTopo) -> Self {
        match (first, second) {
            (JetTopo::Quark, JetTopo::Quark) => EventFlavorTopo::QuarkQuark,
            (JetTopo::Quark, JetTopo::Gluon) | (JetTopo::Gluon, JetTopo::Quark) => {
                EventFlavorTopo::QuarkGluon
            }
            (JetTopo::Gluon, JetTopo::Gluon) => EventFlavorTopo::GluonGluon,
        }
    }

    /// Histogram name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            EventFlavorTopo::QuarkQuark => "qq",
            EventFlavorTopo::QuarkGluon => "qg",
            EventFlavorTopo::GluonGluon => "gg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdgid_classification() {
        for id in 1..=6 {
            assert_eq!(JetTopo::from_pdgid(id as f64), Some(JetTopo::Quark));
        }
        assert_eq!(JetTopo::from_pdgid(21.0), Some(JetTopo::Gluon));
        assert_eq!(JetTopo::from_pdgid(0.0), None);
        assert_eq!(JetTopo::from_pdgid(7.0), None);
        assert_eq!(JetTopo::from_pdgid(25.0), None);
        assert_eq!(JetTopo::from_pdgid(-1.0), None);
    }

    #[test]
    fn non_integer_pdgid_is_unclassified() {
        assert_eq!(JetTopo::from_pdgid(2.5), None);
        assert_eq!(JetTopo::from_pdgid(20.999), None);
        assert_eq!(JetTopo::from_pdgid(f64::NAN), None);
        assert_eq!(JetTopo::from_pdgid(f64::INFINITY), None);
    }

    #[test]
    fn quark_gluon_is_order_independent() {
        assert_eq!(
            EventFlavorTopo::from_jets(JetTopo::Quark, JetTopo::Gluon),
            EventFlavorTopo::QuarkGluon
        );
        assert_eq!(
            EventFlavorTopo::from_jets(JetTopo::Gluon, JetTopo::Quark),
            EventFlavorTopo::QuarkGluon
        );
        assert_eq!(
            EventFlavorTopo::from_jets(JetTopo::Quark, JetTopo::Quark),
            EventFlavorTopo::QuarkQuark
        );
        assert_eq!(
            EventFlavorTopo::from_jets(JetTopo::Gluon, JetTopo::Gluon),
            EventFlavorTopo::GluonGluon
        );
    }

    #[test]
    fn suffixes() {
        let jet: Vec<_> = JetTopo::ALL.iter().map(|t| t.suffix()).collect();
        assert_eq!(jet, ["q", "g"]);
        let event: Vec<_> = EventFlavorTopo::ALL.iter().map(|t| t.suffix()).collect();
        assert_eq!(event, ["qq", "qg", "gg"]);
    }
}
