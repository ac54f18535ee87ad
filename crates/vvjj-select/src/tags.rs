//! W/Z tag tables.
//!
//! Tags are ordered `(name, formula)` tables rather than struct fields, so the
//! selector can iterate them and name histograms directly from them. Jet tags
//! combine a boson hypothesis with any subset of {mass window, D2, track
//! count}; event tags AND one jet tag of the first jet with one of the second.

use serde::Serialize;

use crate::record::JetRecord;

/// Boson hypothesis of a tagger working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hypothesis {
    /// W boson tagger.
    W,
    /// Z boson tagger.
    Z,
}

/// Substructure and mass-window decisions of one tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BosonCuts {
    /// D2 cut.
    pub substructure: bool,
    /// Mass window.
    pub mass: bool,
}

/// All per-jet decisions a jet tag can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JetCuts {
    /// Ungroomed track count below threshold.
    pub ntrk: bool,
    /// W tagger decisions.
    pub w: BosonCuts,
    /// Z tagger decisions.
    pub z: BosonCuts,
}

impl JetCuts {
    /// Gather the decisions of `jet` with an already evaluated track cut.
    pub fn from_jet(jet: &JetRecord, passed_ntrk: bool) -> Self {
        Self {
            ntrk: passed_ntrk,
            w: BosonCuts { substructure: jet.passed_w_substructure, mass: jet.passed_w_mass_cut },
            z: BosonCuts { substructure: jet.passed_z_substructure, mass: jet.passed_z_mass_cut },
        }
    }

    fn boson(&self, hypothesis: Hypothesis) -> BosonCuts {
        match hypothesis {
            Hypothesis::W => self.w,
            Hypothesis::Z => self.z,
        }
    }
}

/// One jet tag: which cuts of which tagger it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JetTagDef {
    /// Tag name, used verbatim in histogram names.
    pub name: &'static str,
    /// Tagger the mass/D2 requirements refer to; `None` for track-only tags.
    pub hypothesis: Option<Hypothesis>,
    /// Requires the mass window.
    pub mass: bool,
    /// Requires the D2 cut.
    pub substructure: bool,
    /// Requires the track-count cut.
    pub ntrk: bool,
}

impl JetTagDef {
    /// Evaluate the tag on one jet.
    pub fn eval(&self, cuts: &JetCuts) -> bool {
        let boson = self.hypothesis.map(|h| cuts.boson(h)).unwrap_or_default();
        (!self.mass || boson.mass)
            && (!self.substructure || boson.substructure)
            && (!self.ntrk || cuts.ntrk)
    }
}

const fn jet_tag(
    name: &'static str,
    hypothesis: Option<Hypothesis>,
    mass: bool,
    substructure: bool,
    ntrk: bool,
) -> JetTagDef {
    JetTagDef { name, hypothesis, mass, substructure, ntrk }
}

const W: Option<Hypothesis> = Some(Hypothesis::W);
const Z: Option<Hypothesis> = Some(Hypothesis::Z);

/// Jet tags, in evaluation order.
pub const JET_TAGS: [JetTagDef; 13] = [
    jet_tag("partial_ntrk", None, false, false, true),
    jet_tag("W_partial_mass", W, true, false, false),
    jet_tag("W_partial_D2", W, false, true, false),
    jet_tag("W_partial_massD2", W, true, true, false),
    jet_tag("W_partial_massNtrk", W, true, false, true),
    jet_tag("W_partial_ntrkD2", W, false, true, true),
    jet_tag("W_full", W, true, true, true),
    jet_tag("Z_partial_mass", Z, true, false, false),
    jet_tag("Z_partial_D2", Z, false, true, false),
    jet_tag("Z_partial_massD2", Z, true, true, false),
    jet_tag("Z_partial_massNtrk", Z, true, false, true),
    jet_tag("Z_partial_ntrkD2", Z, false, true, true),
    jet_tag("Z_full", Z, true, true, true),
];

/// One event tag: the AND of a first-jet tag and a second-jet tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventTagDef {
    /// Tag name, used verbatim in histogram names.
    pub name: &'static str,
    /// Jet tag required of the first jet.
    pub first_jet: &'static str,
    /// Jet tag required of the second jet.
    pub second_jet: &'static str,
}

const fn event_tag(
    name: &'static str,
    first_jet: &'static str,
    second_jet: &'static str,
) -> EventTagDef {
    EventTagDef { name, first_jet, second_jet }
}

/// Event tags, in evaluation order. The WZ pairing takes the Z tag of the
/// first jet and the W tag of the second; there is no ZW pairing.
pub const EVENT_TAGS: [EventTagDef; 19] = [
    event_tag("partial_ntrk", "partial_ntrk", "partial_ntrk"),
    event_tag("WW_partial_mass", "W_partial_mass", "W_partial_mass"),
    event_tag("WW_partial_D2", "W_partial_D2", "W_partial_D2"),
    event_tag("WW_partial_massD2", "W_partial_massD2", "W_partial_massD2"),
    event_tag("WW_partial_massNtrk", "W_partial_massNtrk", "W_partial_massNtrk"),
    event_tag("WW_partial_ntrkD2", "W_partial_ntrkD2", "W_partial_ntrkD2"),
    event_tag("WW_full", "W_full", "W_full"),
    event_tag("WZ_partial_mass", "Z_partial_mass", "W_partial_mass"),
    event_tag("WZ_partial_D2", "Z_partial_D2", "W_partial_D2"),
    event_tag("WZ_partial_massD2", "Z_partial_massD2", "W_partial_massD2"),
    event_tag("WZ_partial_massNtrk", "Z_partial_massNtrk", "W_partial_massNtrk"),
    event_tag("WZ_partial_ntrkD2", "Z_partial_ntrkD2", "W_partial_ntrkD2"),
    event_tag("WZ_full", "Z_full", "W_full"),
    event_tag("ZZ_partial_mass", "Z_partial_mass", "Z_partial_mass"),
    event_tag("ZZ_partial_D2", "Z_partial_D2", "Z_partial_D2"),
    event_tag("ZZ_partial_massD2", "Z_partial_massD2", "Z_partial_massD2"),
    event_tag("ZZ_partial_massNtrk", "Z_partial_massNtrk", "Z_partial_massNtrk"),
    event_tag("ZZ_partial_ntrkD2", "Z_partial_ntrkD2", "Z_partial_ntrkD2"),
    event_tag("ZZ_full", "Z_full", "Z_full"),
];

/// Ordered tag name → decision map, rebuilt for every accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagMap {
    entries: Vec<(&'static str, bool)>,
}

impl TagMap {
    /// Evaluate every entry of [`JET_TAGS`] on one jet.
    pub fn for_jet(cuts: &JetCuts) -> Self {
        Self { entries: JET_TAGS.iter().map(|t| (t.name, t.eval(cuts))).collect() }
    }

    /// Evaluate every entry of [`EVENT_TAGS`] from the two jets' maps.
    pub fn for_event(first: &TagMap, second: &TagMap) -> Self {
        let entries = EVENT_TAGS
            .iter()
            .map(|t| {
                let pass = first.get(t.first_jet).unwrap_or(false)
                    && second.get(t.second_jet).unwrap_or(false);
                (t.name, pass)
            })
            .collect();
        Self { entries }
    }

    /// Decision of `name`, if the map has it.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.entries.iter().find(|(n, _)| *n == name).map(|&(_, v)| v)
    }

    /// `(name, decision)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuts(ntrk: bool, w: (bool, bool), z: (bool, bool)) -> JetCuts {
        JetCuts {
            ntrk,
            w: BosonCuts { mass: w.0, substructure: w.1 },
            z: BosonCuts { mass: z.0, substructure: z.1 },
        }
    }

    #[test]
    fn table_sizes_and_order() {
        assert_eq!(JET_TAGS.len(), 13);
        assert_eq!(EVENT_TAGS.len(), 19);
        assert_eq!(JET_TAGS[0].name, "partial_ntrk");
        assert_eq!(JET_TAGS[6].name, "W_full");
        assert_eq!(JET_TAGS[12].name, "Z_full");
        assert_eq!(EVENT_TAGS[18].name, "ZZ_full");
    }

    #[test]
    fn event_tags_reference_known_jet_tags() {
        for t in &EVENT_TAGS {
            assert!(JET_TAGS.iter().any(|j| j.name == t.first_jet), "{}", t.first_jet);
            assert!(JET_TAGS.iter().any(|j| j.name == t.second_jet), "{}", t.second_jet);
        }
        let mut names: Vec<_> = EVENT_TAGS.iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 19);
        assert!(!names.iter().any(|n| n.starts_with("ZW")));
    }

    #[test]
    fn jet_tag_formulas() {
        // W mass + D2, Z nothing, track cut passed.
        let map = TagMap::for_jet(&cuts(true, (true, true), (false, false)));
        assert_eq!(map.len(), 13);
        assert_eq!(map.get("partial_ntrk"), Some(true));
        assert_eq!(map.get("W_partial_mass"), Some(true));
        assert_eq!(map.get("W_partial_massD2"), Some(true));
        assert_eq!(map.get("W_partial_ntrkD2"), Some(true));
        assert_eq!(map.get("W_full"), Some(true));
        assert_eq!(map.get("Z_partial_mass"), Some(false));
        assert_eq!(map.get("Z_full"), Some(false));

        // Z mass only, track cut failed.
        let map = TagMap::for_jet(&cuts(false, (false, false), (true, false)));
        assert_eq!(map.get("partial_ntrk"), Some(false));
        assert_eq!(map.get("Z_partial_mass"), Some(true));
        assert_eq!(map.get("Z_partial_D2"), Some(false));
        assert_eq!(map.get("Z_partial_massNtrk"), Some(false));
        assert_eq!(map.get("nonexistent"), None);
    }

    #[test]
    fn wz_pairs_first_z_with_second_w() {
        let z_jet = TagMap::for_jet(&cuts(true, (false, false), (true, true)));
        let w_jet = TagMap::for_jet(&cuts(true, (true, true), (false, false)));

        let ev = TagMap::for_event(&z_jet, &w_jet);
        assert_eq!(ev.len(), 19);
        assert_eq!(ev.get("WZ_full"), Some(true));
        assert_eq!(ev.get("WW_full"), Some(false));
        assert_eq!(ev.get("ZZ_full"), Some(false));
        assert_eq!(ev.get("partial_ntrk"), Some(true));

        let swapped = TagMap::for_event(&w_jet, &z_jet);
        assert_eq!(swapped.get("WZ_full"), Some(false));
    }

    #[test]
    fn iteration_follows_table_order() {
        let map = TagMap::for_jet(&JetCuts::default());
        let names: Vec<_> = map.iter().map(|(n, _)| n).collect();
        let expected: Vec<_> = JET_TAGS.iter().map(|t| t.name).collect();
        assert_eq!(names, expected);
        assert!(map.iter().all(|(_, v)| !v));
    }
}
