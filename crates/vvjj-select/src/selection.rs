//! Baseline kinematic selection and the mass-ordered track-count assignment.

use crate::record::EventRecord;

/// Conversion from the ntuple's MeV to the GeV used by cuts and histograms.
pub const MEV_PER_GEV: f64 = 1000.0;

/// Leading jet must have `pt > 450 GeV`.
pub const MIN_FIRST_JET_PT_GEV: f64 = 450.0;
/// Both jets must have `m > 50 GeV`.
pub const MIN_JET_MASS_GEV: f64 = 50.0;
/// Both jets must have `|eta| < 2.0`.
pub const MAX_ABS_ETA: f64 = 2.0;
/// Dijet system must have `m > 1000 GeV`.
pub const MIN_DIJET_MASS_GEV: f64 = 1000.0;
/// `|dyjj| < 1.2`.
pub const MAX_ABS_DYJJ: f64 = 1.2;
/// `|ptasym| < 0.15`.
pub const MAX_ABS_PTASYM: f64 = 0.15;
/// A jet passes the track cut when its ungroomed track count is below this.
pub const MAX_UNGROOMED_NTRK: f64 = 30.0;

/// `true` unless the event fails a baseline cut. Boundaries are rejected.
///
/// Cuts are written as rejection conditions, so a NaN input fails no cut.
pub fn passes_baseline(ev: &EventRecord) -> bool {
    let first = &ev.first_jet;
    let second = &ev.second_jet;
    let rejected = first.pt / MEV_PER_GEV <= MIN_FIRST_JET_PT_GEV
        || first.m / MEV_PER_GEV <= MIN_JET_MASS_GEV
        || second.m / MEV_PER_GEV <= MIN_JET_MASS_GEV
        || first.eta.abs() >= MAX_ABS_ETA
        || second.eta.abs() >= MAX_ABS_ETA
        || ev.dijet_mass / MEV_PER_GEV <= MIN_DIJET_MASS_GEV
        || ev.dyjj.abs() >= MAX_ABS_DYJJ
        || ev.ptasym.abs() >= MAX_ABS_PTASYM;
    !rejected
}

/// Ungroomed track counts for the (first, second) jet.
///
/// The `jet1_*` / `jet2_*` branches are ordered differently from the
/// pT-ordered first/second jets; the heavier of the two is matched to the
/// first jet, ties going to `jet1`.
pub fn mass_ordered_track_counts(ev: &EventRecord) -> (f64, f64) {
    if ev.jet1_m >= ev.jet2_m {
        (ev.jet1_ungrtrk500, ev.jet2_ungrtrk500)
    } else {
        (ev.jet2_ungrtrk500, ev.jet1_ungrtrk500)
    }
}

/// Track-count cut of a single jet.
pub fn passes_ntrk(ungroomed_ntrk: f64) -> bool {
    ungroomed_ntrk < MAX_UNGROOMED_NTRK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JetRecord;

    fn passing() -> EventRecord {
        EventRecord {
            weight: 1.0,
            pileup_weight: 1.0,
            dijet_mass: 1_200_000.0,
            dyjj: 0.5,
            ptasym: 0.1,
            first_jet: JetRecord { pt: 500_000.0, m: 80_000.0, eta: 1.0, ..Default::default() },
            second_jet: JetRecord { pt: 400_000.0, m: 60_000.0, eta: -1.0, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn baseline_accepts_reference_event() {
        assert!(passes_baseline(&passing()));
    }

    #[test]
    fn leading_pt_boundary_is_rejected() {
        let mut ev = passing();
        ev.first_jet.pt = 450_000.0;
        assert!(!passes_baseline(&ev));
        ev.first_jet.pt = 450_001.0;
        assert!(passes_baseline(&ev));
    }

    #[test]
    fn each_cut_rejects() {
        let cases: [fn(&mut EventRecord); 7] = [
            |e| e.first_jet.m = 50_000.0,
            |e| e.second_jet.m = 49_000.0,
            |e| e.first_jet.eta = 2.0,
            |e| e.second_jet.eta = -2.1,
            |e| e.dijet_mass = 1_000_000.0,
            |e| e.dyjj = -1.2,
            |e| e.ptasym = 0.15,
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut ev = passing();
            mutate(&mut ev);
            assert!(!passes_baseline(&ev), "case {i} should be rejected");
        }
    }

    #[test]
    fn nan_fails_no_cut() {
        let mut ev = passing();
        ev.ptasym = f64::NAN;
        assert!(passes_baseline(&ev));
    }

    #[test]
    fn track_counts_follow_mass() {
        let mut ev = passing();
        ev.jet1_m = 80_000.0;
        ev.jet2_m = 50_000.0;
        ev.jet1_ungrtrk500 = 10.0;
        ev.jet2_ungrtrk500 = 40.0;
        assert_eq!(mass_ordered_track_counts(&ev), (10.0, 40.0));

        ev.jet1_m = 50_000.0;
        ev.jet2_m = 80_000.0;
        assert_eq!(mass_ordered_track_counts(&ev), (40.0, 10.0));

        ev.jet2_m = 50_000.0;
        assert_eq!(mass_ordered_track_counts(&ev), (10.0, 40.0), "ties go to jet1");
    }

    #[test]
    fn ntrk_cut_is_strict() {
        assert!(passes_ntrk(29.0));
        assert!(!passes_ntrk(30.0));
    }
}
