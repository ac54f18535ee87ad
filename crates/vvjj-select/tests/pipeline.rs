//! End-to-end selection runs over small event tables.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use vvjj_core::{EventFlavorTopo, JetTopo};
use vvjj_hist::{Category, MemorySink, read_histograms_json};
use vvjj_select::{
    EVENT_TAGS, EventColumns, EventRecord, FlavorSelector, JET_TAGS, JetRecord, JetVariable,
    Outcome, Rejection, read_input_list,
};

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir()
        .join(format!("vvjj_pipeline_{}_{nanos}_{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn jet(pt: f64, m: f64, pdgid: f64) -> JetRecord {
    JetRecord { pt, m, pdgid, eta: 0.5, phi: 1.0, d2: 1.0, ..Default::default() }
}

fn event(first: JetRecord, second: JetRecord) -> EventRecord {
    EventRecord {
        weight: 1.0,
        pileup_weight: 1.0,
        dijet_mass: 1_200_000.0,
        dyjj: 0.5,
        ptasym: 0.1,
        first_jet: first,
        second_jet: second,
        jet1_m: first.m,
        jet2_m: second.m,
        jet1_ungrtrk500: 10.0,
        jet2_ungrtrk500: 10.0,
    }
}

#[test]
fn reference_event_populates_full_ww_tag() {
    // Leading jet: quark, W mass + D2; subleading: gluon, W mass + D2.
    let mut first = jet(500_000.0, 80_000.0, 1.0);
    first.passed_w_mass_cut = true;
    first.passed_w_substructure = true;
    let mut second = jet(400_000.0, 60_000.0, 21.0);
    second.passed_w_mass_cut = true;
    second.passed_w_substructure = true;
    let ev = event(first, second);

    let mut sel = FlavorSelector::new().unwrap();
    assert_eq!(sel.process(&ev), Outcome::Accepted(EventFlavorTopo::QuarkGluon));

    let mut sink = MemorySink::new();
    let summary = sel.finish(&mut sink).unwrap();

    let pt = sink.get("first_jet_pt_WW_full_qg").unwrap();
    assert_relative_eq!(pt.bin_content[5], 1.0);

    let filled_once = [
        "first_jet_pt_WW_full_qg",
        "first_jet_m_WW_full_qg",
        "second_jet_pt_WW_full_qg",
        "second_jet_m_WW_full_qg",
        "dijet_mass_WW_full_qg",
        "first_jet_pt_W_full_q",
        "first_jet_m_W_full_q",
        "second_jet_pt_W_full_g",
        "second_jet_m_W_full_g",
    ];
    for name in filled_once {
        let d = sink.get(name).unwrap_or_else(|| panic!("{name} not exported"));
        assert_eq!(d.entries, 1, "{name}");
        assert_relative_eq!(d.sum_weights(), 1.0);
    }
    assert!(sink.get("dijet_mass_q").is_none());
    assert!(sink.get("first_jet_eta_WW_full_qg").is_none());

    assert_relative_eq!(summary.total, 1.0);
    assert_relative_eq!(summary.qg.weight, 1.0);
    assert_relative_eq!(summary.qg_first_jet_quark.percent.unwrap(), 100.0);
    assert_relative_eq!(summary.qg_first_jet_gluon.percent.unwrap(), 0.0);
}

#[test]
fn untagged_export_counts() {
    let ev = event(jet(500_000.0, 80_000.0, 2.0), jet(400_000.0, 60_000.0, 3.0));
    let mut sel = FlavorSelector::new().unwrap();
    sel.process(&ev);

    let mut sink = MemorySink::new();
    sel.finish(&mut sink).unwrap();
    // No tag passes except partial_ntrk: 12 jet sets x 3 + dijet x 2 untagged,
    // partial_ntrk: (pt, m) x 2 jets x (event + jet) + dijet event.
    let untagged = 12 * 3 + 2;
    let tagged = 2 * 2 * 2 + 1;
    assert_eq!(sink.len(), untagged + tagged);
    assert!(sink.get("first_jet_ntrk_qq").is_some());
    assert!(sink.get("first_jet_pt_partial_ntrk_q").is_some());
    assert!(sink.get("dijet_mass_partial_ntrk_qq").is_some());
}

#[test]
fn track_count_reassignment_by_mass() {
    let mut ev = event(jet(500_000.0, 60_000.0, 1.0), jet(400_000.0, 90_000.0, 1.0));
    ev.jet1_m = 80_000.0;
    ev.jet2_m = 50_000.0;
    ev.jet1_ungrtrk500 = 10.0;
    ev.jet2_ungrtrk500 = 40.0;

    let mut sel = FlavorSelector::new().unwrap();
    sel.process(&ev);
    let h = sel.histograms();
    let first = h.first_jet.get(JetVariable::Ntrk).get(Category::Inclusive, None).unwrap();
    let second = h.second_jet.get(JetVariable::Ntrk).get(Category::Inclusive, None).unwrap();
    assert_relative_eq!(first.bin_content[5], 1.0);
    assert_relative_eq!(second.bin_content[20], 1.0);

    // Only the first jet passes the track cut.
    let pt = h.first_jet.get(JetVariable::Pt);
    assert!(pt.get(Category::Jet(JetTopo::Quark), Some("partial_ntrk")).is_some());
    let pt2 = h.second_jet.get(JetVariable::Pt);
    assert!(pt2.get(Category::Jet(JetTopo::Quark), Some("partial_ntrk")).is_none());
    let qq = Category::Event(EventFlavorTopo::QuarkQuark);
    assert!(h.dijet_mass.get(qq, Some("partial_ntrk")).is_none());
}

#[test]
fn rejections_and_weights() {
    let good = event(jet(500_000.0, 80_000.0, 21.0), jet(400_000.0, 60_000.0, 21.0));
    let mut boundary = good;
    boundary.first_jet.pt = 450_000.0;
    let mut higgs = good;
    higgs.first_jet.pdgid = 25.0;
    higgs.weight = 3.0;
    higgs.pileup_weight = 0.5;

    let mut sel = FlavorSelector::new().unwrap();
    assert_eq!(sel.process(&boundary), Outcome::Rejected(Rejection::Baseline));
    assert_eq!(sel.process(&higgs), Outcome::Rejected(Rejection::NonQuarkGluon));
    assert_eq!(sel.process(&good), Outcome::Accepted(EventFlavorTopo::GluonGluon));

    let c = sel.counters();
    assert_relative_eq!(c.total, 3.5);
    assert_relative_eq!(c.baseline, 2.5);
    assert_relative_eq!(c.non_quark_gluon, 1.5);
    assert_relative_eq!(c.gg, 1.0);
    let s = c.summary();
    assert_relative_eq!(s.non_quark_gluon.percent.unwrap(), 60.0);
}

#[test]
fn file_order_merge_matches_single_run() {
    let a = event(jet(500_000.0, 80_000.0, 1.0), jet(400_000.0, 60_000.0, 21.0));
    let mut b = event(jet(700_000.0, 95_000.0, 21.0), jet(650_000.0, 91_000.0, 21.0));
    b.weight = -0.25;

    let mut single = FlavorSelector::new().unwrap();
    single.process(&a);
    single.process(&b);

    let mut part_a = FlavorSelector::new().unwrap();
    part_a.process(&a);
    let mut part_b = FlavorSelector::new().unwrap();
    part_b.process(&b);
    part_a.merge(&part_b).unwrap();

    let mut s1 = MemorySink::new();
    let mut s2 = MemorySink::new();
    assert_eq!(single.finish(&mut s1).unwrap(), part_a.finish(&mut s2).unwrap());
    assert_eq!(s1.into_inner(), s2.into_inner());
}

#[test]
fn json_table_through_input_list() {
    let dir = tmp_dir("list");
    let qq = event(jet(500_000.0, 80_000.0, 1.0), jet(400_000.0, 60_000.0, 1.0));
    let table = EventColumns::from_records(&[qq]);
    table.write_json(&dir.join("one.json")).unwrap();
    std::fs::write(dir.join("inputs.txt"), "one.json pythia\n").unwrap();

    let groups = read_input_list(&dir.join("inputs.txt")).unwrap();
    assert_eq!(groups.len(), 1);
    groups[0].check_files().unwrap();

    let mut sel = FlavorSelector::new().unwrap();
    for file in &groups[0].files {
        let events = EventColumns::open(file).unwrap();
        sel.process_columns(&events, &groups[0].label).unwrap();
    }
    let out = dir.join("pythia.json");
    let mut sink = vvjj_hist::JsonSink::create(&out);
    sel.finish(&mut sink).unwrap();
    let written = sink.finish().unwrap();

    let back = read_histograms_json(&out).unwrap();
    assert_eq!(back.len(), written);
    assert_eq!(back[0].name, "first_jet_pt");
    assert_eq!(back.last().unwrap().name, "dijet_mass_partial_ntrk_qq");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn tag_tables_are_exported() {
    assert_eq!(JET_TAGS.len(), 13);
    assert_eq!(EVENT_TAGS.len(), 19);
    let json = serde_json::to_value(EVENT_TAGS[7]).unwrap();
    assert_eq!(json["name"], "WZ_partial_mass");
    assert_eq!(json["first_jet"], "Z_partial_mass");
    assert_eq!(json["second_jet"], "W_partial_mass");
}
