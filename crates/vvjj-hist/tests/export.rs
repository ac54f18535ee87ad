//! Export ordering and sink round trips for a populated histogram set.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use vvjj_core::{EventFlavorTopo, JetTopo};
use vvjj_hist::{
    FlowPolicy, HistogramSink, JsonSink, MemorySink, ParquetSink, TopoHistogramSet,
    read_histograms_json, read_histograms_parquet,
};

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("vvjj_export_{}_{nanos}_{filename}", std::process::id()))
}

fn populated() -> TopoHistogramSet {
    let mut set =
        TopoHistogramSet::with_flow_policy("first_jet_m", 0.0, 400.0, 10.0, FlowPolicy::Drop)
            .unwrap();
    set.fill_event_topo_tagged(EventFlavorTopo::GluonGluon, "ZZ_full", true, 91.0, 0.5);
    set.fill_jet_topo_tagged(JetTopo::Gluon, "Z_full", true, 91.0, 0.5);
    set.fill_event_topo(EventFlavorTopo::GluonGluon, 91.0, 0.5);
    set.fill_inclusive_tagged("W_full", true, 80.0, 2.0);
    set.fill_inclusive_tagged("W_full", false, 80.0, 2.0);
    set.fill_jet_topo(JetTopo::Quark, 80.0, 2.0);
    set.fill_event_topo_tagged(EventFlavorTopo::QuarkQuark, "WW_full", true, 500.0, 1.0);
    set.fill_event_topo_tagged(EventFlavorTopo::QuarkQuark, "WW_partial_mass", true, 80.0, 1.0);
    set.fill_inclusive(80.0, 2.0);
    set
}

const EXPECTED_ORDER: [&str; 8] = [
    "first_jet_m",
    "first_jet_m_q",
    "first_jet_m_gg",
    "first_jet_m_W_full",
    "first_jet_m_Z_full_g",
    "first_jet_m_WW_full_qq",
    "first_jet_m_WW_partial_mass_qq",
    "first_jet_m_ZZ_full_gg",
];

#[test]
fn export_order_is_deterministic() {
    let set = populated();
    let mut names = Vec::new();
    struct Collect<'a>(&'a mut Vec<String>);
    impl HistogramSink for Collect<'_> {
        fn write(&mut self, dist: &vvjj_hist::Distribution) -> vvjj_core::Result<()> {
            self.0.push(dist.name.clone());
            Ok(())
        }
    }
    let n = set.export_all(&mut Collect(&mut names)).unwrap();
    assert_eq!(n, 8);
    assert_eq!(names, EXPECTED_ORDER);
}

#[test]
fn exporting_twice_into_one_sink_fails() {
    let set = populated();
    let mut sink = MemorySink::new();
    set.export_all(&mut sink).unwrap();
    assert!(set.export_all(&mut sink).is_err());
}

#[test]
fn json_and_parquet_agree() {
    let set = populated();

    let json_path = tmp_path("set.json");
    let mut json = JsonSink::create(&json_path);
    set.export_all(&mut json).unwrap();
    json.finish().unwrap();

    let pq_path = tmp_path("set.parquet");
    let mut pq = ParquetSink::create(&pq_path);
    set.export_all(&mut pq).unwrap();
    pq.finish().unwrap();

    let from_json = read_histograms_json(&json_path).unwrap();
    let from_pq = read_histograms_parquet(&pq_path).unwrap();
    assert_eq!(from_json, from_pq);
    let names: Vec<&str> = from_json.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, EXPECTED_ORDER);

    let ww = &from_json[5];
    assert_eq!(ww.entries, 1);
    assert_eq!(ww.sum_weights(), 1.0);
    assert_relative_eq!(ww.overflow, 1.0);
    assert!(ww.bin_content.iter().all(|&b| b == 0.0));

    let _ = std::fs::remove_file(&json_path);
    let _ = std::fs::remove_file(&pq_path);
}
