//! # vvjj-hist
//!
//! Weighted 1-D histograms with per-bin sum of squared weights, and the
//! [`TopoHistogramSet`] that lazily grows a family of them for one physical
//! variable: inclusive, per jet topology, per event topology, and per named
//! tag within each of those.
//!
//! ## Example
//!
//! ```
//! use vvjj_core::{EventFlavorTopo, JetTopo};
//! use vvjj_hist::{MemorySink, TopoHistogramSet};
//!
//! let mut h = TopoHistogramSet::new("first_jet_pt", 0.0, 4000.0, 100.0).unwrap();
//! h.fill_inclusive(612.0, 1.5);
//! h.fill_jet_topo(JetTopo::Quark, 612.0, 1.5);
//! h.fill_event_topo_tagged(EventFlavorTopo::QuarkGluon, "WW_full", true, 612.0, 1.5);
//!
//! let mut sink = MemorySink::new();
//! h.export_all(&mut sink).unwrap();
//! assert!(sink.get("first_jet_pt_WW_full_qg").is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod efficiency;
pub mod histogram;
pub mod parquet_io;
pub mod sink;
pub mod topo;

pub use efficiency::{EFFICIENCY_SCHEMA_V1, EfficiencyCurve};
pub use histogram::{BinSlot, Binning, Distribution, FlowPolicy};
pub use parquet_io::{ParquetSink, read_histograms_parquet};
pub use sink::{HistogramSink, JsonSink, MemorySink, read_histograms_json};
pub use topo::{Category, TopoHistogramSet};
