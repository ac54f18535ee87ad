//! # vvjj-select
//!
//! Event selection for the all-hadronic diboson (VV → JJ) flavor study.
//!
//! Each event is weighted by `weight * pileup_weight`, passed through a fixed
//! baseline selection, labelled by the quark/gluon origin of its two leading
//! jets, tagged with W/Z substructure, mass-window and track-count
//! conditions, and fanned out into thirteen [`vvjj_hist::TopoHistogramSet`]s.
//!
//! ```no_run
//! use vvjj_hist::JsonSink;
//! use vvjj_select::{EventColumns, FlavorSelector};
//!
//! let events = EventColumns::open("pythia.parquet".as_ref()).unwrap();
//! let mut selector = FlavorSelector::new().unwrap();
//! selector.process_columns(&events, "pythia").unwrap();
//!
//! let mut sink = JsonSink::create("out/pythia.json");
//! let summary = selector.finish(&mut sink).unwrap();
//! sink.finish().unwrap();
//! println!("{summary}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod efficiency;
pub mod grouping;
pub mod record;
pub mod selection;
pub mod selector;
pub mod source;
pub mod summary;
pub mod tags;
pub mod variables;

pub use efficiency::{tag_efficiencies, variable_names};
pub use grouping::{InputGroup, parse_input_list, read_input_list};
pub use record::{EventRecord, JetRecord};
pub use selector::{FlavorSelector, Outcome, Rejection};
pub use source::EventColumns;
pub use summary::{Fraction, SelectionSummary, WeightCounters};
pub use tags::{EVENT_TAGS, EventTagDef, Hypothesis, JET_TAGS, JetCuts, JetTagDef, TagMap};
pub use variables::{JetHistograms, JetValues, JetVariable, SelectorHistograms};
