//! Per-event pipeline: weight, baseline, flavor classification, tags, fills.

use vvjj_core::{EventFlavorTopo, JetTopo, Result};
use vvjj_hist::{FlowPolicy, HistogramSink};

use crate::record::EventRecord;
use crate::selection::{MEV_PER_GEV, mass_ordered_track_counts, passes_baseline, passes_ntrk};
use crate::source::EventColumns;
use crate::summary::{SelectionSummary, WeightCounters};
use crate::tags::{JetCuts, TagMap};
use crate::variables::{JetValues, SelectorHistograms};

/// Why an event did not reach the histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Failed a baseline cut.
    Baseline,
    /// Passed the baseline but a leading jet is neither quark nor gluon.
    NonQuarkGluon,
}

/// Terminal state of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not histogrammed.
    Rejected(Rejection),
    /// Histogrammed under this topology.
    Accepted(EventFlavorTopo),
}

/// Accumulates histograms and weight counters over a stream of events.
#[derive(Debug, Clone)]
pub struct FlavorSelector {
    histograms: SelectorHistograms,
    counters: WeightCounters,
    n_events: u64,
}

impl FlavorSelector {
    /// Selector whose histograms drop out-of-range fills into the flow bins.
    pub fn new() -> Result<Self> {
        Self::with_flow_policy(FlowPolicy::Drop)
    }

    /// Selector with an explicit under/overflow policy.
    pub fn with_flow_policy(flow_policy: FlowPolicy) -> Result<Self> {
        Ok(Self {
            histograms: SelectorHistograms::new(flow_policy)?,
            counters: WeightCounters::default(),
            n_events: 0,
        })
    }

    /// Run one event through the pipeline.
    pub fn process(&mut self, ev: &EventRecord) -> Outcome {
        self.n_events += 1;
        let weight = ev.full_weight();
        self.counters.total += weight;

        if !passes_baseline(ev) {
            return Outcome::Rejected(Rejection::Baseline);
        }
        self.counters.baseline += weight;

        let (first_ntrk, second_ntrk) = mass_ordered_track_counts(ev);

        let (Some(first_topo), Some(second_topo)) =
            (JetTopo::from_pdgid(ev.first_jet.pdgid), JetTopo::from_pdgid(ev.second_jet.pdgid))
        else {
            self.counters.non_quark_gluon += weight;
            return Outcome::Rejected(Rejection::NonQuarkGluon);
        };
        let event_topo = EventFlavorTopo::from_jets(first_topo, second_topo);
        self.counters.record_topology(event_topo, first_topo, weight);

        let first_tags =
            TagMap::for_jet(&JetCuts::from_jet(&ev.first_jet, passes_ntrk(first_ntrk)));
        let second_tags =
            TagMap::for_jet(&JetCuts::from_jet(&ev.second_jet, passes_ntrk(second_ntrk)));
        let event_tags = TagMap::for_event(&first_tags, &second_tags);

        let first = JetValues::new(&ev.first_jet, first_ntrk);
        let second = JetValues::new(&ev.second_jet, second_ntrk);
        let dijet_mass = ev.dijet_mass / MEV_PER_GEV;

        let h = &mut self.histograms;
        h.dijet_mass.fill_inclusive(dijet_mass, weight);
        h.dijet_mass.fill_event_topo(event_topo, dijet_mass, weight);
        h.first_jet.fill(&first, first_topo, event_topo, weight);
        h.second_jet.fill(&second, second_topo, event_topo, weight);

        for (tag, pass) in event_tags.iter() {
            h.dijet_mass.fill_event_topo_tagged(event_topo, tag, pass, dijet_mass, weight);
            h.first_jet.fill_event_tagged(&first, event_topo, tag, pass, weight);
            h.second_jet.fill_event_tagged(&second, event_topo, tag, pass, weight);
        }
        for (tag, pass) in first_tags.iter() {
            h.first_jet.fill_jet_tagged(&first, first_topo, tag, pass, weight);
        }
        for (tag, pass) in second_tags.iter() {
            h.second_jet.fill_jet_tagged(&second, second_topo, tag, pass, weight);
        }

        Outcome::Accepted(event_topo)
    }

    /// Process every row of a validated table, logging progress in 10% steps.
    pub fn process_columns(&mut self, events: &EventColumns, label: &str) -> Result<()> {
        let records = events.records()?;
        let n = records.len();
        let step = (n / 10).max(1);
        tracing::info!(source = label, events = n, "processing");
        for (i, ev) in records.enumerate() {
            self.process(&ev);
            let done = i + 1;
            if done % step == 0 && done < n {
                tracing::info!(source = label, "{}% ({done}/{n})", done * 100 / n);
            }
        }
        tracing::info!(source = label, events = n, "done");
        Ok(())
    }

    /// Fold another selector's histograms and counters into this one.
    pub fn merge(&mut self, other: &FlavorSelector) -> Result<()> {
        self.histograms.merge(&other.histograms)?;
        self.counters += other.counters;
        self.n_events += other.n_events;
        Ok(())
    }

    /// Export all histograms to `sink` and return the run summary.
    pub fn finish<S: HistogramSink + ?Sized>(&self, sink: &mut S) -> Result<SelectionSummary> {
        let n = self.histograms.export_all(sink)?;
        tracing::debug!(histograms = n, events = self.n_events, "selector finished");
        Ok(self.counters.summary())
    }

    /// Histograms filled so far.
    pub fn histograms(&self) -> &SelectorHistograms {
        &self.histograms
    }

    /// Weight counters so far.
    pub fn counters(&self) -> &WeightCounters {
        &self.counters
    }

    /// Number of events seen, accepted or not.
    pub fn n_events(&self) -> u64 {
        self.n_events
    }
}
