//! Histogram family for one physical variable, sliced by flavor topology and tag.

use std::collections::BTreeMap;

use vvjj_core::{Error, EventFlavorTopo, JetTopo, Result};

use crate::histogram::{Binning, Distribution, FlowPolicy};
use crate::sink::HistogramSink;

/// Population a distribution is restricted to.
///
/// The derived ordering (inclusive, quark, gluon, qq, qg, gg) is the export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// All accepted events.
    Inclusive,
    /// Events where the filled jet has the given topology.
    Jet(JetTopo),
    /// Events with the given flavor topology.
    Event(EventFlavorTopo),
}

impl Category {
    /// All categories, in export order.
    pub const ALL: [Category; 6] = [
        Category::Inclusive,
        Category::Jet(JetTopo::Quark),
        Category::Jet(JetTopo::Gluon),
        Category::Event(EventFlavorTopo::QuarkQuark),
        Category::Event(EventFlavorTopo::QuarkGluon),
        Category::Event(EventFlavorTopo::GluonGluon),
    ];

    /// Name suffix, `None` for the inclusive category.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Category::Inclusive => None,
            Category::Jet(t) => Some(t.suffix()),
            Category::Event(t) => Some(t.suffix()),
        }
    }

    /// `<var>[_<tag>][_<suffix>]`
    pub fn histogram_name(self, var_name: &str, tag: Option<&str>) -> String {
        let mut name = String::from(var_name);
        if let Some(tag) = tag {
            name.push('_');
            name.push_str(tag);
        }
        if let Some(suffix) = self.suffix() {
            name.push('_');
            name.push_str(suffix);
        }
        name
    }
}

impl From<JetTopo> for Category {
    fn from(t: JetTopo) -> Self {
        Category::Jet(t)
    }
}

impl From<EventFlavorTopo> for Category {
    fn from(t: EventFlavorTopo) -> Self {
        Category::Event(t)
    }
}

/// Lazily-populated family of distributions for one variable.
///
/// Holds at most one untagged distribution per [`Category`] and an open-ended
/// tag-name → distribution map per category. A distribution is created by the
/// first fill addressing its `(category, tag)` key and reused by every later
/// fill; all of them share this set's binning.
#[derive(Debug, Clone)]
pub struct TopoHistogramSet {
    var_name: String,
    x_min: f64,
    x_max: f64,
    bin_spacing: f64,
    binning: Binning,
    flow_policy: FlowPolicy,
    untagged: BTreeMap<Category, Distribution>,
    tagged: BTreeMap<Category, BTreeMap<String, Distribution>>,
}

impl TopoHistogramSet {
    /// New empty set with [`FlowPolicy::Drop`].
    pub fn new(
        var_name: impl Into<String>,
        x_min: f64,
        x_max: f64,
        bin_spacing: f64,
    ) -> Result<Self> {
        Self::with_flow_policy(var_name, x_min, x_max, bin_spacing, FlowPolicy::Drop)
    }

    /// New empty set with an explicit under/overflow policy.
    pub fn with_flow_policy(
        var_name: impl Into<String>,
        x_min: f64,
        x_max: f64,
        bin_spacing: f64,
        flow_policy: FlowPolicy,
    ) -> Result<Self> {
        let var_name = var_name.into();
        if var_name.is_empty() {
            return Err(Error::Validation("variable name must be non-empty".into()));
        }
        let binning = Binning::from_spacing(x_min, x_max, bin_spacing)?;
        Ok(Self {
            var_name,
            x_min,
            x_max,
            bin_spacing,
            binning,
            flow_policy,
            untagged: BTreeMap::new(),
            tagged: BTreeMap::new(),
        })
    }

    /// Variable name, the prefix of every distribution name.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    /// Lower edge.
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Upper edge.
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Nominal bin spacing given at construction.
    pub fn bin_spacing(&self) -> f64 {
        self.bin_spacing
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.binning.n_bins
    }

    /// Shared binning.
    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    /// Shared under/overflow policy.
    pub fn flow_policy(&self) -> FlowPolicy {
        self.flow_policy
    }

    /// Fill the inclusive distribution `<var>`.
    pub fn fill_inclusive(&mut self, value: f64, weight: f64) {
        self.fill_key(Category::Inclusive, None, value, weight);
    }

    /// Fill `<var>_<tag>` when `condition` holds.
    pub fn fill_inclusive_tagged(
        &mut self,
        tag_name: &str,
        condition: bool,
        value: f64,
        weight: f64,
    ) {
        if condition {
            self.fill_key(Category::Inclusive, Some(tag_name), value, weight);
        }
    }

    /// Fill `<var>_<qq|qg|gg>`.
    pub fn fill_event_topo(&mut self, event_topo: EventFlavorTopo, value: f64, weight: f64) {
        self.fill_key(Category::Event(event_topo), None, value, weight);
    }

    /// Fill `<var>_<tag>_<qq|qg|gg>` when `condition` holds.
    pub fn fill_event_topo_tagged(
        &mut self,
        event_topo: EventFlavorTopo,
        tag_name: &str,
        condition: bool,
        value: f64,
        weight: f64,
    ) {
        if condition {
            self.fill_key(Category::Event(event_topo), Some(tag_name), value, weight);
        }
    }

    /// Fill `<var>_<q|g>`.
    pub fn fill_jet_topo(&mut self, jet_topo: JetTopo, value: f64, weight: f64) {
        self.fill_key(Category::Jet(jet_topo), None, value, weight);
    }

    /// Fill `<var>_<tag>_<q|g>` when `condition` holds.
    pub fn fill_jet_topo_tagged(
        &mut self,
        jet_topo: JetTopo,
        tag_name: &str,
        condition: bool,
        value: f64,
        weight: f64,
    ) {
        if condition {
            self.fill_key(Category::Jet(jet_topo), Some(tag_name), value, weight);
        }
    }

    /// Get-or-create the distribution for `(category, tag)` and fill it.
    ///
    /// This is the only place distributions are created.
    pub fn fill_key(&mut self, category: Category, tag: Option<&str>, value: f64, weight: f64) {
        let binning = self.binning;
        let flow_policy = self.flow_policy;
        let var_name = &self.var_name;

        let Some(tag) = tag else {
            self.untagged
                .entry(category)
                .or_insert_with(|| {
                    let name = category.histogram_name(var_name, None);
                    tracing::trace!(histogram = %name, "creating distribution");
                    Distribution::new(name, binning, flow_policy)
                })
                .fill(value, weight);
            return;
        };

        let family = self.tagged.entry(category).or_default();
        if let Some(dist) = family.get_mut(tag) {
            dist.fill(value, weight);
            return;
        }
        let name = category.histogram_name(var_name, Some(tag));
        tracing::trace!(histogram = %name, "creating distribution");
        let mut dist = Distribution::new(name, binning, flow_policy);
        dist.fill(value, weight);
        family.insert(tag.to_owned(), dist);
    }

    /// The distribution for `(category, tag)`, if it was ever filled.
    pub fn get(&self, category: Category, tag: Option<&str>) -> Option<&Distribution> {
        match tag {
            None => self.untagged.get(&category),
            Some(tag) => self.tagged.get(&category).and_then(|family| family.get(tag)),
        }
    }

    /// All created distributions in export order: untagged by category, then
    /// tagged by category with tag names sorted.
    pub fn iter(&self) -> impl Iterator<Item = &Distribution> {
        self.untagged.values().chain(self.tagged.values().flat_map(|family| family.values()))
    }

    /// Number of created distributions.
    pub fn len(&self) -> usize {
        self.untagged.len() + self.tagged.values().map(BTreeMap::len).sum::<usize>()
    }

    /// `true` until the first fill.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand every created distribution to `sink`. Returns how many were written.
    pub fn export_all<S: HistogramSink + ?Sized>(&self, sink: &mut S) -> Result<usize> {
        let mut n = 0;
        for dist in self.iter() {
            sink.write(dist)?;
            n += 1;
        }
        tracing::debug!(variable = %self.var_name, histograms = n, "exported");
        Ok(n)
    }

    /// Add another set of the same variable and binning, key by key.
    pub fn merge(&mut self, other: &TopoHistogramSet) -> Result<()> {
        if self.var_name != other.var_name
            || self.binning != other.binning
            || self.flow_policy != other.flow_policy
        {
            return Err(Error::Validation(format!(
                "cannot merge histogram set '{}' into '{}': variable or binning differs",
                other.var_name, self.var_name
            )));
        }
        for (category, dist) in &other.untagged {
            match self.untagged.get_mut(category) {
                Some(mine) => mine.merge(dist)?,
                None => {
                    self.untagged.insert(*category, dist.clone());
                }
            }
        }
        for (category, other_family) in &other.tagged {
            let family = self.tagged.entry(*category).or_default();
            for (tag, dist) in other_family {
                match family.get_mut(tag) {
                    Some(mine) => mine.merge(dist)?,
                    None => {
                        family.insert(tag.clone(), dist.clone());
                    }
                }
            }
        }
        Ok(())
    }
}
