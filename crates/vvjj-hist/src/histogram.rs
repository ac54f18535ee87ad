//! Fixed-width weighted histogram with Sumw2 tracking.

use serde::{Deserialize, Serialize};

use vvjj_core::{Error, Result};

/// Under/overflow handling policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPolicy {
    /// Keep entries outside the histogram range out of the bins; they are
    /// recorded in `underflow` / `overflow` only.
    #[default]
    Drop,
    /// Fold underflow into the first bin and overflow into the last bin.
    Fold,
}

/// Where a value lands in a [`Binning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSlot {
    /// Below `x_min`.
    Underflow,
    /// In-range bin index.
    Bin(usize),
    /// At or above `x_max`, or NaN.
    Overflow,
}

/// Equal-width binning over `[x_min, x_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Binning {
    /// Lower edge of first bin.
    pub x_min: f64,
    /// Upper edge of last bin.
    pub x_max: f64,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
}

impl Binning {
    /// Binning with an explicit bin count.
    pub fn new(x_min: f64, x_max: f64, n_bins: usize) -> Result<Self> {
        if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
            return Err(Error::Validation(format!(
                "invalid histogram range [{x_min}, {x_max})"
            )));
        }
        if n_bins == 0 {
            return Err(Error::Validation("histogram needs at least one bin".into()));
        }
        Ok(Self { x_min, x_max, n_bins })
    }

    /// Binning from a nominal bin spacing: `floor((x_max - x_min) / bin_spacing)` bins
    /// stretched to cover the full range.
    ///
    /// The floor carries a 1e-9 relative tolerance so that decimal spacings such as
    /// `0.2` over a width of `5.0` give 25 bins, not 24.
    pub fn from_spacing(x_min: f64, x_max: f64, bin_spacing: f64) -> Result<Self> {
        if !bin_spacing.is_finite() || bin_spacing <= 0.0 {
            return Err(Error::Validation(format!("invalid bin spacing {bin_spacing}")));
        }
        let ratio = (x_max - x_min) / bin_spacing;
        let n_bins = if ratio.is_finite() && ratio >= 1.0 - 1e-9 {
            (ratio * (1.0 + 1e-9)).floor() as usize
        } else {
            0
        };
        if n_bins == 0 {
            return Err(Error::Validation(format!(
                "bin spacing {bin_spacing} yields no bins over [{x_min}, {x_max})"
            )));
        }
        Self::new(x_min, x_max, n_bins)
    }

    /// Width of one bin.
    #[inline]
    pub fn width(&self) -> f64 {
        (self.x_max - self.x_min) / self.n_bins as f64
    }

    /// Bin edges (length = n_bins + 1).
    pub fn edges(&self) -> Vec<f64> {
        let w = self.width();
        let mut edges: Vec<f64> = (0..self.n_bins).map(|i| self.x_min + i as f64 * w).collect();
        edges.push(self.x_max);
        edges
    }

    /// Locate `value`.
    #[inline]
    pub fn find_bin(&self, value: f64) -> BinSlot {
        if value.is_nan() || value >= self.x_max {
            return BinSlot::Overflow;
        }
        if value < self.x_min {
            return BinSlot::Underflow;
        }
        let idx = ((value - self.x_min) / self.width()) as usize;
        BinSlot::Bin(idx.min(self.n_bins - 1))
    }
}

/// A named weighted histogram.
///
/// Every bin carries both the sum of weights and the sum of squared weights
/// from the first fill on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Histogram name.
    pub name: String,
    /// Binning shared with the rest of the owning family.
    #[serde(flatten)]
    pub binning: Binning,
    /// Under/overflow policy.
    pub flow_policy: FlowPolicy,
    /// Bin contents (sum of weights per bin).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Underflow sum of weights (before optional folding).
    pub underflow: f64,
    /// Overflow sum of weights (before optional folding).
    pub overflow: f64,
    /// Underflow sum of weights squared (before optional folding).
    pub underflow_sumw2: f64,
    /// Overflow sum of weights squared (before optional folding).
    pub overflow_sumw2: f64,
    /// Number of fill calls.
    pub entries: u64,
}

impl Distribution {
    /// Empty histogram.
    pub fn new(name: impl Into<String>, binning: Binning, flow_policy: FlowPolicy) -> Self {
        Self {
            name: name.into(),
            binning,
            flow_policy,
            bin_content: vec![0.0; binning.n_bins],
            sumw2: vec![0.0; binning.n_bins],
            underflow: 0.0,
            overflow: 0.0,
            underflow_sumw2: 0.0,
            overflow_sumw2: 0.0,
            entries: 0,
        }
    }

    /// Add `weight` at `value`.
    pub fn fill(&mut self, value: f64, weight: f64) {
        let w2 = weight * weight;
        self.entries += 1;

        match self.binning.find_bin(value) {
            BinSlot::Bin(b) => {
                self.bin_content[b] += weight;
                self.sumw2[b] += w2;
            }
            BinSlot::Underflow => {
                self.underflow += weight;
                self.underflow_sumw2 += w2;
                if self.flow_policy == FlowPolicy::Fold {
                    self.bin_content[0] += weight;
                    self.sumw2[0] += w2;
                }
            }
            BinSlot::Overflow => {
                self.overflow += weight;
                self.overflow_sumw2 += w2;
                if self.flow_policy == FlowPolicy::Fold {
                    let last = self.binning.n_bins - 1;
                    self.bin_content[last] += weight;
                    self.sumw2[last] += w2;
                }
            }
        }
    }

    /// Add another histogram bin by bin. Binning and flow policy must match.
    pub fn merge(&mut self, other: &Distribution) -> Result<()> {
        if self.binning != other.binning || self.flow_policy != other.flow_policy {
            return Err(Error::Validation(format!(
                "cannot merge '{}' into '{}': binning or flow policy differs",
                other.name, self.name
            )));
        }
        for (a, b) in self.bin_content.iter_mut().zip(&other.bin_content) {
            *a += b;
        }
        for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.underflow_sumw2 += other.underflow_sumw2;
        self.overflow_sumw2 += other.overflow_sumw2;
        self.entries += other.entries;
        Ok(())
    }

    /// Total weight delivered to this histogram, including under/overflow.
    pub fn sum_weights(&self) -> f64 {
        let in_bins: f64 = self.bin_content.iter().sum();
        match self.flow_policy {
            FlowPolicy::Drop => in_bins + self.underflow + self.overflow,
            FlowPolicy::Fold => in_bins,
        }
    }

    /// Total squared weight delivered to this histogram, including under/overflow.
    pub fn sum_weights_squared(&self) -> f64 {
        let in_bins: f64 = self.sumw2.iter().sum();
        match self.flow_policy {
            FlowPolicy::Drop => in_bins + self.underflow_sumw2 + self.overflow_sumw2,
            FlowPolicy::Fold => in_bins,
        }
    }

    /// Per-bin statistical uncertainty, `sqrt(sumw2)`.
    pub fn bin_errors(&self) -> Vec<f64> {
        self.sumw2.iter().map(|w2| w2.sqrt()).collect()
    }

    /// Bin edges (length = n_bins + 1).
    pub fn bin_edges(&self) -> Vec<f64> {
        self.binning.edges()
    }
}
