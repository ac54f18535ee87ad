//! Per-bin selection efficiencies between a tagged and an untagged histogram.
//!
//! Each bin gets `eff = pass / total` with a normal-approximation binomial
//! uncertainty that accounts for event weights:
//!
//! ```text
//! var = ((1 - 2 eff) * sumw2_pass + eff^2 * sumw2_total) / total^2
//! ```
//!
//! which reduces to `eff (1 - eff) / N` for unit weights. The one-sigma
//! interval is clipped to `[0, 1]`, so `err_lo`/`err_hi` may differ.

use serde::{Deserialize, Serialize};

use vvjj_core::{Error, Result};

use crate::histogram::Distribution;

/// Schema version string written at the top of JSON efficiency files.
pub const EFFICIENCY_SCHEMA_V1: &str = "vvjj_efficiency_v1";

/// Efficiency of one tag within one category, per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyCurve {
    /// Curve name, `<numerator>_efficiency`.
    pub name: String,
    /// Tagged (passing) histogram name.
    pub numerator: String,
    /// Untagged (total) histogram name.
    pub denominator: String,
    /// Bin edges shared by both histograms.
    pub bin_edges: Vec<f64>,
    /// `pass / total` per bin; zero where the total is not positive.
    pub efficiency: Vec<f64>,
    /// Distance from `efficiency` down to the lower interval bound.
    pub err_lo: Vec<f64>,
    /// Distance from `efficiency` up to the upper interval bound.
    pub err_hi: Vec<f64>,
    /// `false` for bins whose total weight is zero or negative.
    pub defined: Vec<bool>,
}

impl EfficiencyCurve {
    /// Divide `pass` by `total` bin by bin. Both must share one binning.
    pub fn divide(pass: &Distribution, total: &Distribution) -> Result<Self> {
        if pass.binning != total.binning {
            return Err(Error::Validation(format!(
                "cannot divide '{}' by '{}': binning differs",
                pass.name, total.name
            )));
        }

        let n = total.binning.n_bins;
        let mut efficiency = vec![0.0; n];
        let mut err_lo = vec![0.0; n];
        let mut err_hi = vec![0.0; n];
        let mut defined = vec![false; n];

        for b in 0..n {
            let t = total.bin_content[b];
            if t <= 0.0 {
                continue;
            }
            let eff = pass.bin_content[b] / t;
            let var = ((1.0 - 2.0 * eff) * pass.sumw2[b] + eff * eff * total.sumw2[b]) / (t * t);
            let sigma = var.max(0.0).sqrt();

            efficiency[b] = eff;
            err_lo[b] = (eff - (eff - sigma).max(0.0)).max(0.0);
            err_hi[b] = ((eff + sigma).min(1.0) - eff).max(0.0);
            defined[b] = true;
        }

        Ok(Self {
            name: format!("{}_efficiency", pass.name),
            numerator: pass.name.clone(),
            denominator: total.name.clone(),
            bin_edges: total.bin_edges(),
            efficiency,
            err_lo,
            err_hi,
            defined,
        })
    }

    /// Number of bins with a positive total.
    pub fn num_defined(&self) -> usize {
        self.defined.iter().filter(|d| **d).count()
    }
}
