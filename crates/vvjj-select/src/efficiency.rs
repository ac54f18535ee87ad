//! Tag efficiencies derived from exported histograms.
//!
//! For every variable, jet tags are divided within the quark and gluon jet
//! categories (`<var>_<tag>_<q|g>` over `<var>_<q|g>`) and event tags within
//! the event categories (`<var>_<tag>_<qq|qg|gg>` over `<var>_<qq|qg|gg>`).
//! Pairs where either histogram was never filled are skipped.

use std::collections::HashMap;

use vvjj_core::{EventFlavorTopo, JetTopo, Result};
use vvjj_hist::{Category, Distribution, EfficiencyCurve};

use crate::record::{FIRST_JET_PREFIX, SECOND_JET_PREFIX};
use crate::tags::{EVENT_TAGS, JET_TAGS};
use crate::variables::{DIJET_MASS, JetVariable};

/// The thirteen set names in export order.
pub fn variable_names() -> Vec<String> {
    let mut names = Vec::with_capacity(13);
    for prefix in [FIRST_JET_PREFIX, SECOND_JET_PREFIX] {
        for var in JetVariable::ALL {
            names.push(format!("{prefix}_{}", var.suffix()));
        }
    }
    names.push(DIJET_MASS.to_string());
    names
}

/// Every tag efficiency the histograms support, by variable, then jet
/// categories with jet tags, then event categories with event tags.
pub fn tag_efficiencies(histograms: &[Distribution]) -> Result<Vec<EfficiencyCurve>> {
    let by_name: HashMap<&str, &Distribution> =
        histograms.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut pairs: Vec<(Category, &'static str)> = Vec::new();
    for topo in JetTopo::ALL {
        pairs.extend(JET_TAGS.map(|tag| (Category::Jet(topo), tag.name)));
    }
    for topo in EventFlavorTopo::ALL {
        pairs.extend(EVENT_TAGS.map(|tag| (Category::Event(topo), tag.name)));
    }

    let mut curves = Vec::new();
    for var in variable_names() {
        for &(category, tag) in &pairs {
            let pass = by_name.get(category.histogram_name(&var, Some(tag)).as_str()).copied();
            let total = by_name.get(category.histogram_name(&var, None).as_str()).copied();
            if let (Some(pass), Some(total)) = (pass, total) {
                curves.push(EfficiencyCurve::divide(pass, total)?);
            }
        }
    }
    tracing::debug!(
        histograms = histograms.len(),
        curves = curves.len(),
        "derived tag efficiencies"
    );
    Ok(curves)
}
