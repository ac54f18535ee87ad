//! Persistence targets for finished histograms.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vvjj_core::{Error, Result};

use crate::histogram::Distribution;

/// Schema version string written at the top of JSON histogram files.
pub const HISTOGRAMS_SCHEMA_V1: &str = "vvjj_histograms_v1";

/// Receives finished distributions, keyed by [`Distribution::name`].
///
/// Key sets are open-ended; implementations must accept any name but reject a
/// name written twice.
pub trait HistogramSink {
    /// Persist (or stage) one distribution.
    fn write(&mut self, dist: &Distribution) -> Result<()>;
}

fn duplicate(name: &str) -> Error {
    Error::Export(format!("histogram '{name}' written twice to the same sink"))
}

/// In-memory sink, mostly for tests and merging.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    histograms: BTreeMap<String, Distribution>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a histogram by name.
    pub fn get(&self, name: &str) -> Option<&Distribution> {
        self.histograms.get(name)
    }

    /// Stored names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Number of stored histograms.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// `true` if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Consume the sink.
    pub fn into_inner(self) -> BTreeMap<String, Distribution> {
        self.histograms
    }
}

impl HistogramSink for MemorySink {
    fn write(&mut self, dist: &Distribution) -> Result<()> {
        if self.histograms.contains_key(&dist.name) {
            return Err(duplicate(&dist.name));
        }
        self.histograms.insert(dist.name.clone(), dist.clone());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct HistogramFile {
    schema_version: String,
    histograms: Vec<Distribution>,
}

/// Stages histograms in write order and stores them as one pretty-printed
/// JSON document on [`JsonSink::finish`].
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
    histograms: Vec<Distribution>,
    names: BTreeSet<String>,
}

impl JsonSink {
    /// Sink that will write to `path`.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), histograms: Vec::new(), names: BTreeSet::new() }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the file. Returns the number of histograms stored.
    pub fn finish(self) -> Result<usize> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let n = self.histograms.len();
        let file = HistogramFile {
            schema_version: HISTOGRAMS_SCHEMA_V1.to_string(),
            histograms: self.histograms,
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        tracing::info!(path = %self.path.display(), histograms = n, "wrote histograms");
        Ok(n)
    }
}

impl HistogramSink for JsonSink {
    fn write(&mut self, dist: &Distribution) -> Result<()> {
        if !self.names.insert(dist.name.clone()) {
            return Err(duplicate(&dist.name));
        }
        self.histograms.push(dist.clone());
        Ok(())
    }
}

/// Read a file produced by [`JsonSink`].
pub fn read_histograms_json(path: &Path) -> Result<Vec<Distribution>> {
    let bytes = std::fs::read(path)?;
    let file: HistogramFile = serde_json::from_slice(&bytes)?;
    if file.schema_version != HISTOGRAMS_SCHEMA_V1 {
        return Err(Error::Validation(format!(
            "{}: unsupported schema_version '{}' (expected '{HISTOGRAMS_SCHEMA_V1}')",
            path.display(),
            file.schema_version
        )));
    }
    Ok(file.histograms)
}
