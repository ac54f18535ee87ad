//! Parquet histogram tables.
//!
//! # Schema: `vvjj_histograms_v1`
//!
//! One row per distribution:
//!
//! | Column            | Arrow Type      |
//! |-------------------|-----------------|
//! | `name`            | `Utf8`          |
//! | `x_min`, `x_max`  | `Float64`       |
//! | `n_bins`          | `UInt64`        |
//! | `flow_policy`     | `Utf8`          |
//! | `bin_content`     | `List<Float64>` |
//! | `sumw2`           | `List<Float64>` |
//! | `underflow`, `overflow`, `underflow_sumw2`, `overflow_sumw2` | `Float64` |
//! | `entries`         | `UInt64`        |

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, AsArray, Float64Array, Float64Builder, ListBuilder, StringBuilder,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, UInt64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use vvjj_core::{Error, Result};

use crate::histogram::{Binning, Distribution, FlowPolicy};
use crate::sink::{HISTOGRAMS_SCHEMA_V1, HistogramSink};

/// Parquet metadata key for the schema version.
pub const META_KEY_SCHEMA_VERSION: &str = "vvjj.schema_version";

fn list_field(name: &str) -> Field {
    let item = Arc::new(Field::new_list_field(DataType::Float64, true));
    Field::new(name, DataType::List(item), false)
}

fn histogram_schema() -> Schema {
    let fields = vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("x_min", DataType::Float64, false),
        Field::new("x_max", DataType::Float64, false),
        Field::new("n_bins", DataType::UInt64, false),
        Field::new("flow_policy", DataType::Utf8, false),
        list_field("bin_content"),
        list_field("sumw2"),
        Field::new("underflow", DataType::Float64, false),
        Field::new("overflow", DataType::Float64, false),
        Field::new("underflow_sumw2", DataType::Float64, false),
        Field::new("overflow_sumw2", DataType::Float64, false),
        Field::new("entries", DataType::UInt64, false),
    ];
    let metadata =
        HashMap::from([(META_KEY_SCHEMA_VERSION.to_string(), HISTOGRAMS_SCHEMA_V1.to_string())]);
    Schema::new(fields).with_metadata(metadata)
}

fn flow_policy_str(p: FlowPolicy) -> &'static str {
    match p {
        FlowPolicy::Drop => "drop",
        FlowPolicy::Fold => "fold",
    }
}

fn f64_array(histograms: &[Distribution], f: impl Fn(&Distribution) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(histograms.iter().map(f))) as ArrayRef
}

/// Build one Arrow [`RecordBatch`] holding `histograms`.
pub fn histograms_to_record_batch(histograms: &[Distribution]) -> Result<RecordBatch> {
    let mut name = StringBuilder::new();
    let mut flow = StringBuilder::new();
    let mut content = ListBuilder::new(Float64Builder::new());
    let mut sumw2 = ListBuilder::new(Float64Builder::new());

    for h in histograms {
        name.append_value(&h.name);
        flow.append_value(flow_policy_str(h.flow_policy));
        content.values().append_slice(&h.bin_content);
        content.append(true);
        sumw2.values().append_slice(&h.sumw2);
        sumw2.append(true);
    }

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(name.finish()) as ArrayRef,
        f64_array(histograms, |h| h.binning.x_min),
        f64_array(histograms, |h| h.binning.x_max),
        Arc::new(UInt64Array::from_iter_values(histograms.iter().map(|h| h.binning.n_bins as u64)))
            as ArrayRef,
        Arc::new(flow.finish()) as ArrayRef,
        Arc::new(content.finish()) as ArrayRef,
        Arc::new(sumw2.finish()) as ArrayRef,
        f64_array(histograms, |h| h.underflow),
        f64_array(histograms, |h| h.overflow),
        f64_array(histograms, |h| h.underflow_sumw2),
        f64_array(histograms, |h| h.overflow_sumw2),
        Arc::new(UInt64Array::from_iter_values(histograms.iter().map(|h| h.entries))) as ArrayRef,
    ];

    RecordBatch::try_new(Arc::new(histogram_schema()), arrays)
        .map_err(|e| Error::Export(format!("failed to build RecordBatch: {e}")))
}

/// Stages histograms and writes them as a single Parquet table on
/// [`ParquetSink::finish`].
#[derive(Debug)]
pub struct ParquetSink {
    path: PathBuf,
    histograms: Vec<Distribution>,
    names: BTreeSet<String>,
}

impl ParquetSink {
    /// Sink that will write to `path`.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), histograms: Vec::new(), names: BTreeSet::new() }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the file (Snappy compressed). Returns the number of histograms stored.
    pub fn finish(self) -> Result<usize> {
        let batch = histograms_to_record_batch(&self.histograms)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| Error::Export(format!("failed to create Parquet writer: {e}")))?;
        writer.write(&batch).map_err(|e| Error::Export(format!("failed to write Parquet: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::Export(format!("failed to close Parquet writer: {e}")))?;
        let n = self.histograms.len();
        tracing::info!(path = %self.path.display(), histograms = n, "wrote histograms");
        Ok(n)
    }
}

impl HistogramSink for ParquetSink {
    fn write(&mut self, dist: &Distribution) -> Result<()> {
        if !self.names.insert(dist.name.clone()) {
            return Err(Error::Export(format!(
                "histogram '{}' written twice to the same sink",
                dist.name
            )));
        }
        self.histograms.push(dist.clone());
        Ok(())
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::Validation(format!("missing column '{name}' in histogram table")))?;
    Ok(batch.column(idx))
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    column(batch, name)?
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| Error::Validation(format!("column '{name}' is not Float64")))
}

fn u64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array> {
    column(batch, name)?
        .as_primitive_opt::<UInt64Type>()
        .ok_or_else(|| Error::Validation(format!("column '{name}' is not UInt64")))
}

fn list_values(batch: &RecordBatch, name: &str, row: usize) -> Result<Vec<f64>> {
    let list = column(batch, name)?
        .as_list_opt::<i32>()
        .ok_or_else(|| Error::Validation(format!("column '{name}' is not a list")))?;
    let values = list.value(row);
    let values = values
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| Error::Validation(format!("column '{name}' is not List<Float64>")))?;
    Ok(values.values().to_vec())
}

/// Read a file produced by [`ParquetSink`].
pub fn read_histograms_parquet(path: &Path) -> Result<Vec<Distribution>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|b| b.build())
        .map_err(|e| Error::Validation(format!("failed to open {}: {e}", path.display())))?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| Error::Validation(format!("failed to read {}: {e}", path.display())))?;
        let names = column(&batch, "name")?
            .as_string_opt::<i32>()
            .ok_or_else(|| Error::Validation("column 'name' is not Utf8".into()))?;
        let flows = column(&batch, "flow_policy")?
            .as_string_opt::<i32>()
            .ok_or_else(|| Error::Validation("column 'flow_policy' is not Utf8".into()))?;
        let x_min = f64_column(&batch, "x_min")?;
        let x_max = f64_column(&batch, "x_max")?;
        let n_bins = u64_column(&batch, "n_bins")?;
        let underflow = f64_column(&batch, "underflow")?;
        let overflow = f64_column(&batch, "overflow")?;
        let underflow_sumw2 = f64_column(&batch, "underflow_sumw2")?;
        let overflow_sumw2 = f64_column(&batch, "overflow_sumw2")?;
        let entries = u64_column(&batch, "entries")?;

        for row in 0..batch.num_rows() {
            let flow_policy = match flows.value(row) {
                "drop" => FlowPolicy::Drop,
                "fold" => FlowPolicy::Fold,
                other => {
                    return Err(Error::Validation(format!("unknown flow_policy '{other}'")));
                }
            };
            let binning =
                Binning::new(x_min.value(row), x_max.value(row), n_bins.value(row) as usize)?;
            let bin_content = list_values(&batch, "bin_content", row)?;
            let sumw2 = list_values(&batch, "sumw2", row)?;
            if bin_content.len() != binning.n_bins || sumw2.len() != binning.n_bins {
                return Err(Error::Validation(format!(
                    "histogram '{}' has {} bins but {} contents / {} sumw2",
                    names.value(row),
                    binning.n_bins,
                    bin_content.len(),
                    sumw2.len()
                )));
            }
            out.push(Distribution {
                name: names.value(row).to_string(),
                binning,
                flow_policy,
                bin_content,
                sumw2,
                underflow: underflow.value(row),
                overflow: overflow.value(row),
                underflow_sumw2: underflow_sumw2.value(row),
                overflow_sumw2: overflow_sumw2.value(row),
                entries: entries.value(row),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_path(filename: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let mut p = std::env::temp_dir();
        p.push(format!("vvjj_hist_{}_{}_{}", std::process::id(), nanos, filename));
        p
    }

    #[test]
    fn parquet_round_trip() {
        let mut a = Distribution::new("a", Binning::new(0.0, 4.0, 4).unwrap(), FlowPolicy::Drop);
        a.fill(0.5, 1.5);
        a.fill(3.5, 2.0);
        a.fill(-1.0, 0.5);
        let mut b =
            Distribution::new("b_qg", Binning::new(-1.0, 1.0, 2).unwrap(), FlowPolicy::Fold);
        b.fill(5.0, 3.0);

        let path = tmp_path("hists.parquet");
        let mut sink = ParquetSink::create(&path);
        sink.write(&a).unwrap();
        sink.write(&b).unwrap();
        assert!(sink.write(&b).is_err());
        assert_eq!(sink.finish().unwrap(), 2);

        let back = read_histograms_parquet(&path).unwrap();
        assert_eq!(back, vec![a, b]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn record_batch_shape() {
        let d = Distribution::new("x", Binning::new(0.0, 1.0, 3).unwrap(), FlowPolicy::Drop);
        let batch = histograms_to_record_batch(&[d]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 12);
        assert_eq!(
            batch.schema().metadata().get(META_KEY_SCHEMA_VERSION).map(String::as_str),
            Some(HISTOGRAMS_SCHEMA_V1)
        );
    }
}
