//! Columnar event tables.
//!
//! An [`EventColumns`] is a set of equally long `f64` columns keyed by branch
//! name. Tables come from Parquet (any numeric or boolean column is cast to
//! `Float64`) or from a JSON object mapping column names to number arrays.
//! Columns the pipeline does not read are kept but ignored.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use vvjj_core::{Error, Result};

use crate::record::{
    EVENT_FIELDS, EventRecord, FIRST_JET_PREFIX, JET_FIELDS, JetRecord, SECOND_JET_PREFIX,
    jet_column, required_columns,
};

/// Named `f64` columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventColumns {
    columns: BTreeMap<String, Vec<f64>>,
    n_rows: usize,
}

impl EventColumns {
    /// Build a table, rejecting ragged columns.
    pub fn new(columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        let mut reference: Option<(&str, usize)> = None;
        for (name, values) in &columns {
            match reference {
                None => reference = Some((name.as_str(), values.len())),
                Some((first, n)) if n != values.len() => {
                    return Err(Error::Validation(format!(
                        "ragged event table: column '{name}' has {} rows, column '{first}' has {n}",
                        values.len()
                    )));
                }
                Some(_) => {}
            }
        }
        let n_rows = reference.map_or(0, |(_, n)| n);
        Ok(Self { columns, n_rows })
    }

    /// Table holding exactly the required columns for `records`.
    pub fn from_records(records: &[EventRecord]) -> Self {
        let mut columns: BTreeMap<String, Vec<f64>> = required_columns()
            .into_iter()
            .map(|c| (c, Vec::with_capacity(records.len())))
            .collect();
        let mut push = |name: &str, value: f64| {
            if let Some(col) = columns.get_mut(name) {
                col.push(value);
            }
        };
        for r in records {
            for (field, value) in EVENT_FIELDS.iter().zip(event_values(r)) {
                push(*field, value);
            }
            let jets = [(FIRST_JET_PREFIX, &r.first_jet), (SECOND_JET_PREFIX, &r.second_jet)];
            for (prefix, jet) in jets {
                for (field, value) in JET_FIELDS.iter().zip(jet_values(jet)) {
                    push(&jet_column(prefix, field), value);
                }
            }
        }
        Self { columns, n_rows: records.len() }
    }

    /// Load a table, choosing the reader by file extension
    /// (`.parquet` / `.pq` or `.json`).
    pub fn open(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("parquet") | Some("pq") => Self::from_parquet(path),
            Some("json") => Self::from_json(path),
            _ => Err(Error::Config(format!(
                "{}: unsupported event table format (expected .parquet, .pq or .json)",
                path.display()
            ))),
        }
    }

    /// Load a JSON column map: `{"column": [values...], ...}`.
    pub fn from_json(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Validation(format!("failed to open {}: {e}", path.display())))?;
        let columns: BTreeMap<String, Vec<f64>> = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Validation(format!("{}: invalid event table JSON: {e}", path.display()))
        })?;
        Self::new(columns)
    }

    /// Load every numeric or boolean column of a Parquet file as `f64`.
    pub fn from_parquet(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Validation(format!("failed to open {}: {e}", path.display())))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Error::Validation(format!("failed to read Parquet: {e}")))?;

        let schema = builder.schema().clone();
        let mut wanted = Vec::new();
        for (idx, field) in schema.fields().iter().enumerate() {
            if field.data_type().is_numeric() || field.data_type() == &DataType::Boolean {
                wanted.push((idx, field.name().clone()));
            } else {
                tracing::debug!(
                    column = %field.name(),
                    data_type = %field.data_type(),
                    "skipping non-numeric column"
                );
            }
        }

        let reader = builder
            .build()
            .map_err(|e| Error::Validation(format!("failed to build Parquet reader: {e}")))?;

        let mut columns: BTreeMap<String, Vec<f64>> =
            wanted.iter().map(|(_, name)| (name.clone(), Vec::new())).collect();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::Validation(format!("failed to read Parquet batch: {e}")))?;
            for (idx, name) in &wanted {
                if let Some(out) = columns.get_mut(name) {
                    append_as_f64(batch.column(*idx), name, out)?;
                }
            }
        }
        Self::new(columns)
    }

    /// Store as pretty JSON in the [`EventColumns::from_json`] layout.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.columns)?)?;
        Ok(())
    }

    /// Arrow batch with one non-null `Float64` column per table column.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields: Vec<Field> =
            self.columns.keys().map(|n| Field::new(n, DataType::Float64, false)).collect();
        let arrays: Vec<ArrayRef> = self
            .columns
            .values()
            .map(|v| Arc::new(Float64Array::from(v.clone())) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| Error::Validation(format!("failed to build RecordBatch: {e}")))
    }

    /// Store as a Snappy-compressed Parquet file.
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        let batch = self.to_record_batch()?;
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Validation(format!("failed to create {}: {e}", path.display())))?;
        let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| Error::Validation(format!("failed to create Parquet writer: {e}")))?;
        writer
            .write(&batch)
            .map_err(|e| Error::Validation(format!("failed to write Parquet: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::Validation(format!("failed to close Parquet writer: {e}")))?;
        Ok(())
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names, sorted.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// One column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Check that every column the pipeline reads is present.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> =
            required_columns().into_iter().filter(|c| !self.columns.contains_key(c)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "event table is missing required columns: {}",
                missing.join(", ")
            )))
        }
    }

    /// Iterate rows as [`EventRecord`]s, after [`EventColumns::validate`].
    pub fn records(&self) -> Result<Records<'_>> {
        self.validate()?;
        Ok(Records {
            event: EVENT_FIELDS.map(|f| self.column_or_empty(f)),
            first: self.jet_columns(FIRST_JET_PREFIX),
            second: self.jet_columns(SECOND_JET_PREFIX),
            row: 0,
            n_rows: self.n_rows,
        })
    }

    fn column_or_empty(&self, name: &str) -> &[f64] {
        self.columns.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn jet_columns(&self, prefix: &str) -> [&[f64]; 10] {
        JET_FIELDS.map(|f| self.column_or_empty(&jet_column(prefix, f)))
    }
}

fn append_as_f64(col: &ArrayRef, name: &str, out: &mut Vec<f64>) -> Result<()> {
    if col.null_count() > 0 {
        return Err(Error::Validation(format!(
            "column '{name}' contains {} null values",
            col.null_count()
        )));
    }
    let cast = arrow::compute::cast(col, &DataType::Float64).map_err(|e| {
        Error::Validation(format!("column '{name}' is not castable to Float64: {e}"))
    })?;
    let values = cast
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| Error::Validation(format!("column '{name}' did not cast to Float64")))?;
    out.extend_from_slice(values.values());
    Ok(())
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn event_values(r: &EventRecord) -> [f64; 9] {
    [
        r.weight,
        r.pileup_weight,
        r.dijet_mass,
        r.dyjj,
        r.ptasym,
        r.jet1_m,
        r.jet2_m,
        r.jet1_ungrtrk500,
        r.jet2_ungrtrk500,
    ]
}

fn jet_values(j: &JetRecord) -> [f64; 10] {
    [
        j.pt,
        j.eta,
        j.phi,
        j.m,
        j.d2,
        flag(j.passed_w_substructure),
        flag(j.passed_z_substructure),
        flag(j.passed_w_mass_cut),
        flag(j.passed_z_mass_cut),
        j.pdgid,
    ]
}

/// Row iterator over a validated [`EventColumns`].
#[derive(Debug, Clone)]
pub struct Records<'a> {
    event: [&'a [f64]; 9],
    first: [&'a [f64]; 10],
    second: [&'a [f64]; 10],
    row: usize,
    n_rows: usize,
}

fn jet_at(cols: &[&[f64]; 10], i: usize) -> JetRecord {
    JetRecord {
        pt: cols[0][i],
        eta: cols[1][i],
        phi: cols[2][i],
        m: cols[3][i],
        d2: cols[4][i],
        passed_w_substructure: cols[5][i] != 0.0,
        passed_z_substructure: cols[6][i] != 0.0,
        passed_w_mass_cut: cols[7][i] != 0.0,
        passed_z_mass_cut: cols[8][i] != 0.0,
        pdgid: cols[9][i],
    }
}

impl Iterator for Records<'_> {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        if self.row >= self.n_rows {
            return None;
        }
        let i = self.row;
        self.row += 1;
        let e = &self.event;
        Some(EventRecord {
            weight: e[0][i],
            pileup_weight: e[1][i],
            dijet_mass: e[2][i],
            dyjj: e[3][i],
            ptasym: e[4][i],
            first_jet: jet_at(&self.first, i),
            second_jet: jet_at(&self.second, i),
            jet1_m: e[5][i],
            jet2_m: e[6][i],
            jet1_ungrtrk500: e[7][i],
            jet2_ungrtrk500: e[8][i],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.n_rows - self.row;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Records<'_> {}
