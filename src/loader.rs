use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::collection::{EpitopeCollection, RankedCollection};
use crate::model::{BindingPrediction, Measure};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load binding predictions from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the five canonical field names, any order
/// * `.json`    – records-oriented array of prediction objects
/// * `.parquet` – scalar columns named per [`BindingPrediction::FIELD_NAMES`]
///
/// Duplicate rows are legal; they collapse during collection construction.
pub fn load_file(path: &Path) -> Result<EpitopeCollection> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let collection = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    log::info!(
        "loaded {} unique predictions from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row naming the prediction fields (column order is
/// free), e.g.
///
/// ```csv
/// peptide,allele,measure,value,percentile_rank
/// SIINFEKL,H-2-Kb,affinity,12.5,0.12
/// ```
fn load_csv(path: &Path) -> Result<EpitopeCollection> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<BindingPrediction>().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(record);
    }
    Ok(EpitopeCollection::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "peptide": "SIINFEKL",
///     "allele": "H-2-Kb",
///     "measure": "affinity",
///     "value": 12.5,
///     "percentile_rank": 0.12
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<EpitopeCollection> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let records: Vec<BindingPrediction> =
        serde_json::from_str(&text).context("parsing JSON predictions")?;
    Ok(EpitopeCollection::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of binding predictions.
///
/// Expected schema: one scalar column per prediction field —
/// `peptide`, `allele`, `measure` as Utf8 (or LargeUtf8), `value` and
/// `percentile_rank` as Float64 or Float32. Extra columns are ignored.
fn load_parquet(path: &Path) -> Result<EpitopeCollection> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let [peptide, allele, measure, value, percentile_rank] = BindingPrediction::FIELD_NAMES;
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let peptides = named_column(&batch, peptide)?;
        let alleles = named_column(&batch, allele)?;
        let measures = named_column(&batch, measure)?;
        let values = named_column(&batch, value)?;
        let ranks = named_column(&batch, percentile_rank)?;

        for row in 0..batch.num_rows() {
            let measure_name = extract_string(measures, row)
                .with_context(|| format!("Row {row}: failed to read 'measure'"))?;
            let measure: Measure = measure_name
                .parse()
                .with_context(|| format!("Row {row}: bad measure"))?;

            records.push(BindingPrediction {
                peptide: extract_string(peptides, row)
                    .with_context(|| format!("Row {row}: failed to read 'peptide'"))?,
                allele: extract_string(alleles, row)
                    .with_context(|| format!("Row {row}: failed to read 'allele'"))?,
                measure,
                value: extract_f64(values, row)
                    .with_context(|| format!("Row {row}: failed to read 'value'"))?,
                percentile_rank: extract_f64(ranks, row)
                    .with_context(|| format!("Row {row}: failed to read 'percentile_rank'"))?,
            });
        }
    }

    Ok(EpitopeCollection::from_records(records))
}

// -- Parquet / Arrow helpers --

fn named_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))
}

/// Extract an owned `String` from a Utf8 or LargeUtf8 column at `row`.
fn extract_string(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in string column");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .context("expected LargeStringArray")?;
            Ok(arr.value(row).to_string())
        }
        other => bail!("Expected Utf8 column, got {other:?}"),
    }
}

/// Extract an `f64` from a Float64 or Float32 column at `row`.
fn extract_f64(col: &ArrayRef, row: usize) -> Result<f64> {
    if col.is_null(row) {
        bail!("null value in numeric column");
    }
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Ok(arr.value(row) as f64)
        }
        other => bail!("Expected Float64 or Float32 column, got {other:?}"),
    }
}
