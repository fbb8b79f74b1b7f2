use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
    util::display::array_value_to_string,
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    path::Path,
    sync::Arc,
};
use tracing::{debug, instrument};

use super::utils::{format_number, infer_column_dtype, parse_number};
use super::Table;

/// Build an Arrow batch from a table. The key column is always Utf8; other
/// columns become Float64 when every non-empty cell is numeric.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());

    for (idx, name) in table.columns().iter().enumerate() {
        let cells = table.rows().iter().map(|r| r[idx].as_str());
        let dtype = if idx == 0 {
            DataType::Utf8
        } else {
            infer_column_dtype(cells.clone())
        };

        let array: ArrayRef = match dtype {
            DataType::Float64 => Arc::new(Float64Array::from(
                cells.map(parse_number).collect::<Vec<_>>(),
            )),
            _ => Arc::new(StringArray::from(
                cells
                    .map(|c| if c.is_empty() { None } else { Some(c) })
                    .collect::<Vec<_>>(),
            )),
        };
        fields.push(Field::new(name, dtype, true));
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building table batch")
}

/// Inverse of [`to_record_batch`]; nulls become empty cells.
pub fn from_record_batches(schema: &Schema, batches: &[RecordBatch]) -> Result<Table> {
    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut rows = Vec::new();

    for batch in batches {
        for row in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(columns.len());
            for col in batch.columns() {
                cells.push(cell_to_string(col, row)?);
            }
            rows.push(cells);
        }
    }

    Table::new(columns, rows)
}

fn cell_to_string(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        return Ok(String::new());
    }
    if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
        return Ok(s.value(row).to_string());
    }
    if let Some(f) = col.as_any().downcast_ref::<Float64Array>() {
        return Ok(format_number(f.value(row)));
    }
    array_value_to_string(col.as_ref(), row).map_err(|e| anyhow!("rendering cell {}: {}", row, e))
}

/// Write `table` to `path`, via a temp file renamed into place.
/// Returns the number of bytes written.
#[instrument(level = "debug", skip(table, path), fields(path = %path.as_ref().display()))]
pub fn write_table<P: AsRef<Path>>(table: &Table, path: P) -> Result<u64> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let batch = to_record_batch(table)?;
    let tmp = path.with_extension("parquet.tmp");
    let file = File::create(&tmp).with_context(|| format!("creating file {}", tmp.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(&batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    let bytes = fs::metadata(path).context("getting file metadata")?.len();
    debug!(rows = table.num_rows(), bytes, "wrote table");
    Ok(bytes)
}

/// Read a table written by [`write_table`].
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(1024).build()?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("reading batches of {}", path.display()))?;
    from_record_batches(&schema, &batches)
        .with_context(|| format!("rebuilding table from {}", path.display()))
}
