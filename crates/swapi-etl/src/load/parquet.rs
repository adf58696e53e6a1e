//! Parquet encoding of [`Table`]s

use arrow::array::{ArrayRef, Float64Array, Int64Array, ListBuilder, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

use crate::error::Result;
use crate::table::{ColumnData, ColumnKind, Table};

/// Content type used for uploaded layer files
pub const PARQUET_CONTENT_TYPE: &str = "application/octet-stream";

fn data_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Int64 => DataType::Int64,
        ColumnKind::Float64 => DataType::Float64,
        ColumnKind::Utf8 => DataType::Utf8,
        ColumnKind::Utf8List => DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
    }
}

fn to_array(data: &ColumnData) -> ArrayRef {
    match data {
        ColumnData::Int64(values) => Arc::new(Int64Array::from(values.clone())),
        ColumnData::Float64(values) => Arc::new(Float64Array::from(values.clone())),
        ColumnData::Utf8(values) => Arc::new(StringArray::from(values.clone())),
        ColumnData::Utf8List(rows) => {
            let mut builder = ListBuilder::new(StringBuilder::new());
            for row in rows {
                match row {
                    Some(items) => {
                        for item in items {
                            builder.values().append_option(item.as_deref());
                        }
                        builder.append(true);
                    }
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

/// Arrow view of a table
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(c.name.as_str(), data_type(c.data.kind()), true))
        .collect();
    let arrays: Vec<ArrayRef> = table.columns().iter().map(|c| to_array(&c.data)).collect();

    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
    Ok(batch)
}

/// Encode a table as one snappy-compressed Parquet file.
pub fn encode(table: &Table) -> Result<Vec<u8>> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(buffer)
}
