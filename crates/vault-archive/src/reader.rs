use std::fs::File;
use std::path::Path;

use arrow_array::{Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray};
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use uuid::Uuid;
use vault_core::{Chunk, SourceMetadata};

use crate::error::{ArchiveError, Result};
use crate::schema::REQUIRED_COLUMNS;

/// Read every chunk back out of an archive file, preserving row order
/// (callers rely on `chunk_index` for document order, but row order in a
/// single-row-group file matches write order too). Tolerates unknown extra
/// columns; errors if any required column is absent.
pub fn read_chunks(archive_path: &Path) -> Result<Vec<Chunk>> {
    let file = File::open(archive_path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let schema = builder.schema().clone();
    for required in REQUIRED_COLUMNS {
        if schema.field_with_name(required).is_err() {
            return Err(ArchiveError::MissingColumn((*required).to_string()));
        }
    }

    let reader = builder.build()?;
    let mut chunks = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;

        let ids = column_as::<StringArray>(&batch, "id")?;
        let content_hashes = column_as::<StringArray>(&batch, "content_hash")?;
        let source_ids = column_as::<StringArray>(&batch, "source_id")?;
        let source_names = column_as::<StringArray>(&batch, "source_name")?;
        let versions = column_as::<StringArray>(&batch, "version")?;
        let created_ats = column_as::<TimestampMicrosecondArray>(&batch, "created_at")?;
        let content_types = column_as::<StringArray>(&batch, "source_content_type").ok();
        let file_sizes = column_as::<Int64Array>(&batch, "source_file_size").ok();
        let file_hashes = column_as::<StringArray>(&batch, "source_file_hash").ok();
        let texts = column_as::<StringArray>(&batch, "text")?;
        let chunk_indices = column_as::<Int32Array>(&batch, "chunk_index")?;
        let start_indices = column_as::<Int32Array>(&batch, "start_index").ok();
        let end_indices = column_as::<Int32Array>(&batch, "end_index").ok();
        let page_numbers = column_as::<Int32Array>(&batch, "page_number").ok();
        let source_locations = column_as::<StringArray>(&batch, "source_location").ok();

        for row in 0..batch.num_rows() {
            let id = Uuid::parse_str(ids.value(row))
                .map_err(|e| ArchiveError::Read(format!("invalid chunk id: {e}")))?;
            let created_at = DateTime::<Utc>::from_timestamp_micros(created_ats.value(row))
                .ok_or_else(|| ArchiveError::Read("invalid created_at timestamp".into()))?;

            chunks.push(Chunk {
                id,
                content_hash: content_hashes.value(row).to_string(),
                source_id: source_ids.value(row).to_string(),
                chunk_index: chunk_indices.value(row),
                text: texts.value(row).to_string(),
                start_index: opt_i32(start_indices.as_ref(), row),
                end_index: opt_i32(end_indices.as_ref(), row),
                page_number: opt_i32(page_numbers.as_ref(), row),
                source_location: opt_str(source_locations.as_ref(), row),
                created_at,
                version: versions.value(row).to_string(),
                metadata: SourceMetadata {
                    source_name: source_names.value(row).to_string(),
                    source_content_type: opt_str(content_types.as_ref(), row),
                    source_file_size: opt_i64(file_sizes.as_ref(), row),
                    source_file_hash: opt_str(file_hashes.as_ref(), row),
                },
            });
        }
    }

    Ok(chunks)
}

fn column_as<'a, T: Array + Clone + 'static>(
    batch: &'a arrow_array::RecordBatch,
    name: &str,
) -> Result<T> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| ArchiveError::MissingColumn(name.to_string()))?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ArchiveError::Read(format!("column {name} has unexpected type")))
}

fn opt_i32(array: Option<&Int32Array>, row: usize) -> Option<i32> {
    array.and_then(|a| if a.is_null(row) { None } else { Some(a.value(row)) })
}

fn opt_i64(array: Option<&Int64Array>, row: usize) -> Option<i64> {
    array.and_then(|a| if a.is_null(row) { None } else { Some(a.value(row)) })
}

fn opt_str(array: Option<&StringArray>, row: usize) -> Option<String> {
    array.and_then(|a| {
        if a.is_null(row) {
            None
        } else {
            Some(a.value(row).to_string())
        }
    })
}
