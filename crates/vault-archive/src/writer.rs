use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{Int32Array, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use vault_core::Chunk;

use crate::error::{ArchiveError, Result};
use crate::schema::chunk_schema;

/// Write `chunks` to `target_path` as a single-row-group, Zstd-compressed
/// Parquet file. Writes to a temp file in the same directory and renames
/// into place — a crash mid-write leaves no file at `target_path`, only a
/// stray `.tmp`; the index, not the archive, is the recovery authority.
pub fn write_chunks(chunks: &[Chunk], target_path: &Path) -> Result<()> {
    let batch = chunks_to_record_batch(chunks)?;

    let tmp_path = tmp_path_for(target_path);
    {
        let file = File::create(&tmp_path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(
                ZstdLevel::try_new(3).map_err(|e| ArchiveError::Write(e.to_string()))?,
            ))
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
    }
    std::fs::rename(&tmp_path, target_path)?;
    Ok(())
}

fn tmp_path_for(target_path: &Path) -> PathBuf {
    let mut tmp = target_path.to_path_buf();
    let file_name = tmp
        .file_name()
        .map(|n| format!("{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| "archive.tmp".to_string());
    tmp.set_file_name(file_name);
    tmp
}

fn chunks_to_record_batch(chunks: &[Chunk]) -> Result<RecordBatch> {
    let ids: Vec<String> = chunks.iter().map(|c| c.id.to_string()).collect();
    let content_hashes: Vec<&str> = chunks.iter().map(|c| c.content_hash.as_str()).collect();
    let source_ids: Vec<&str> = chunks.iter().map(|c| c.source_id.as_str()).collect();
    let source_names: Vec<&str> = chunks.iter().map(|c| c.metadata.source_name.as_str()).collect();
    let versions: Vec<&str> = chunks.iter().map(|c| c.version.as_str()).collect();
    let created_ats: Vec<i64> = chunks.iter().map(|c| c.created_at.timestamp_micros()).collect();
    let content_types: Vec<Option<&str>> = chunks
        .iter()
        .map(|c| c.metadata.source_content_type.as_deref())
        .collect();
    let file_sizes: Vec<Option<i64>> = chunks.iter().map(|c| c.metadata.source_file_size).collect();
    let file_hashes: Vec<Option<&str>> = chunks
        .iter()
        .map(|c| c.metadata.source_file_hash.as_deref())
        .collect();
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let chunk_indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
    let start_indices: Vec<Option<i32>> = chunks.iter().map(|c| c.start_index).collect();
    let end_indices: Vec<Option<i32>> = chunks.iter().map(|c| c.end_index).collect();
    let page_numbers: Vec<Option<i32>> = chunks.iter().map(|c| c.page_number).collect();
    let source_locations: Vec<Option<&str>> = chunks
        .iter()
        .map(|c| c.source_location.as_deref())
        .collect();

    let schema = chunk_schema();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(content_hashes)),
            Arc::new(StringArray::from(source_ids)),
            Arc::new(StringArray::from(source_names)),
            Arc::new(StringArray::from(versions)),
            Arc::new(TimestampMicrosecondArray::from(created_ats).with_timezone("UTC")),
            Arc::new(StringArray::from(content_types)),
            Arc::new(Int64Array::from(file_sizes)),
            Arc::new(StringArray::from(file_hashes)),
            Arc::new(StringArray::from(texts)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(Int32Array::from(start_indices)),
            Arc::new(Int32Array::from(end_indices)),
            Arc::new(Int32Array::from(page_numbers)),
            Arc::new(StringArray::from(source_locations)),
        ],
    )?;

    Ok(batch)
}
