use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, TimeUnit};

/// The fixed 15-column chunk archive schema. Column order and nullability
/// match the on-disk contract exactly; every chunk row carries its source
/// metadata so a file is interpretable without the index.
pub fn chunk_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content_hash", DataType::Utf8, false),
        Field::new("source_id", DataType::Utf8, false),
        Field::new("source_name", DataType::Utf8, false),
        Field::new("version", DataType::Utf8, false),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("source_content_type", DataType::Utf8, true),
        Field::new("source_file_size", DataType::Int64, true),
        Field::new("source_file_hash", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("start_index", DataType::Int32, true),
        Field::new("end_index", DataType::Int32, true),
        Field::new("page_number", DataType::Int32, true),
        Field::new("source_location", DataType::Utf8, true),
    ]))
}

/// Column names the reader requires to be present; any other column in the
/// file is tolerated and ignored.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "content_hash",
    "source_id",
    "source_name",
    "version",
    "created_at",
    "text",
    "chunk_index",
];
