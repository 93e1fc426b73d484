use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const COL_SEQ: &str = "seq";
pub const COL_ID: &str = "id";
pub const COL_RECORD_ID: &str = "record_id";
pub const COL_CHUNK_INDEX: &str = "chunk_index";
pub const COL_TEXT: &str = "text";
pub const COL_METADATA: &str = "metadata";
pub const COL_VECTOR: &str = "vector";

/// Chunk table. `seq` is the insertion position used to break distance ties;
/// `metadata` holds the sanitized metadata map as JSON.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(COL_SEQ, DataType::Int64, false),
        Field::new(COL_ID, DataType::Utf8, false),
        Field::new(COL_RECORD_ID, DataType::Utf8, false),
        Field::new(COL_CHUNK_INDEX, DataType::Int32, false),
        Field::new(COL_TEXT, DataType::Utf8, false),
        Field::new(COL_METADATA, DataType::Utf8, false),
        Field::new(COL_VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

/// Vector width declared by a chunk table schema.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
    match schema.field_with_name(COL_VECTOR).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => Some(*n),
        _ => None,
    }
}

// Key/value table recording what an index was built with
pub fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_round_trips_through_schema() {
        assert_eq!(vector_dim(&build_arrow_schema(384)), Some(384));
        assert_eq!(vector_dim(&build_meta_schema()), None);
    }
}
