use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ROW_ID_COLUMN: &str = "row_id";
pub const VECTOR_COLUMN: &str = "vector";

/// `row_id` ties each vector back to its row in the embedding matrix.
pub fn build_vectors_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ROW_ID_COLUMN, DataType::Int32, false),
        Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
