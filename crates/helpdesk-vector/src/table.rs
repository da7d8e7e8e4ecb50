//! LanceDB helpers for the accelerated search table.
//!
//! The table mirrors the embedding matrix: one `(row_id, vector)` record per
//! matrix row, written in row order.

use anyhow::Result;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator};
use lancedb::{connect, Connection, Table};
use std::path::Path;
use std::sync::Arc;

use crate::matrix::Matrix;
use crate::schema::build_vectors_schema;

pub const VECTORS_TABLE: &str = "chunks";
const WRITE_BATCH_ROWS: usize = 1000;

pub async fn open_db(path: &Path) -> Result<Connection> {
    Ok(connect(path.to_string_lossy().as_ref()).execute().await?)
}

pub async fn write_vectors_table(conn: &Connection, name: &str, matrix: &Matrix) -> Result<Table> {
    let dim = i32::try_from(matrix.dim())?;
    let schema = build_vectors_schema(dim);
    let mut batches = Vec::new();
    let mut start = 0usize;
    while start < matrix.rows() {
        let end = (start + WRITE_BATCH_ROWS).min(matrix.rows());
        batches.push(rows_to_record_batch(matrix, start, end, dim));
        start = end;
    }
    let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
    Ok(conn.create_table(name, reader).execute().await?)
}

pub async fn open_vectors_table(conn: &Connection, name: &str) -> Result<Table> {
    Ok(conn.open_table(name).execute().await?)
}

fn rows_to_record_batch(matrix: &Matrix, start: usize, end: usize, dim: i32) -> std::result::Result<RecordBatch, arrow_schema::ArrowError> {
    let mut row_ids = Vec::with_capacity(end - start);
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(end - start);
    for i in start..end {
        let row_id = i32::try_from(i).map_err(|e| arrow_schema::ArrowError::InvalidArgumentError(e.to_string()))?;
        row_ids.push(row_id);
        vectors.push(Some(matrix.row(i).iter().map(|&x| Some(x)).collect()));
    }
    RecordBatch::try_new(build_vectors_schema(dim), vec![
        Arc::new(Int32Array::from(row_ids)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
    ])
}
