//! Dense row-major embedding matrix and the normalization rule shared by
//! stored and query vectors.

use serde::{Deserialize, Serialize};

use helpdesk_core::error::{Error, Result};

/// Added to the L2 norm before dividing; keeps the zero vector finite.
pub const NORM_EPSILON: f32 = 1e-12;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// In-place `v / (||v||₂ + ε)`.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = dot(v, v).sqrt() + NORM_EPSILON;
    for x in v.iter_mut() { *x /= norm; }
}

/// `rows × dim` f32 values, one embedding per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn from_rows(rows: Vec<Vec<f32>>, dim: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in &rows {
            if row.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: row.len() });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), dim, data })
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn dim(&self) -> usize { self.dim }
    pub fn is_empty(&self) -> bool { self.rows == 0 }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn normalize_rows(&mut self) {
        if self.dim == 0 { return; }
        for row in self.data.chunks_mut(self.dim) { l2_normalize(row); }
    }

    /// Checks the shape recorded alongside the data (e.g. after deserializing).
    pub fn validate(&self) -> Result<()> {
        if self.data.len() != self.rows * self.dim {
            return Err(Error::Serialization(format!(
                "matrix holds {} values, expected {} x {}",
                self.data.len(), self.rows, self.dim
            )));
        }
        Ok(())
    }
}
