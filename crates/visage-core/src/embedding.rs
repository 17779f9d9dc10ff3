use serde::{Deserialize, Serialize};

use crate::errors::EnrollError;

/// Guard against a zero denominator when one vector has zero norm.
const NORM_EPSILON: f32 = 1e-6;

/// A fixed-length face feature vector produced by the detector.
/// Immutable once constructed; dimensionality is whatever the detector
/// emits (512 for the reference model).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Cosine similarity between two embeddings, in [-1, 1].
///
/// Pure and deterministic. The epsilon in the denominator keeps the result
/// finite when either vector has zero norm (degenerate detector output).
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> Result<f32, EnrollError> {
    if a.dims() != b.dims() {
        return Err(EnrollError::DimensionMismatch {
            left: a.dims(),
            right: b.dims(),
        });
    }

    let dot: f32 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| x * y)
        .sum();

    Ok(dot / (a.norm() * b.norm() + NORM_EPSILON))
}
