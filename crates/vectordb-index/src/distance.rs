//! Distance metrics.
//!
//! Every metric is oriented so that a smaller value means "more similar".
//! Dot product is negated for that reason.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Distance metric selected when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// `-(a·b)`
    Dot,
    /// `1 - a·b / (|a||b|)`
    Cosine,
    /// `sqrt(Σ(a_i - b_i)²)`
    Euclidean,
}

impl Distance {
    /// Distance between two vectors of equal length.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Distance::Dot => -dot(a, b),
            Distance::Cosine => cosine(a, b),
            Distance::Euclidean => euclidean(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Dot => "dot",
            Distance::Cosine => "cosine",
            Distance::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distance {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(Distance::Dot),
            "cosine" => Ok(Distance::Cosine),
            "euclidean" => Ok(Distance::Euclidean),
            other => Err(IndexError::InvalidParam(format!(
                "unknown distance metric '{other}' (expected dot, cosine or euclidean)"
            ))),
        }
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut ab, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        ab += x * y;
        aa += x * x;
        bb += y * y;
    }
    1.0 - ab / (aa.sqrt() * bb.sqrt())
}

#[inline]
fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
