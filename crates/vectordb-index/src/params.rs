//! Construction and search parameters.
//!
//! Each index kind has its own typed parameter struct. Unknown keys are
//! rejected at deserialization time and value ranges are checked by
//! `validate`, so a bad collection definition fails before any index is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IndexError;

/// Beam width used when a search does not supply `ef`.
pub const DEFAULT_EF: usize = 64;

/// Largest accepted search beam width.
pub const MAX_EF: usize = 1 << 16;

const DEFAULT_MAX_SIZE: usize = 1_000_000;

fn default_ef_construction() -> usize {
    64
}

fn default_m_max() -> usize {
    32
}

fn default_heuristic() -> bool {
    true
}

fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

/// HNSW construction parameters.
///
/// Accepts both snake_case keys and the compact spellings
/// (`efconstruction`, `mmax`, `maxsize`) used by older collection definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HnswParams {
    /// Beam width while linking a new node
    #[serde(
        default = "default_ef_construction",
        alias = "efconstruction",
        alias = "efConstruction"
    )]
    pub ef_construction: usize,

    /// Neighbors selected per layer (`m`); layer 0 keeps up to twice this
    #[serde(default = "default_m_max", alias = "mmax", alias = "mMax", alias = "m")]
    pub m_max: usize,

    /// Use the diversity heuristic instead of plain top-m selection
    #[serde(default = "default_heuristic")]
    pub heuristic: bool,

    /// Let the heuristic also consider candidates' own neighbors
    #[serde(default)]
    pub extend: bool,

    /// Hard cap on live vectors
    #[serde(default = "default_max_size", alias = "maxsize", alias = "maxSize")]
    pub max_size: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            ef_construction: default_ef_construction(),
            m_max: default_m_max(),
            heuristic: default_heuristic(),
            extend: false,
            max_size: default_max_size(),
        }
    }
}

impl HnswParams {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    pub fn with_m(mut self, m: usize) -> Self {
        self.m_max = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_heuristic(mut self, heuristic: bool) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_extend(mut self, extend: bool) -> Self {
        self.extend = extend;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.ef_construction == 0 {
            return Err(IndexError::InvalidParam(
                "ef_construction must be greater than 0".to_string(),
            ));
        }
        // ml = 1/ln(m) is infinite for m = 1
        if self.m_max < 2 {
            return Err(IndexError::InvalidParam(format!(
                "m_max must be at least 2, got {}",
                self.m_max
            )));
        }
        if self.max_size == 0 {
            return Err(IndexError::InvalidParam(
                "max_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flat (brute-force) index parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatParams {
    #[serde(default = "default_max_size", alias = "maxsize", alias = "maxSize")]
    pub max_size: usize,
}

impl Default for FlatParams {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
        }
    }
}

impl FlatParams {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.max_size == 0 {
            return Err(IndexError::InvalidParam(
                "max_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which index a collection uses, with its parameters.
///
/// Serialized as `{"index_type": "hnsw", "index_params": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "index_type", content = "index_params", rename_all = "lowercase")]
pub enum IndexSpec {
    Flat(FlatParams),
    Hnsw(HnswParams),
}

impl IndexSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            IndexSpec::Flat(_) => "flat",
            IndexSpec::Hnsw(_) => "hnsw",
        }
    }

    pub fn max_size(&self) -> usize {
        match self {
            IndexSpec::Flat(p) => p.max_size,
            IndexSpec::Hnsw(p) => p.max_size,
        }
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        match self {
            IndexSpec::Flat(p) => p.validate(),
            IndexSpec::Hnsw(p) => p.validate(),
        }
    }
}

/// Per-query search options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Beam width; `None` means the index default
    pub ef: Option<usize>,
}

impl SearchParams {
    pub fn with_ef(ef: usize) -> Self {
        Self { ef: Some(ef) }
    }

    /// Parse search options from a JSON object such as `{"ef": 32}`.
    ///
    /// `ef` may be an integer or a float (truncated). Unknown keys are
    /// ignored so other index kinds can share the same request shape.
    pub fn from_json(value: Option<&Value>) -> Result<Self, IndexError> {
        let map = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(IndexError::InvalidParam(
                    "search params must be an object".to_string(),
                ))
            }
        };

        let ef = match map.get("ef") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => {
                let ef = if let Some(v) = n.as_u64() {
                    v
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() && f >= 0.0 => f.trunc() as u64,
                        _ => {
                            return Err(IndexError::InvalidParam(format!(
                                "ef must be a positive number, got {n}"
                            )))
                        }
                    }
                };
                Some(usize::try_from(ef).unwrap_or(usize::MAX))
            }
            Some(_) => {
                return Err(IndexError::InvalidParam(
                    "ef parameter must be a number".to_string(),
                ))
            }
        };

        let params = Self { ef };
        params.effective_ef(DEFAULT_EF)?;
        Ok(params)
    }

    /// The beam width to use, validated against `1..=MAX_EF`.
    pub fn effective_ef(&self, default: usize) -> Result<usize, IndexError> {
        let ef = self.ef.unwrap_or(default);
        if ef == 0 || ef > MAX_EF {
            return Err(IndexError::InvalidParam(format!(
                "ef must be between 1 and {MAX_EF}, got {ef}"
            )));
        }
        Ok(ef)
    }
}
