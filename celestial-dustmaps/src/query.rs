//! The dust map query contract.
//!
//! Any reddening engine plugs into the crate by implementing [`DustMap`]:
//! given a batch of galactic coordinates and a [`QueryMode`], return one
//! E(B-V) value per coordinate. Grid queries and plotting are built on top of
//! that single operation.

use crate::{CoordGrid, DustMapError, DustMapResult, GalacticCoord};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the per-sample reddening estimates are reduced to one value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QueryMode {
    /// Median over samples.
    #[default]
    Median,
    /// Mean over samples.
    Mean,
    /// Best-fit (maximum-probability) estimate.
    Best,
    /// One randomly drawn sample per coordinate.
    RandomSample,
    /// One randomly drawn sample per map pixel, shared by every coordinate
    /// that falls in that pixel.
    RandomSamplePerPix,
    /// Percentile over samples, in [0, 100].
    Percentile(f64),
}

impl QueryMode {
    pub fn percentile(p: f64) -> DustMapResult<Self> {
        let mode = Self::Percentile(p);
        mode.validate()?;
        Ok(mode)
    }

    pub fn validate(&self) -> DustMapResult<()> {
        if let Self::Percentile(p) = *self {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(DustMapError::invalid_query(format!(
                    "Percentile must be within [0, 100], got {}",
                    p
                )));
            }
        }
        Ok(())
    }

    /// Whether the mode reduces over samples (as opposed to `Best`).
    pub fn uses_samples(&self) -> bool {
        !matches!(self, Self::Best)
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Median => write!(f, "median"),
            Self::Mean => write!(f, "mean"),
            Self::Best => write!(f, "best"),
            Self::RandomSample => write!(f, "random_sample"),
            Self::RandomSamplePerPix => write!(f, "random_sample_per_pix"),
            Self::Percentile(p) => write!(f, "percentile:{}", p),
        }
    }
}

impl FromStr for QueryMode {
    type Err = DustMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let mode = match lower.as_str() {
            "median" => Self::Median,
            "mean" => Self::Mean,
            "best" => Self::Best,
            "random_sample" => Self::RandomSample,
            "random_sample_per_pix" => Self::RandomSamplePerPix,
            other => {
                let value = other
                    .strip_prefix("percentile:")
                    .or_else(|| other.strip_prefix('p'))
                    .ok_or_else(|| {
                        DustMapError::invalid_query(format!("Unknown query mode '{}'", s))
                    })?;
                let p: f64 = value.parse().map_err(|_| {
                    DustMapError::invalid_query(format!("Cannot parse percentile in '{}'", s))
                })?;
                return Self::percentile(p);
            }
        };
        Ok(mode)
    }
}

/// Parameters fixed when a map is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Use at most this many samples per pixel. `None` uses all of them.
    pub max_samples: Option<usize>,
    /// Seed for the random query modes. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl QueryOptions {
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            max_samples: Some(max_samples),
            seed: None,
        }
    }

    pub fn validate(&self) -> DustMapResult<()> {
        if self.max_samples == Some(0) {
            return Err(DustMapError::invalid_query(
                "max_samples must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A queryable reddening map.
pub trait DustMap {
    /// Reddening at each coordinate, in input order.
    ///
    /// Coordinates outside the map's coverage yield NaN.
    fn query(&self, coords: &[GalacticCoord], mode: QueryMode) -> DustMapResult<Vec<f64>>;

    /// Every sample at each coordinate, shaped `(coords, samples)`.
    fn query_samples(&self, coords: &[GalacticCoord]) -> DustMapResult<Array2<f64>> {
        let _ = coords;
        Err(DustMapError::unsupported_operation(
            "this map does not expose individual samples",
        ))
    }

    /// Queries every point of `grid`, returning an array of the grid's shape.
    fn query_grid(&self, grid: &CoordGrid, mode: QueryMode) -> DustMapResult<Array2<f64>> {
        let coords = grid.coords()?;
        let values = self.query(&coords, mode)?;
        if values.len() != coords.len() {
            return Err(DustMapError::ShapeMismatch {
                expected: coords.len(),
                got: values.len(),
            });
        }
        Array2::from_shape_vec(grid.shape(), values)
            .map_err(|e| DustMapError::invalid_grid(e.to_string()))
    }
}
