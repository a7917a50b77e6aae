//! Regular longitude/latitude grids for map queries.
//!
//! [`AxisRange`] produces evenly spaced samples on a half-open interval, and
//! [`CoordGrid`] combines a longitude axis and a latitude axis into a 2D mesh.
//! Rows run over latitude, columns over longitude, so a grid has shape
//! `(latitudes, longitudes)` and its coordinates are listed row by row.

use crate::{Distance, DustMapError, DustMapResult, GalacticCoord};

/// Upper bound on the number of samples along one axis.
pub const MAX_AXIS_LEN: usize = 1 << 20;

/// Evenly spaced values `start, start + step, ...` strictly below `stop`.
///
/// Only [`AxisRange::new`] builds one, so every range is finite, non-empty
/// and at most [`MAX_AXIS_LEN`] long.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    start: f64,
    stop: f64,
    step: f64,
}

impl AxisRange {
    pub fn new(start: f64, stop: f64, step: f64) -> DustMapResult<Self> {
        if !start.is_finite() || !stop.is_finite() || !step.is_finite() {
            return Err(DustMapError::invalid_grid(format!(
                "Axis bounds must be finite: start={}, stop={}, step={}",
                start, stop, step
            )));
        }
        if step <= 0.0 {
            return Err(DustMapError::invalid_grid(format!(
                "Axis step must be positive, got {}",
                step
            )));
        }
        if stop <= start {
            return Err(DustMapError::invalid_grid(format!(
                "Axis stop ({}) must exceed start ({})",
                stop, start
            )));
        }
        let count = libm::ceil((stop - start) / step);
        if count > MAX_AXIS_LEN as f64 {
            return Err(DustMapError::invalid_grid(format!(
                "Axis from {} to {} by {} has more than {} samples",
                start, stop, step, MAX_AXIS_LEN
            )));
        }
        Ok(Self { start, stop, step })
    }

    /// Range with bounds already known to be valid.
    pub(crate) const fn from_parts(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        libm::ceil((self.stop - self.start) / self.step) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// A meshgrid of galactic coordinates sharing one optional distance.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordGrid {
    longitudes: Vec<f64>,
    latitudes: Vec<f64>,
    distance: Option<Distance>,
}

impl CoordGrid {
    /// Builds a grid from two axes.
    ///
    /// # Errors
    /// Returns `DustMapError::InvalidGrid` if any latitude falls outside
    /// [−90°, 90°].
    pub fn new(
        longitude: &AxisRange,
        latitude: &AxisRange,
        distance: Option<Distance>,
    ) -> DustMapResult<Self> {
        Self::from_values(longitude.values(), latitude.values(), distance)
    }

    pub fn from_values(
        longitudes: Vec<f64>,
        latitudes: Vec<f64>,
        distance: Option<Distance>,
    ) -> DustMapResult<Self> {
        if longitudes.is_empty() || latitudes.is_empty() {
            return Err(DustMapError::invalid_grid("Grid axes must not be empty"));
        }
        if let Some(b) = latitudes
            .iter()
            .find(|b| !b.is_finite() || !(-90.0..=90.0).contains(*b))
        {
            return Err(DustMapError::invalid_grid(format!(
                "Grid latitude {} outside [-90, 90] degrees",
                b
            )));
        }
        if let Some(l) = longitudes.iter().find(|l| !l.is_finite()) {
            return Err(DustMapError::invalid_grid(format!(
                "Grid longitude {} is not finite",
                l
            )));
        }
        Ok(Self {
            longitudes,
            latitudes,
            distance,
        })
    }

    /// `(rows, cols)` = `(latitudes, longitudes)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.latitudes.len(), self.longitudes.len())
    }

    pub fn len(&self) -> usize {
        self.latitudes.len() * self.longitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn distance(&self) -> Option<Distance> {
        self.distance
    }

    /// All grid points in row-major order.
    pub fn coords(&self) -> DustMapResult<Vec<GalacticCoord>> {
        let mut coords = Vec::with_capacity(self.len());
        for &b in &self.latitudes {
            for &l in &self.longitudes {
                let mut coord = GalacticCoord::new(l, b)?;
                coord.set_distance(self.distance);
                coords.push(coord);
            }
        }
        Ok(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_matches_half_open_range() {
        let lon = AxisRange::new(-180.0, 180.1, 5.0).unwrap();
        assert_eq!(lon.len(), 73);
        let values = lon.values();
        assert_eq!(values[0], -180.0);
        assert_eq!(values[72], 180.0);

        let lat = AxisRange::new(-90.0, 90.1, 5.0).unwrap();
        assert_eq!(lat.len(), 37);
        assert_eq!(lat.values()[36], 90.0);
    }

    #[test]
    fn test_axis_excludes_stop() {
        let axis = AxisRange::new(0.0, 10.0, 5.0).unwrap();
        assert_eq!(axis.values(), vec![0.0, 5.0]);
    }

    #[test]
    fn test_axis_validation() {
        assert!(AxisRange::new(0.0, 10.0, 0.0).is_err());
        assert!(AxisRange::new(0.0, 10.0, -1.0).is_err());
        assert!(AxisRange::new(10.0, 10.0, 1.0).is_err());
        assert!(AxisRange::new(f64::NAN, 10.0, 1.0).is_err());
    }

    #[test]
    fn test_axis_rejects_oversized_range() {
        let err = AxisRange::new(0.0, 1e9, 1e-9).unwrap_err();
        assert!(matches!(err, DustMapError::InvalidGrid { .. }), "{:?}", err);
        assert!(AxisRange::new(0.0, 1e300, f64::MIN_POSITIVE).is_err());
        assert!(AxisRange::new(0.0, MAX_AXIS_LEN as f64, 1.0).is_ok());
    }

    #[test]
    fn test_axis_accessors() {
        let axis = AxisRange::new(-90.0, 90.1, 5.0).unwrap();
        assert_eq!(axis.start(), -90.0);
        assert_eq!(axis.stop(), 90.1);
        assert_eq!(axis.step(), 5.0);
    }

    #[test]
    fn test_grid_shape_and_order() {
        let lon = AxisRange::new(0.0, 30.0, 10.0).unwrap();
        let lat = AxisRange::new(-10.0, 20.0, 10.0).unwrap();
        let d = Distance::from_kiloparsecs(2.0).unwrap();
        let grid = CoordGrid::new(&lon, &lat, Some(d)).unwrap();

        assert_eq!(grid.shape(), (3, 3));
        let coords = grid.coords().unwrap();
        assert_eq!(coords.len(), 9);

        // First row: lowest latitude, increasing longitude.
        assert_eq!(coords[0].latitude_deg(), -10.0);
        assert_eq!(coords[1].longitude_deg(), 10.0);
        assert_eq!(coords[1].latitude_deg(), -10.0);
        assert_eq!(coords[3].latitude_deg(), 0.0);
        assert_eq!(coords[3].longitude_deg(), 0.0);
        assert!(coords.iter().all(|c| c.distance() == Some(d)));
    }

    #[test]
    fn test_grid_rejects_polar_overflow() {
        let lon = AxisRange::new(0.0, 10.0, 5.0).unwrap();
        let lat = AxisRange::new(80.0, 100.0, 5.0).unwrap();
        let err = CoordGrid::new(&lon, &lat, None).unwrap_err();
        assert!(err.to_string().contains("outside [-90, 90]"));
    }
}
