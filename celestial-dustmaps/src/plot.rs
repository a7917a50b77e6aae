//! All-sky reddening plots.
//!
//! [`SkyPlot`] queries a [`DustMap`] on a regular (l, b) grid at a fixed
//! distance, scales the result to gray levels and writes a PNG. The defaults
//! reproduce the classic 5°-resolution all-sky view of median reddening out
//! to 5 kpc, displayed over E(B-V) ∈ [0, 1.5].

use crate::render::{self, ColorScale};
use crate::{
    AxisRange, CoordGrid, Distance, DustMap, DustMapError, DustMapResult, QueryMode, StdPaths,
};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_FILE_NAME: &str = "bayestar.png";
pub const DEFAULT_STEP_DEG: f64 = 5.0;
pub const DEFAULT_DISTANCE_KPC: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SkyPlot {
    pub longitude: AxisRange,
    pub latitude: AxisRange,
    /// Distance out to which reddening is integrated. `None` uses the whole
    /// sightline.
    pub distance: Option<Distance>,
    pub mode: QueryMode,
    pub scale: ColorScale,
    pub file_name: String,
}

impl SkyPlot {
    /// A full-sky plot sampled every `step_deg` degrees in both l and b.
    pub fn all_sky(step_deg: f64) -> DustMapResult<Self> {
        // The extra 0.1° keeps the closing edge (l = 180°, b = 90°) in range.
        let longitude = AxisRange::new(-180.0, 180.1, step_deg)?;
        let latitude = AxisRange::new(-90.0, 90.1, step_deg)?;
        Ok(Self {
            longitude,
            latitude,
            distance: Some(Distance::from_kiloparsecs(DEFAULT_DISTANCE_KPC)?),
            mode: QueryMode::Median,
            scale: ColorScale::default(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        })
    }

    pub fn grid(&self) -> DustMapResult<CoordGrid> {
        CoordGrid::new(&self.longitude, &self.latitude, self.distance)
    }

    /// Queries the map on the plot grid. Shape is `(latitudes, longitudes)`
    /// with the southernmost row first.
    pub fn query<M: DustMap + ?Sized>(&self, map: &M) -> DustMapResult<Array2<f64>> {
        map.query_grid(&self.grid()?, self.mode)
    }

    /// Queries the map and converts the result to display orientation:
    /// north up and longitude increasing to the left.
    pub fn render<M: DustMap + ?Sized>(&self, map: &M) -> DustMapResult<Array2<u8>> {
        let reddening = self.query(map)?;
        let flipped = render::flip_both(&reddening);
        render::normalize(&flipped, self.scale.vmin, self.scale.vmax)
    }

    /// Renders the plot and saves it to `path`, creating parent directories.
    pub fn save_to<M: DustMap + ?Sized>(&self, map: &M, path: &Path) -> DustMapResult<()> {
        let pixels = self.render(map)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DustMapError::io(parent, e))?;
        }
        render::save_png(&pixels, path)?;

        let (rows, cols) = pixels.dim();
        info!(
            path = %path.display(),
            width = cols,
            height = rows,
            mode = %self.mode,
            "saved reddening plot"
        );
        Ok(())
    }

    /// Renders the plot into `paths.output_dir()` under `file_name` and
    /// returns the written path.
    pub fn run<M: DustMap + ?Sized>(&self, map: &M, paths: &StdPaths) -> DustMapResult<PathBuf> {
        let path = paths.ensure_output_dir()?.join(&self.file_name);
        self.save_to(map, &path)?;
        Ok(path)
    }
}

impl Default for SkyPlot {
    fn default() -> Self {
        Self {
            longitude: AxisRange::from_parts(-180.0, 180.1, DEFAULT_STEP_DEG),
            latitude: AxisRange::from_parts(-90.0, 90.1, DEFAULT_STEP_DEG),
            distance: Distance::from_kiloparsecs(DEFAULT_DISTANCE_KPC).ok(),
            mode: QueryMode::Median,
            scale: ColorScale::default(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}
