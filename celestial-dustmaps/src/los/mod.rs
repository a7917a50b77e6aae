//! Memory-mapped line-of-sight (LOS) reddening maps.
//!
//! A LOS map stores, for every HEALPix pixel, the cumulative reddening
//! E(B-V) as a function of distance modulus: one best-fit curve plus a fixed
//! number of sample curves. The file has two contiguous sections:
//!
//! 1. **Header** (64 bytes) — magic, version, HEALPix parameters, curve layout
//! 2. **Pixel records** (`npix × record_bytes`) — in nested pixel order, each
//!    `(1 + n_samples) × n_distances` little-endian `f32` values: the best-fit
//!    curve followed by each sample curve
//!
//! Curves are sampled at `n_distances` evenly spaced distance moduli from
//! `dm_min` to `dm_max`. Pixels without coverage hold NaN.
//!
//! Open a map with [`LosMap::open`] and query it through [`DustMap`]. Build
//! new files with [`LosMapWriter`].

mod writer;

pub use writer::LosMapWriter;

use crate::healpix::{ang2pix_nest, npix};
use crate::{stats, DustMap, DustMapError, DustMapResult, GalacticCoord, QueryMode, QueryOptions};
use memmap2::Mmap;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const LOS_MAGIC: &[u8; 4] = b"DLOS";
const LOS_VERSION: u32 = 1;
const HEADER_SIZE: usize = 64;
const VALUE_SIZE: usize = std::mem::size_of::<f32>();
const MAX_ORDER: u32 = 29;

/// Metadata parsed from the first 64 bytes of a LOS map file.
#[derive(Debug, Clone, PartialEq)]
pub struct LosHeader {
    /// HEALPix order (nside = 2^order).
    pub order: u32,
    /// HEALPix nside parameter. Always `2.pow(order)`.
    pub nside: u32,
    /// Total number of pixels (`12 * nside * nside`).
    pub npix: u64,
    /// Number of distance-modulus bins per curve.
    pub n_distances: u32,
    /// Number of sample curves per pixel (may be zero).
    pub n_samples: u32,
    /// Distance modulus of the first bin.
    pub dm_min: f32,
    /// Distance modulus of the last bin.
    pub dm_max: f32,
}

impl LosHeader {
    pub fn new(
        order: u32,
        n_distances: u32,
        n_samples: u32,
        dm_min: f32,
        dm_max: f32,
    ) -> DustMapResult<Self> {
        if order > MAX_ORDER {
            return Err(DustMapError::map_format(format!(
                "HEALPix order {} exceeds maximum {}",
                order, MAX_ORDER
            )));
        }
        let nside = 1u32 << order;
        let header = Self {
            order,
            nside,
            npix: npix(order),
            n_distances,
            n_samples,
            dm_min,
            dm_max,
        };
        header.validate_layout()?;
        Ok(header)
    }

    /// Number of `f32` values in one pixel record, or `None` if that count
    /// does not fit in `usize`.
    pub fn record_len(&self) -> Option<usize> {
        (self.n_samples as usize)
            .checked_add(1)?
            .checked_mul(self.n_distances as usize)
    }

    pub fn record_bytes(&self) -> Option<usize> {
        self.record_len()?.checked_mul(VALUE_SIZE)
    }

    /// Total file size implied by the header, or `None` on overflow.
    pub fn file_len(&self) -> Option<usize> {
        usize::try_from(self.npix)
            .ok()?
            .checked_mul(self.record_bytes()?)?
            .checked_add(HEADER_SIZE)
    }

    /// Distance modulus at each curve bin.
    pub fn distance_moduli(&self) -> Vec<f64> {
        let n = self.n_distances as usize;
        let (lo, hi) = (self.dm_min as f64, self.dm_max as f64);
        if n == 1 {
            return vec![lo];
        }
        (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect()
    }

    pub(crate) fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(LOS_MAGIC);
        buf[4..8].copy_from_slice(&LOS_VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.order.to_le_bytes());
        buf[12..16].copy_from_slice(&self.nside.to_le_bytes());
        buf[16..24].copy_from_slice(&self.npix.to_le_bytes());
        buf[24..28].copy_from_slice(&self.n_distances.to_le_bytes());
        buf[28..32].copy_from_slice(&self.n_samples.to_le_bytes());
        buf[32..36].copy_from_slice(&self.dm_min.to_le_bytes());
        buf[36..40].copy_from_slice(&self.dm_max.to_le_bytes());
        buf
    }

    fn validate_layout(&self) -> DustMapResult<()> {
        if self.n_distances == 0 {
            return Err(DustMapError::map_format(
                "Map must have at least one distance bin",
            ));
        }
        if !self.dm_min.is_finite() || !self.dm_max.is_finite() {
            return Err(DustMapError::map_format(format!(
                "Distance modulus range must be finite, got [{}, {}]",
                self.dm_min, self.dm_max
            )));
        }
        if self.dm_max < self.dm_min || (self.n_distances > 1 && self.dm_max == self.dm_min) {
            return Err(DustMapError::map_format(format!(
                "Invalid distance modulus range [{}, {}] for {} bins",
                self.dm_min, self.dm_max, self.n_distances
            )));
        }
        if self.file_len().is_none() {
            return Err(DustMapError::map_format(format!(
                "Map layout overflows: {} pixels x {} distances x {} samples",
                self.npix, self.n_distances, self.n_samples
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LosHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HEALPix order: {}", self.order)?;
        writeln!(f, "nside: {}", self.nside)?;
        writeln!(f, "npix: {}", self.npix)?;
        writeln!(f, "Distance bins: {}", self.n_distances)?;
        writeln!(f, "Samples per pixel: {}", self.n_samples)?;
        write!(
            f,
            "Distance modulus range: {:.2} to {:.2}",
            self.dm_min, self.dm_max
        )
    }
}

/// Memory-mapped handle to a LOS reddening map.
///
/// Created by [`LosMap::open`]. The file stays mapped for the lifetime of
/// this value; pixel records are decoded on demand.
pub struct LosMap {
    mmap: Mmap,
    header: LosHeader,
    options: QueryOptions,
    rng: Mutex<StdRng>,
}

impl LosMap {
    /// Open and memory-map a LOS map file.
    ///
    /// `options.max_samples` caps how many sample curves the sample-based
    /// query modes look at.
    ///
    /// # Errors
    /// Returns an error if the options are invalid, the file cannot be
    /// opened, is too small, or has an invalid header.
    pub fn open(path: impl AsRef<Path>, options: QueryOptions) -> DustMapResult<Self> {
        options.validate()?;
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DustMapError::io(path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| DustMapError::io(path, e))?;

        if mmap.len() < HEADER_SIZE {
            return Err(DustMapError::map_format(format!(
                "Map file too small: {} bytes",
                mmap.len()
            )));
        }

        let header = parse_header(&mmap[..HEADER_SIZE])?;
        let expected_len = header
            .file_len()
            .ok_or_else(|| DustMapError::map_format("Map layout overflows"))?;
        if mmap.len() < expected_len {
            return Err(DustMapError::map_format(format!(
                "Map file too small for pixel data: {} bytes, expected at least {}",
                mmap.len(),
                expected_len
            )));
        }

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        debug!(
            path = %path.display(),
            order = header.order,
            n_distances = header.n_distances,
            n_samples = header.n_samples,
            "opened line-of-sight map"
        );

        Ok(Self {
            mmap,
            header,
            options,
            rng: Mutex::new(rng),
        })
    }

    pub fn header(&self) -> &LosHeader {
        &self.header
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// Number of sample curves the sample-based modes use.
    pub fn samples_in_use(&self) -> usize {
        let available = self.header.n_samples as usize;
        self.options
            .max_samples
            .map_or(available, |max| max.min(available))
    }

    /// Nested pixel index containing `coord`.
    pub fn pixel_for(&self, coord: &GalacticCoord) -> u64 {
        ang2pix_nest(
            self.header.order,
            coord.longitude_deg(),
            coord.latitude_deg(),
        )
    }

    /// Best-fit curve of a pixel, or `None` if the index is out of range.
    pub fn best_curve(&self, pixel: u64) -> Option<Vec<f32>> {
        self.curve(pixel, 0)
    }

    /// Sample curve `sample` of a pixel, or `None` if either index is out of
    /// range.
    pub fn sample_curve(&self, pixel: u64, sample: usize) -> Option<Vec<f32>> {
        if sample >= self.header.n_samples as usize {
            return None;
        }
        self.curve(pixel, sample + 1)
    }

    fn curve(&self, pixel: u64, slot: usize) -> Option<Vec<f32>> {
        if pixel >= self.header.npix {
            return None;
        }
        let n = self.header.n_distances as usize;
        let curve_bytes = n * VALUE_SIZE;
        let start = (pixel as usize)
            .checked_mul(self.header.record_bytes()?)?
            .checked_add(HEADER_SIZE + slot * curve_bytes)?;
        let bytes = self.mmap.get(start..start.checked_add(curve_bytes)?)?;
        Some(
            bytes
                .chunks_exact(VALUE_SIZE)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    fn reddening(&self, pixel: u64, slot: usize, dm: Option<f64>) -> f64 {
        match self.curve(pixel, slot) {
            Some(curve) => interpolate_curve(
                &curve,
                self.header.dm_min as f64,
                self.header.dm_max as f64,
                dm,
            ),
            None => f64::NAN,
        }
    }

    fn sample_values(&self, pixel: u64, dm: Option<f64>) -> Vec<f64> {
        (0..self.samples_in_use())
            .map(|i| self.reddening(pixel, i + 1, dm))
            .collect()
    }
}

impl DustMap for LosMap {
    fn query(&self, coords: &[GalacticCoord], mode: QueryMode) -> DustMapResult<Vec<f64>> {
        mode.validate()?;
        let n_used = self.samples_in_use();
        if mode.uses_samples() && n_used == 0 {
            return Err(DustMapError::invalid_query(format!(
                "Mode '{}' needs samples, but the map only has a best-fit curve",
                mode
            )));
        }

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut pixel_draws: HashMap<u64, usize> = HashMap::new();

        let values = coords
            .iter()
            .map(|coord| {
                let pixel = self.pixel_for(coord);
                let dm = coord.distance().map(|d| d.distance_modulus());
                match mode {
                    QueryMode::Best => self.reddening(pixel, 0, dm),
                    QueryMode::Median => stats::median(&self.sample_values(pixel, dm)),
                    QueryMode::Mean => stats::mean(&self.sample_values(pixel, dm)),
                    QueryMode::Percentile(p) => {
                        stats::percentile(&self.sample_values(pixel, dm), p)
                    }
                    QueryMode::RandomSample => {
                        let draw = rng.random_range(0..n_used);
                        self.reddening(pixel, draw + 1, dm)
                    }
                    QueryMode::RandomSamplePerPix => {
                        let draw = *pixel_draws
                            .entry(pixel)
                            .or_insert_with(|| rng.random_range(0..n_used));
                        self.reddening(pixel, draw + 1, dm)
                    }
                }
            })
            .collect();

        Ok(values)
    }

    fn query_samples(&self, coords: &[GalacticCoord]) -> DustMapResult<Array2<f64>> {
        let n_used = self.samples_in_use();
        let mut out = Array2::from_elem((coords.len(), n_used), f64::NAN);
        for (row, coord) in coords.iter().enumerate() {
            let pixel = self.pixel_for(coord);
            let dm = coord.distance().map(|d| d.distance_modulus());
            for (col, value) in self.sample_values(pixel, dm).into_iter().enumerate() {
                out[[row, col]] = value;
            }
        }
        Ok(out)
    }
}

/// Cumulative reddening at distance modulus `dm` along one curve.
///
/// Linear in distance modulus between bins. Past the last bin the last value
/// holds; before the first bin the first value is scaled by `d / d_min`.
/// Without a distance the last value (the whole sightline) is returned.
fn interpolate_curve(curve: &[f32], dm_min: f64, dm_max: f64, dm: Option<f64>) -> f64 {
    let n = curve.len();
    if n == 0 {
        return f64::NAN;
    }
    let last = curve[n - 1] as f64;
    let Some(dm) = dm else {
        return last;
    };

    if dm < dm_min {
        let scale = 10.0_f64.powf((dm - dm_min) / 5.0);
        return curve[0] as f64 * scale;
    }
    if dm >= dm_max || n == 1 {
        return last;
    }

    let x = (dm - dm_min) / (dm_max - dm_min) * (n - 1) as f64;
    let i = (libm::floor(x) as usize).min(n - 2);
    let frac = x - i as f64;
    let (a, b) = (curve[i] as f64, curve[i + 1] as f64);
    a + (b - a) * frac
}

fn parse_header(bytes: &[u8]) -> DustMapResult<LosHeader> {
    let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
    let u32_at = |i: usize| u32::from_le_bytes(word(i));
    let f32_at = |i: usize| f32::from_le_bytes(word(i));

    let magic = &bytes[0..4];
    if magic != LOS_MAGIC {
        return Err(DustMapError::map_format(format!(
            "Invalid map magic: expected {:?}, got {:?}",
            LOS_MAGIC, magic
        )));
    }

    let version = u32_at(4);
    if version != LOS_VERSION {
        return Err(DustMapError::map_format(format!(
            "Unsupported map version: expected {}, got {}",
            LOS_VERSION, version
        )));
    }

    let order = u32_at(8);
    let nside = u32_at(12);
    let mut npix_bytes = [0u8; 8];
    npix_bytes.copy_from_slice(&bytes[16..24]);
    let file_npix = u64::from_le_bytes(npix_bytes);

    if order > MAX_ORDER {
        return Err(DustMapError::map_format(format!(
            "HEALPix order {} exceeds maximum {}",
            order, MAX_ORDER
        )));
    }
    let expected_nside = 1u32 << order;
    if nside != expected_nside {
        return Err(DustMapError::map_format(format!(
            "Inconsistent nside: order {} implies nside {}, got {}",
            order, expected_nside, nside
        )));
    }
    let expected_npix = npix(order);
    if file_npix != expected_npix {
        return Err(DustMapError::map_format(format!(
            "Inconsistent npix: nside {} implies npix {}, got {}",
            nside, expected_npix, file_npix
        )));
    }

    LosHeader::new(order, u32_at(24), u32_at(28), f32_at(32), f32_at(36))
}
