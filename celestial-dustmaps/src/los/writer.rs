//! In-memory builder for LOS map files.

use super::{LosHeader, HEADER_SIZE, VALUE_SIZE};
use crate::{DustMapError, DustMapResult};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Accumulates pixel curves and serializes them in the LOS map layout.
///
/// Every pixel starts out NaN (no coverage). The whole map is held in
/// memory, so this is meant for modest orders.
pub struct LosMapWriter {
    header: LosHeader,
    record_len: usize,
    values: Vec<f32>,
}

impl LosMapWriter {
    pub fn new(
        order: u32,
        n_distances: u32,
        n_samples: u32,
        dm_min: f32,
        dm_max: f32,
    ) -> DustMapResult<Self> {
        let header = LosHeader::new(order, n_distances, n_samples, dm_min, dm_max)?;
        let too_large = || {
            DustMapError::map_format(format!(
                "Map with {} pixels is too large to build in memory",
                header.npix
            ))
        };
        let record_len = header.record_len().ok_or_else(too_large)?;
        let len = usize::try_from(header.npix)
            .ok()
            .and_then(|npix| npix.checked_mul(record_len))
            .ok_or_else(too_large)?;
        Ok(Self {
            header,
            record_len,
            values: vec![f32::NAN; len],
        })
    }

    pub fn header(&self) -> &LosHeader {
        &self.header
    }

    /// Sets the best-fit and sample curves of one pixel.
    ///
    /// # Errors
    /// Fails if the pixel is out of range or the curve lengths do not match
    /// the header.
    pub fn set_pixel(
        &mut self,
        pixel: u64,
        best: &[f32],
        samples: &[Vec<f32>],
    ) -> DustMapResult<()> {
        if pixel >= self.header.npix {
            return Err(DustMapError::map_format(format!(
                "Pixel {} out of range for npix {}",
                pixel, self.header.npix
            )));
        }
        self.check_curves(best, samples)?;

        let record_len = self.record_len;
        let start = pixel as usize * record_len;
        let record = &mut self.values[start..start + record_len];
        let n = self.header.n_distances as usize;

        record[..n].copy_from_slice(best);
        for (i, sample) in samples.iter().enumerate() {
            let offset = (i + 1) * n;
            record[offset..offset + n].copy_from_slice(sample);
        }
        Ok(())
    }

    /// Sets the same curves on every pixel.
    pub fn fill(&mut self, best: &[f32], samples: &[Vec<f32>]) -> DustMapResult<()> {
        for pixel in 0..self.header.npix {
            self.set_pixel(pixel, best, samples)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.values.len() * VALUE_SIZE);
        buf.extend_from_slice(&self.header.to_bytes());
        for value in &self.values {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        debug_assert_eq!(Some(buf.len()), self.header.file_len());
        buf
    }

    pub fn write(&self, path: impl AsRef<Path>) -> DustMapResult<()> {
        let path = path.as_ref();
        let mut file = std::fs::File::create(path).map_err(|e| DustMapError::io(path, e))?;
        file.write_all(&self.to_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| DustMapError::io(path, e))?;
        debug!(
            path = %path.display(),
            bytes = self.values.len() * VALUE_SIZE,
            "wrote line-of-sight map"
        );
        Ok(())
    }

    fn check_curves(&self, best: &[f32], samples: &[Vec<f32>]) -> DustMapResult<()> {
        let n = self.header.n_distances as usize;
        if best.len() != n {
            return Err(DustMapError::map_format(format!(
                "Best-fit curve has {} values, expected {}",
                best.len(),
                n
            )));
        }
        if samples.len() != self.header.n_samples as usize {
            return Err(DustMapError::map_format(format!(
                "Got {} sample curves, expected {}",
                samples.len(),
                self.header.n_samples
            )));
        }
        if let Some(bad) = samples.iter().find(|s| s.len() != n) {
            return Err(DustMapError::map_format(format!(
                "Sample curve has {} values, expected {}",
                bad.len(),
                n
            )));
        }
        Ok(())
    }
}
