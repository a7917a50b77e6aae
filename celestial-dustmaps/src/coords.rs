//! Galactic sky coordinates with optional distance.
//!
//! Dust maps are indexed by galactic longitude `l` and latitude `b`. Points
//! given in equatorial (ICRS) coordinates are rotated into the galactic frame
//! with [`GalacticCoord::from_equatorial`].

use crate::{DustMapError, DustMapResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rotation matrix from ICRS to the galactic frame (rows are the galactic
/// x, y, z axes expressed in ICRS).
///
/// Derived from the IAU 1958 definition: north galactic pole at
/// RA = 192.859508°, Dec = 27.128336°, and l = 0 towards
/// RA = 266.405°, Dec = −28.936°.
#[allow(clippy::excessive_precision)]
pub(crate) const ICRS_TO_GALACTIC: [[f64; 3]; 3] = [
    [
        -0.054875560416215368492398900454,
        -0.873437090234885048760383168409,
        -0.483835015548713226831774175116,
    ],
    [
        0.494109427875583673525222371358,
        -0.444829629960011178146614061616,
        0.746982244497218890527388004556,
    ],
    [
        -0.867666149019004701181616534570,
        -0.198076373431201528180486091412,
        0.455983776175066922272100478348,
    ],
];

const PC_PER_KPC: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Distance {
    parsecs: f64,
}

impl Distance {
    /// Creates a Distance from parsecs.
    ///
    /// # Errors
    /// Returns `DustMapError::InvalidDistance` if value is ≤0, infinite, or NaN.
    pub fn from_parsecs(parsecs: f64) -> DustMapResult<Self> {
        if !parsecs.is_finite() || parsecs <= 0.0 {
            return Err(DustMapError::invalid_distance(format!(
                "Distance must be positive and finite, got {} pc",
                parsecs
            )));
        }
        Ok(Self { parsecs })
    }

    pub fn from_kiloparsecs(kpc: f64) -> DustMapResult<Self> {
        if !kpc.is_finite() || kpc <= 0.0 {
            return Err(DustMapError::invalid_distance(format!(
                "Distance must be positive and finite, got {} kpc",
                kpc
            )));
        }
        Self::from_parsecs(kpc * PC_PER_KPC)
    }

    pub fn from_distance_modulus(dm: f64) -> DustMapResult<Self> {
        if !dm.is_finite() {
            return Err(DustMapError::invalid_distance(format!(
                "Distance modulus must be finite, got {}",
                dm
            )));
        }
        Self::from_parsecs(10.0_f64.powf((dm + 5.0) / 5.0))
    }

    pub fn parsecs(self) -> f64 {
        self.parsecs
    }

    pub fn kiloparsecs(self) -> f64 {
        self.parsecs / PC_PER_KPC
    }

    pub fn distance_modulus(self) -> f64 {
        5.0 * libm::log10(self.parsecs) - 5.0
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} kpc", self.kiloparsecs())
    }
}

/// A galactic position, optionally with distance.
///
/// Longitude is normalized to [0°, 360°); latitude must lie in [−90°, 90°].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GalacticCoord {
    l_deg: f64,
    b_deg: f64,
    distance: Option<Distance>,
}

impl GalacticCoord {
    pub fn new(l_deg: f64, b_deg: f64) -> DustMapResult<Self> {
        if !l_deg.is_finite() {
            return Err(DustMapError::invalid_coordinate(format!(
                "Galactic longitude must be finite, got {}",
                l_deg
            )));
        }
        if !b_deg.is_finite() || !(-90.0..=90.0).contains(&b_deg) {
            return Err(DustMapError::invalid_coordinate(format!(
                "Galactic latitude must be within [-90, 90] degrees, got {}",
                b_deg
            )));
        }
        Ok(Self {
            l_deg: wrap_degrees(l_deg),
            b_deg,
            distance: None,
        })
    }

    pub fn with_distance(l_deg: f64, b_deg: f64, distance: Distance) -> DustMapResult<Self> {
        let mut coord = Self::new(l_deg, b_deg)?;
        coord.distance = Some(distance);
        Ok(coord)
    }

    /// Converts an equatorial (ICRS) direction to galactic coordinates.
    pub fn from_equatorial(ra_deg: f64, dec_deg: f64) -> DustMapResult<Self> {
        if !ra_deg.is_finite() || !dec_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(DustMapError::invalid_coordinate(format!(
                "Invalid equatorial position RA={}, Dec={}",
                ra_deg, dec_deg
            )));
        }
        let (sin_dec, cos_dec) = dec_deg.to_radians().sin_cos();
        let (sin_ra, cos_ra) = ra_deg.to_radians().sin_cos();
        let icrs = [cos_ra * cos_dec, sin_ra * cos_dec, sin_dec];

        let m = &ICRS_TO_GALACTIC;
        let gal = [
            m[0][0] * icrs[0] + m[0][1] * icrs[1] + m[0][2] * icrs[2],
            m[1][0] * icrs[0] + m[1][1] * icrs[1] + m[1][2] * icrs[2],
            m[2][0] * icrs[0] + m[2][1] * icrs[1] + m[2][2] * icrs[2],
        ];

        let d2 = gal[0] * gal[0] + gal[1] * gal[1];
        let l = if d2 != 0.0 { gal[1].atan2(gal[0]) } else { 0.0 };
        let b = gal[2].atan2(d2.sqrt());

        // Rounding can push |b| a hair past 90°.
        Self::new(l.to_degrees(), b.to_degrees().clamp(-90.0, 90.0))
    }

    pub fn longitude_deg(&self) -> f64 {
        self.l_deg
    }

    pub fn latitude_deg(&self) -> f64 {
        self.b_deg
    }

    pub fn distance(&self) -> Option<Distance> {
        self.distance
    }

    pub fn set_distance(&mut self, distance: Option<Distance>) {
        self.distance = distance;
    }
}

impl std::fmt::Display for GalacticCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Galactic(l={:.6}°, b={:.6}°", self.l_deg, self.b_deg)?;
        if let Some(distance) = self.distance {
            write!(f, ", d={}", distance)?;
        }
        write!(f, ")")
    }
}

fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid returns 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
