//! HEALPix nested-scheme indexing for galactic coordinates.
//!
//! Maps store one record per pixel in nested order, so a lookup is a single
//! [`ang2pix_nest`] call followed by a fixed-stride offset.

use std::f64::consts::PI;

const TWOPI: f64 = 2.0 * PI;

/// Number of pixels at the given order (`12 * nside^2`, nside = 2^order).
pub fn npix(order: u32) -> u64 {
    let nside = 1u64 << order;
    12 * nside * nside
}

/// Convert galactic (l, b) in degrees to a HEALPix nested pixel index.
///
/// Implements the Gorski et al. (2005) algorithm with l as the azimuth and
/// b as the latitude. Returns an index in `[0, 12 * nside^2)`.
pub fn ang2pix_nest(order: u32, l_deg: f64, b_deg: f64) -> u64 {
    let phi = l_deg.to_radians();
    let z = libm::sin(b_deg.to_radians());
    let nside = 1u64 << order;
    let (face, ix, iy) = compute_face_and_position(phi, z, order, nside);
    face as u64 * nside * nside + xy2pix_nest(ix, iy, order)
}

fn compute_face_and_position(phi: f64, z: f64, order: u32, nside: u64) -> (u32, u64, u64) {
    let z_abs = libm::fabs(z);
    let tt = phi_to_tt(phi);
    if z_abs <= 2.0 / 3.0 {
        equatorial_face(tt, z, order, nside)
    } else {
        polar_face(tt, z, z_abs, nside)
    }
}

/// Azimuth in units of quarter turns, in [0, 4).
fn phi_to_tt(phi: f64) -> f64 {
    let phi = phi.rem_euclid(TWOPI);
    let tt = phi * 2.0 / PI;
    if tt >= 4.0 {
        0.0
    } else {
        tt
    }
}

fn equatorial_face(tt: f64, z: f64, order: u32, nside: u64) -> (u32, u64, u64) {
    let temp1 = nside as f64 * (0.5 + tt);
    let temp2 = nside as f64 * z * 0.75;
    // Both indices are non-negative: tt >= 0 and |z| <= 2/3.
    let jp = (temp1 - temp2) as u64;
    let jm = (temp1 + temp2) as u64;
    let face = equatorial_face_number(jp >> order, jm >> order);
    let ix = jm & (nside - 1);
    let iy = nside - (jp & (nside - 1)) - 1;
    (face, ix, iy)
}

/// Base face from the ascending (`ifp`) and descending (`ifm`) edge lines.
/// Index 4 on either line is the wrap back to longitude 0.
fn equatorial_face_number(ifp: u64, ifm: u64) -> u32 {
    let face = if ifp == ifm {
        ifp | 4
    } else if ifp < ifm {
        ifp
    } else {
        ifm + 8
    };
    face as u32
}

fn polar_face(tt: f64, z: f64, z_abs: f64, nside: u64) -> (u32, u64, u64) {
    let tp = tt - libm::floor(tt);
    let tmp = nside as f64 * libm::sqrt(3.0 * (1.0 - z_abs));
    let jp = ((tp * tmp) as i64).min(nside as i64 - 1);
    let jm = (((1.0 - tp) * tmp) as i64).min(nside as i64 - 1);
    let ntt = libm::floor(tt) as u32;
    let face = (ntt % 4) + if z > 0.0 { 0 } else { 8 };
    let (ix, iy) = if z > 0.0 {
        (nside as i64 - jm - 1, nside as i64 - jp - 1)
    } else {
        (jp, jm)
    };
    (face, ix as u64, iy as u64)
}

/// Interleave (ix, iy) bits into the in-face nested index (Z-order curve).
fn xy2pix_nest(ix: u64, iy: u64, order: u32) -> u64 {
    let mut result: u64 = 0;
    for i in 0..order {
        let bit_x = (ix >> i) & 1;
        let bit_y = (iy >> i) & 1;
        result |= (bit_x << (2 * i)) | (bit_y << (2 * i + 1));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_npix() {
        assert_eq!(npix(0), 12);
        assert_eq!(npix(1), 48);
        assert_eq!(npix(8), 786_432);
    }

    #[test]
    fn test_xy2pix_nest() {
        assert_eq!(xy2pix_nest(0, 0, 2), 0);
        assert_eq!(xy2pix_nest(1, 0, 2), 1);
        assert_eq!(xy2pix_nest(0, 1, 2), 2);
        assert_eq!(xy2pix_nest(1, 1, 2), 3);
    }

    #[test]
    fn test_base_faces() {
        assert_eq!(ang2pix_nest(0, 0.0, 90.0), 0);
        assert_eq!(ang2pix_nest(0, 0.0, -90.0), 8);
        assert_eq!(ang2pix_nest(0, 0.0, 0.0), 4);
        assert_eq!(ang2pix_nest(0, 90.0, 0.0), 5);
    }

    #[test]
    fn test_equatorial_faces_near_longitude_zero() {
        // Reference values from healpy.ang2pix(nside, l, b, nest=True, lonlat=True).
        assert_eq!(ang2pix_nest(0, 350.0, -10.0), 4);
        assert_eq!(ang2pix_nest(0, 315.0, 0.0), 4);
        assert_eq!(ang2pix_nest(1, 325.0, -5.0), 18);
        assert_eq!(ang2pix_nest(1, 350.0, -10.0), 16);
        assert_eq!(ang2pix_nest(1, 355.0, 5.0), 19);
        assert_eq!(ang2pix_nest(1, 0.0, -5.0), 16);
        assert_eq!(ang2pix_nest(1, 359.9, 0.0), 18);
        assert_eq!(ang2pix_nest(2, 340.0, 20.0), 78);
        assert_eq!(ang2pix_nest(2, 10.0, -20.0), 65);
        assert_eq!(ang2pix_nest(3, 300.0, -30.0), 749);
    }

    #[test]
    fn test_southern_points_stay_south() {
        for order in 0..6 {
            let nside = 1u64 << order;
            for l in (0..360).step_by(5) {
                let face = ang2pix_nest(order, l as f64, -5.0) / (nside * nside);
                assert!(
                    (4..12).contains(&face),
                    "l={} b=-5 landed in polar face {}",
                    l,
                    face
                );
            }
        }
    }

    #[test]
    fn test_longitude_wraps() {
        for order in [0, 3, 6] {
            assert_eq!(
                ang2pix_nest(order, -180.0, 12.5),
                ang2pix_nest(order, 180.0, 12.5)
            );
            assert_eq!(
                ang2pix_nest(order, -45.0, -33.0),
                ang2pix_nest(order, 315.0, -33.0)
            );
        }
    }

    #[test]
    fn test_pixels_in_range() {
        let total = npix(6);
        for l in (-180..=180).step_by(15) {
            for b in (-90..=90).step_by(5) {
                let pixel = ang2pix_nest(6, l as f64, b as f64);
                assert!(pixel < total, "pixel {} >= {} at ({}, {})", pixel, total, l, b);
            }
        }
    }

    #[test]
    fn test_fine_sampling_hits_every_pixel() {
        let mut seen = HashSet::new();
        for l in 0..360 {
            for b in -90..=90 {
                seen.insert(ang2pix_nest(1, l as f64, b as f64));
            }
        }
        assert_eq!(seen.len() as u64, npix(1));
    }
}
