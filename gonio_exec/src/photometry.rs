//! Photometric quantities derived from a completed sweep
//!
//! Samples carry the luminous intensity seen at their position. The luminous flux is found by
//! weighting every intensity with the solid angle of the zone it samples, and the full widths at
//! half maximum are read from the four azimuthal cuts through the horizontal and vertical planes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::cmp::Ordering;
use std::f64::consts::PI;

// Internal
use crate::motion_ctrl::{whole_steps, STEP_COUNT_TOLERANCE};
use crate::sweep::Sample;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Azimuths of the two half planes of the horizontal cut.
///
/// Units: degrees
const HORIZONTAL_CUTS_DEG: [f64; 2] = [0.0, 180.0];

/// Azimuths of the two half planes of the vertical cut.
///
/// Units: degrees
const VERTICAL_CUTS_DEG: [f64; 2] = [90.0, 270.0];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Full widths at half maximum of the horizontal and vertical cuts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HvFwhm {
    /// Units: degrees
    pub horizontal_deg: f64,

    /// Units: degrees
    pub vertical_deg: f64,
}

/// Polar rings past the pole up to the equator and up to the far pole, and the number of samples
/// on a full ring.
struct GridSize {
    hemisphere_rings: usize,
    sphere_rings: usize,
    columns: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The part of the sphere a set of samples covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Polar angles from 0 to 90 degrees
    Hemisphere,

    /// Polar angles from 0 to 180 degrees
    Sphere,
}

/// Errors raised while deriving photometric quantities.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhotometryError {
    #[error("Invalid polar resolution of {0} degrees, expected a value in (0, 90]")]
    InvalidPolarResolution(f64),

    #[error("Invalid azimuthal resolution of {0} degrees, expected a value in (0, 360]")]
    InvalidAzimuthalResolution(f64),

    #[error("{num} samples cannot come from a single sweep, at most {max} fit on the sphere")]
    TooManySamples { num: usize, max: usize },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Luminous intensity of a point source producing `illuminance_lux` at `distance_m`.
///
/// Negative illuminances, left over from removing the dark offset, count as darkness.
///
/// Units: candela
pub fn luminous_intensity(illuminance_lux: f64, distance_m: f64) -> f64 {
    illuminance_lux.max(0.0) * distance_m * distance_m
}

/// Find out whether `num_samples` samples taken at the given resolutions cover a hemisphere or
/// the whole sphere.
pub fn coverage(
    num_samples: usize,
    theta_res_deg: f64,
    phi_res_deg: f64,
) -> Result<Coverage, PhotometryError> {
    let grid = grid_size(theta_res_deg, phi_res_deg)?;

    // One sample at each pole, a full ring of samples at every other polar angle
    let hemisphere = grid.columns * grid.hemisphere_rings + 1;
    let sphere = grid.columns * (grid.sphere_rings - 1) + 2;

    if num_samples <= hemisphere {
        Ok(Coverage::Hemisphere)
    } else if num_samples <= sphere {
        Ok(Coverage::Sphere)
    } else {
        Err(PhotometryError::TooManySamples {
            num: num_samples,
            max: sphere,
        })
    }
}

/// Integrate the luminous intensity of `samples` over the sphere.
///
/// Samples are grouped into rings of constant polar angle, one ring every `theta_res_deg`
/// starting at the pole. Each sample stands for a zone `phi_res_deg` wide reaching half a ring
/// either side of it, apart from the pole samples which stand for the whole polar cap. Samples
/// whose polar angle does not sit on a ring are ignored.
///
/// Units: lumen
pub fn luminous_flux(
    samples: &[Sample],
    theta_res_deg: f64,
    phi_res_deg: f64,
) -> Result<f64, PhotometryError> {
    let areas = zone_areas(
        coverage(samples.len(), theta_res_deg, phi_res_deg)?,
        theta_res_deg,
        phi_res_deg,
    )?;

    let mut ring_sums = vec![0.0; areas.len()];

    for s in samples {
        if let Some(ring) = ring_index(s.theta_deg, theta_res_deg, areas.len()) {
            ring_sums[ring] += s.intensity_cd;
        }
    }

    Ok(ring_sums.iter().zip(areas.iter()).map(|(i, a)| i * a).sum())
}

/// Find the horizontal and vertical full widths at half maximum.
///
/// The half width of each half plane is the polar angle of the sample in that plane whose
/// intensity is closest to half of the peak intensity. A sample belongs to a half plane if its
/// azimuth is less than half of `phi_res_deg` away from it. Samples at the far pole belong to
/// every half plane. A half plane without samples contributes nothing to its width.
pub fn hv_fwhm(samples: &[Sample], phi_res_deg: f64) -> HvFwhm {
    let half_max = samples
        .iter()
        .map(|s| s.intensity_cd)
        .fold(0.0, f64::max)
        / 2.0;

    let mut sorted: Vec<&Sample> = samples.iter().collect();
    sorted.sort_by(|a, b| {
        a.theta_deg
            .partial_cmp(&b.theta_deg)
            .unwrap_or(Ordering::Equal)
            .then(a.phi_deg.partial_cmp(&b.phi_deg).unwrap_or(Ordering::Equal))
    });

    let width = |cuts: &[f64; 2]| -> f64 {
        cuts.iter()
            .map(|&cut| half_width(half_max, &sorted, cut, phi_res_deg))
            .sum()
    };

    HvFwhm {
        horizontal_deg: width(&HORIZONTAL_CUTS_DEG),
        vertical_deg: width(&VERTICAL_CUTS_DEG),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn grid_size(theta_res_deg: f64, phi_res_deg: f64) -> Result<GridSize, PhotometryError> {
    if !(theta_res_deg > 0.0 && theta_res_deg <= 90.0) {
        return Err(PhotometryError::InvalidPolarResolution(theta_res_deg));
    }
    if !(phi_res_deg > 0.0 && phi_res_deg <= 360.0) {
        return Err(PhotometryError::InvalidAzimuthalResolution(phi_res_deg));
    }

    let rings = |extent_deg: f64| {
        whole_steps(extent_deg, theta_res_deg)
            .map(|r| r as usize)
            .ok_or(PhotometryError::InvalidPolarResolution(theta_res_deg))
    };

    Ok(GridSize {
        hemisphere_rings: rings(90.0)?,
        sphere_rings: rings(180.0)?,
        columns: whole_steps(360.0, phi_res_deg)
            .ok_or(PhotometryError::InvalidAzimuthalResolution(phi_res_deg))?
            as usize,
    })
}

/// Solid angle of the zone a sample on each ring stands for.
///
/// Units: steradians
fn zone_areas(
    coverage: Coverage,
    theta_res_deg: f64,
    phi_res_deg: f64,
) -> Result<Vec<f64>, PhotometryError> {
    let grid = grid_size(theta_res_deg, phi_res_deg)?;
    let num_rings = match coverage {
        Coverage::Hemisphere => grid.hemisphere_rings + 1,
        Coverage::Sphere => grid.sphere_rings + 1,
    };

    let half_res = theta_res_deg / 2.0;
    let width = phi_res_deg.to_radians();
    let cos = |deg: f64| deg.to_radians().cos();

    let cap = 2.0 * PI * (1.0 - cos(half_res));

    let mut areas = Vec::with_capacity(num_rings);
    areas.push(cap);

    for n in 1..num_rings - 1 {
        let low = (2 * n - 1) as f64 * half_res;
        let high = (2 * n + 1) as f64 * half_res;
        areas.push((cos(low) - cos(high)) * width);
    }

    areas.push(match coverage {
        // Only the half zone above the equator is lit
        Coverage::Hemisphere => (cos(90.0 - half_res) - cos(90.0)) * width,
        Coverage::Sphere => cap,
    });

    Ok(areas)
}

/// Index of the ring `theta_deg` sits on, if any.
fn ring_index(theta_deg: f64, theta_res_deg: f64, num_rings: usize) -> Option<usize> {
    let quotient = theta_deg / theta_res_deg;
    let ring = quotient.round();

    if (quotient - ring).abs() < STEP_COUNT_TOLERANCE && ring >= 0.0 && (ring as usize) < num_rings
    {
        Some(ring as usize)
    } else {
        None
    }
}

/// Smallest angle between two azimuths.
///
/// Units: degrees
fn azimuth_distance(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Polar angle of the sample in the half plane at `cut_deg` closest to `half_max`. Later samples
/// win ties.
fn half_width(half_max: f64, sorted: &[&Sample], cut_deg: f64, phi_res_deg: f64) -> f64 {
    let mut theta = 0.0;
    let mut closest = f64::INFINITY;

    for s in sorted {
        let at_far_pole = (s.theta_deg - 180.0).abs() < STEP_COUNT_TOLERANCE;
        if !at_far_pole && azimuth_distance(s.phi_deg, cut_deg) >= phi_res_deg / 2.0 {
            continue;
        }

        let d = (half_max - s.intensity_cd).abs();
        if d <= closest {
            closest = d;
            theta = s.theta_deg;
        }
    }

    theta
}
