//! Spherical Web Mercator (EPSG:3857).
//!
//! Forward and inverse transforms between WGS84 longitude/latitude in degrees
//! and planar meters on a sphere of radius `EARTH_RADIUS`. The forward
//! transform is generic over the float type so callers holding `f32` columns
//! never widen them.
//!
//! Latitudes of exactly ±90° project to ±infinity; callers are expected to
//! discard non-finite results.

use num_traits::Float;
use rayon::prelude::*;

/// Sphere radius used by Web Mercator (WGS84 semi-major axis), meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the projected world width: `π · EARTH_RADIUS`.
pub const ORIGIN_SHIFT: f64 = std::f64::consts::PI * EARTH_RADIUS;

/// Projected width of the full globe, meters.
pub const WORLD_WIDTH: f64 = 2.0 * ORIGIN_SHIFT;

/// Arrays shorter than this are projected on the calling thread.
const PARALLEL_THRESHOLD: usize = 16_384;

#[inline(always)]
fn constant<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::nan)
}

/// Project one longitude/latitude pair (degrees) to meters.
#[inline]
pub fn lnglat_to_meters<T: Float>(lon: T, lat: T) -> (T, T) {
    let shift: T = constant(ORIGIN_SHIFT);
    let half_turn: T = constant(180.0);
    let quarter_turn: T = constant(90.0);
    let full_turn: T = constant(360.0);
    let pi: T = constant(std::f64::consts::PI);

    let x = lon * shift / half_turn;
    let y = ((quarter_turn + lat) * pi / full_turn).tan().ln() * shift / pi;
    (x, y)
}

/// Inverse projection: meters back to longitude/latitude degrees.
#[inline]
pub fn meters_to_lnglat(x: f64, y: f64) -> (f64, f64) {
    let lon = x / ORIGIN_SHIFT * 180.0;
    let lat = (y / EARTH_RADIUS).sinh().atan().to_degrees();
    (lon, lat)
}

/// Project parallel longitude and latitude columns.
///
/// The output columns have the length of the shorter input.
pub fn project_points<T>(lons: &[T], lats: &[T]) -> (Vec<T>, Vec<T>)
where
    T: Float + Send + Sync,
{
    let n = lons.len().min(lats.len());
    let (lons, lats) = (&lons[..n], &lats[..n]);

    if n < PARALLEL_THRESHOLD {
        return lons
            .iter()
            .zip(lats)
            .map(|(&lon, &lat)| lnglat_to_meters(lon, lat))
            .unzip();
    }

    lons.par_iter()
        .zip(lats.par_iter())
        .map(|(&lon, &lat)| lnglat_to_meters(lon, lat))
        .unzip()
}
