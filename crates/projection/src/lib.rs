//! Coordinate reference system transformations.
//!
//! Implements the spherical Web Mercator projection used for binning vessel
//! positions and for placing frames on the map.

pub mod mercator;

pub use mercator::{
    lnglat_to_meters, meters_to_lnglat, project_points, EARTH_RADIUS, ORIGIN_SHIFT, WORLD_WIDTH,
};
