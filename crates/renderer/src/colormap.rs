//! Color ramps for density shading.

use ais_common::config::ColormapSpec;

use crate::error::RenderError;

/// Number of entries in a sampled lookup table.
pub const LUT_SIZE: usize = 256;

/// Black through red, orange and yellow to white.
const FIRE: [&str; 9] = [
    "#000000", "#410d00", "#8b1500", "#d42700", "#ff5a00", "#ff9500", "#ffc82a", "#fff28a",
    "#ffffff",
];

const GRAY: [&str; 2] = ["#000000", "#ffffff"];

/// Blues, for dark basemaps where fire reads poorly.
const OCEAN: [&str; 5] = ["#081d58", "#225ea8", "#41b6c4", "#c7e9b4", "#ffffd9"];

/// A piecewise-linear color ramp with evenly spaced stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    name: String,
    stops: Vec<(u8, u8, u8)>,
}

impl Colormap {
    /// The default ramp.
    pub fn fire() -> Self {
        Self::from_static("fire", &FIRE)
    }

    /// Look up a built-in ramp by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "fire" => Some(Self::fire()),
            "gray" | "grey" => Some(Self::from_static("gray", &GRAY)),
            "ocean" => Some(Self::from_static("ocean", &OCEAN)),
            _ => None,
        }
    }

    /// Build a ramp from `#RRGGBB` stops.
    pub fn from_hex_stops<S: AsRef<str>>(stops: &[S]) -> Result<Self, RenderError> {
        if stops.len() < 2 {
            return Err(RenderError::TooFewStops(stops.len()));
        }
        let stops = stops
            .iter()
            .map(|s| hex_to_rgb(s.as_ref()).ok_or_else(|| RenderError::InvalidColor(s.as_ref().to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: "custom".to_string(),
            stops,
        })
    }

    /// Resolve a configured colormap.
    pub fn from_spec(spec: &ColormapSpec) -> Result<Self, RenderError> {
        match spec {
            ColormapSpec::Named(name) => {
                Self::by_name(name).ok_or_else(|| RenderError::UnknownColormap(name.clone()))
            }
            ColormapSpec::Stops(stops) => Self::from_hex_stops(stops),
        }
    }

    fn from_static(name: &str, stops: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            stops: stops.iter().filter_map(|s| hex_to_rgb(s)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color at position `t` in `[0, 1]` (clamped).
    pub fn sample(&self, t: f32) -> (u8, u8, u8) {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = (self.stops.len() - 1) as f32;
        let pos = t * segments;
        let low = (pos.floor() as usize).min(self.stops.len() - 2);
        interpolate_rgb(self.stops[low], self.stops[low + 1], pos - low as f32)
    }

    /// `LUT_SIZE` evenly spaced samples of the ramp.
    pub fn lut(&self) -> Vec<(u8, u8, u8)> {
        (0..LUT_SIZE)
            .map(|i| self.sample(i as f32 / (LUT_SIZE - 1) as f32))
            .collect()
    }
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Linear color interpolation
fn interpolate_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f32) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 * (1.0 - t) + y as f32 * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("00ff00"), Some((0, 255, 0)));
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb("#fff"), None);
    }

    #[test]
    fn test_fire_endpoints() {
        let fire = Colormap::fire();
        assert_eq!(fire.sample(0.0), (0, 0, 0));
        assert_eq!(fire.sample(1.0), (255, 255, 255));
        assert_eq!(fire.sample(2.0), (255, 255, 255));
        assert_eq!(fire.sample(f32::NAN), (0, 0, 0));
    }

    #[test]
    fn test_two_stop_midpoint() {
        let ramp = Colormap::from_hex_stops(&["#000000", "#c8c8c8"]).unwrap();
        assert_eq!(ramp.sample(0.5), (100, 100, 100));
    }

    #[test]
    fn test_lut_is_monotonic_for_gray() {
        let lut = Colormap::by_name("gray").unwrap().lut();
        assert_eq!(lut.len(), LUT_SIZE);
        assert!(lut.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_from_spec_errors() {
        let unknown = Colormap::from_spec(&ColormapSpec::Named("plasma-ish".into()));
        assert!(matches!(unknown, Err(RenderError::UnknownColormap(_))));
        let bad = Colormap::from_spec(&ColormapSpec::Stops(vec!["#000000".into(), "red".into()]));
        assert!(matches!(bad, Err(RenderError::InvalidColor(ref c)) if c == "red"));
        let short = Colormap::from_hex_stops(&["#000000"]);
        assert!(matches!(short, Err(RenderError::TooFewStops(1))));
    }
}
