//! Height sample encodings
//!
//! Two encodings exist for the per-cell byte of a height grid:
//!
//! - `Linear`: the signed sample is re-centered into an unsigned texel
//!   (`sample + offset`), decoded as `texel - offset` and clamped to
//!   `[min_height, max_height]`. Every cell is rendered.
//! - `Legacy`: `0` means no data, `1` is below -0.5 m, `255` is above 2 m and
//!   `2..=254` map linearly onto -0.5 m .. 2 m.

use serde::{Deserialize, Serialize};

/// Saturation used when color coding heights
pub const HEIGHT_SATURATION: f32 = 0.95;
/// Value used when color coding heights
pub const HEIGHT_VALUE: f32 = 0.88;

const LEGACY_MIN: f32 = -0.5;
const LEGACY_MAX: f32 = 2.0;
const LEGACY_SPAN: f32 = LEGACY_MAX - LEGACY_MIN;

/// Per-cell height encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightEncoding {
    /// Offset encoding: height = texel - offset
    Linear { offset: u8 },
    /// Non-linear encoding with a no-data sentinel at 0
    Legacy,
}

impl Default for HeightEncoding {
    fn default() -> Self {
        HeightEncoding::Linear { offset: 128 }
    }
}

impl HeightEncoding {
    /// Convert a grid sample to the texel byte stored in the data texture
    ///
    /// Linear texels saturate at 0 and 255 when `sample + offset` leaves the
    /// byte range.
    pub fn encode(&self, sample: i8) -> u8 {
        match self {
            HeightEncoding::Linear { offset } => {
                (sample as i16 + *offset as i16).clamp(0, u8::MAX as i16) as u8
            }
            // Raw two's complement byte
            HeightEncoding::Legacy => sample as u8,
        }
    }

    /// Encoding discriminant passed to the shader
    pub fn shader_id(&self) -> u32 {
        match self {
            HeightEncoding::Linear { .. } => 0,
            HeightEncoding::Legacy => 1,
        }
    }

    /// Offset passed to the shader (0 for legacy)
    pub fn offset(&self) -> f32 {
        match self {
            HeightEncoding::Linear { offset } => *offset as f32,
            HeightEncoding::Legacy => 0.0,
        }
    }
}

/// Height decoding and color coding parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightParams {
    pub encoding: HeightEncoding,
    /// Scale from decoded height to displacement along the plane normal
    pub height_scale: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Hue at `min_height` (0.0 - 1.0)
    pub low_hue: f32,
    /// Hue at `max_height` (0.0 - 1.0)
    pub high_hue: f32,
}

impl Default for HeightParams {
    fn default() -> Self {
        Self {
            encoding: HeightEncoding::default(),
            height_scale: 0.01,
            min_height: -128.0,
            max_height: 127.0,
            low_hue: 0.66,
            high_hue: 0.0,
        }
    }
}

impl HeightParams {
    /// Decode a texel byte to a height
    pub fn decode(&self, texel: u8) -> f32 {
        match self.encoding {
            HeightEncoding::Linear { offset } => {
                let raw = texel as f32 - offset as f32;
                clamp_height(raw, self.min_height, self.max_height)
            }
            HeightEncoding::Legacy => match texel {
                0 => 0.0,
                1 => LEGACY_MIN,
                255 => LEGACY_MAX,
                b => (b as f32 - 2.0) / 252.0 * LEGACY_SPAN + LEGACY_MIN,
            },
        }
    }

    /// Displacement of the vertex sampling `texel` along the plane normal
    pub fn displacement(&self, texel: u8) -> f32 {
        match self.encoding {
            HeightEncoding::Linear { .. } => self.decode(texel) * self.height_scale,
            // Legacy heights are already in meters
            HeightEncoding::Legacy => self.decode(texel),
        }
    }

    /// Whether the texel marks a cell without data
    pub fn is_no_data(&self, texel: u8) -> bool {
        matches!(self.encoding, HeightEncoding::Legacy) && texel == 0
    }

    /// Height mapped to 0.0 - 1.0 across the displayable range
    pub fn normalized(&self, height: f32) -> f32 {
        match self.encoding {
            HeightEncoding::Linear { .. } => {
                let span = self.max_height - self.min_height;
                if span <= 0.0 {
                    0.0
                } else {
                    ((height - self.min_height) / span).clamp(0.0, 1.0)
                }
            }
            HeightEncoding::Legacy => ((height - LEGACY_MIN) / LEGACY_SPAN).clamp(0.0, 1.0),
        }
    }

    /// Hue for a decoded height
    pub fn hue(&self, height: f32) -> f32 {
        let t = self.normalized(height);
        match self.encoding {
            HeightEncoding::Linear { .. } => self.low_hue + (self.high_hue - self.low_hue) * t,
            HeightEncoding::Legacy => 1.0 - t,
        }
    }

    /// RGBA color of a cell, mirroring the fragment shader
    pub fn color(&self, texel: u8) -> [f32; 4] {
        let height = self.decode(texel);
        let [r, g, b] = hsv_to_rgb(self.hue(height), HEIGHT_SATURATION, HEIGHT_VALUE);
        let alpha = if self.is_no_data(texel) { 0.0 } else { 1.0 };
        [r, g, b, alpha]
    }
}

/// Clamp that tolerates an inverted range by treating it as empty at `min`
fn clamp_height(value: f32, min: f32, max: f32) -> f32 {
    if max < min {
        return min;
    }
    value.clamp(min, max)
}

/// HSV to RGB (all components 0.0 - 1.0)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let k = [1.0, 2.0 / 3.0, 1.0 / 3.0];
    let mut rgb = [0.0; 3];
    for (i, out) in rgb.iter_mut().enumerate() {
        let p = ((h + k[i]).fract() * 6.0 - 3.0).abs();
        let c = (p - 1.0).clamp(0.0, 1.0);
        *out = v * (1.0 + (c - 1.0) * s);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_decode_is_clamped_offset() {
        let params = HeightParams {
            min_height: -10.0,
            max_height: 20.0,
            ..Default::default()
        };
        for b in 0..=255u8 {
            let expected = (b as f32 - 128.0).clamp(-10.0, 20.0);
            assert_eq!(params.decode(b), expected, "texel {b}");
        }
    }

    #[test]
    fn test_linear_default_range_is_identity() {
        let params = HeightParams::default();
        assert_eq!(params.decode(0), -128.0);
        assert_eq!(params.decode(128), 0.0);
        assert_eq!(params.decode(255), 127.0);
        assert_relative_eq!(params.displacement(228), 1.0);
    }

    #[test]
    fn test_encode_recenters_sample() {
        let encoding = HeightEncoding::default();
        assert_eq!(encoding.encode(-128), 0);
        assert_eq!(encoding.encode(0), 128);
        assert_eq!(encoding.encode(127), 255);

        let params = HeightParams::default();
        for s in [-128i8, -1, 0, 42, 127] {
            assert_eq!(params.decode(encoding.encode(s)), s as f32);
        }
    }

    #[test]
    fn test_encode_saturates_with_custom_offset() {
        let encoding = HeightEncoding::Linear { offset: 200 };
        assert_eq!(encoding.encode(100), 255);
        assert_eq!(encoding.encode(55), 255);
        assert_eq!(encoding.encode(-100), 100);
        assert_eq!(encoding.encode(-128), 72);

        let params = HeightParams {
            encoding,
            ..Default::default()
        };
        assert_eq!(params.decode(encoding.encode(100)), 55.0);
        assert_eq!(params.decode(encoding.encode(-100)), -100.0);

        let low = HeightEncoding::Linear { offset: 10 };
        assert_eq!(low.encode(-128), 0);
        assert_eq!(low.encode(127), 137);
    }

    #[test]
    fn test_legacy_decode() {
        let params = HeightParams {
            encoding: HeightEncoding::Legacy,
            ..Default::default()
        };
        assert_eq!(params.decode(0), 0.0);
        assert_eq!(params.decode(1), -0.5);
        assert_eq!(params.decode(255), 2.0);
        assert_relative_eq!(params.decode(2), -0.5);
        assert_relative_eq!(params.decode(254), 2.0);
        assert_relative_eq!(params.decode(128), 0.75);
        assert!(params.is_no_data(0));
        assert_eq!(params.color(0)[3], 0.0);
        assert_eq!(params.color(1)[3], 1.0);
        assert_eq!(HeightEncoding::Legacy.encode(-1), 255);
    }

    #[test]
    fn test_linear_has_no_sentinel() {
        let params = HeightParams::default();
        assert!(!params.is_no_data(0));
        assert_eq!(params.color(0)[3], 1.0);
    }

    #[test]
    fn test_hue_interpolates_between_bounds() {
        let params = HeightParams::default();
        assert_relative_eq!(params.hue(params.min_height), params.low_hue);
        assert_relative_eq!(params.hue(params.max_height), params.high_hue);
    }

    #[test]
    fn test_hsv_to_rgb_primaries() {
        let red = hsv_to_rgb(0.0, 1.0, 1.0);
        assert_relative_eq!(red[0], 1.0);
        assert_relative_eq!(red[1], 0.0);
        assert_relative_eq!(red[2], 0.0);

        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert_relative_eq!(green[0], 0.0, epsilon = 1e-5);
        assert_relative_eq!(green[1], 1.0, epsilon = 1e-5);
        assert_relative_eq!(green[2], 0.0, epsilon = 1e-5);

        let gray = hsv_to_rgb(0.3, 0.0, 0.5);
        assert_relative_eq!(gray[0], 0.5);
        assert_relative_eq!(gray[1], 0.5);
    }
}
