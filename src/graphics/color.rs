use serde::{Deserialize, Serialize};

fn opaque() -> u8 {
    255
}

/// 8-bit RGBA color as stored in material manifests.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    #[serde(default)]
    pub r: u8,
    #[serde(default)]
    pub g: u8,
    #[serde(default)]
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const GRAY: Self = Self::new(128, 128, 128, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn r_float(&self) -> f32 { self.r as f32 / 255.0 }
    pub fn g_float(&self) -> f32 { self.g as f32 / 255.0 }
    pub fn b_float(&self) -> f32 { self.b as f32 / 255.0 }
    pub fn a_float(&self) -> f32 { self.a as f32 / 255.0 }

    pub fn to_float_array(&self) -> [f32; 4] {
        [self.r_float(), self.g_float(), self.b_float(), self.a_float()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_alpha_defaults_to_opaque() {
        let c: Color = serde_json::from_str(r#"{"r": 10, "g": 20, "b": 30}"#).unwrap();
        assert_eq!(c, Color::new(10, 20, 30, 255));
    }

    #[test]
    fn float_channels_are_normalised() {
        assert_eq!(Color::WHITE.to_float_array(), [1.0; 4]);
        assert_eq!(Color::TRANSPARENT.a_float(), 0.0);
    }
}
