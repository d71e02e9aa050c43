use crate::foundation::error::{EaselError, EaselResult};

/// Straight-alpha RGBA color with channels in `[0, 1]`.
///
/// Premultiplication happens at the canvas boundary; the model keeps
/// straight alpha so colors archive and compare cleanly.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    /// Used for ghost rendering of graphics that would otherwise be invisible.
    pub const GHOST_GRAY: Color = Color::rgba(0.66, 0.66, 0.66, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Gray with the given white level and alpha.
    pub const fn gray(white: f64, a: f64) -> Self {
        Self {
            r: white,
            g: white,
            b: white,
            a,
        }
    }

    /// True when drawing with this color would emit any pixels.
    pub fn is_visible(self) -> bool {
        self.a > 0.0
    }

    /// Returns the color with its alpha scaled by `factor`.
    pub fn with_alpha_scaled(self, factor: f64) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Straight (non-premultiplied) RGBA8, for paint setup.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), to_u8(self.a)]
    }

    /// Premultiplied RGBA8, for direct pixel writes.
    pub fn to_rgba8_premul(self) -> [u8; 4] {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        let a = self.a.clamp(0.0, 1.0);
        [
            to_u8(self.r.clamp(0.0, 1.0) * a),
            to_u8(self.g.clamp(0.0, 1.0) * a),
            to_u8(self.b.clamp(0.0, 1.0) * a),
            to_u8(a),
        ]
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(s: &str) -> EaselResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(EaselError::validation(format!("invalid hex color '{s}'")));
        }
        let expand = |c: u32| (c << 4) | c;
        let parse = |chunk: &str| {
            u32::from_str_radix(chunk, 16)
                .map_err(|_| EaselError::validation(format!("invalid hex color '{s}'")))
        };

        let (r, g, b, a) = match hex.len() {
            3 | 4 => {
                let r = expand(parse(&hex[0..1])?);
                let g = expand(parse(&hex[1..2])?);
                let b = expand(parse(&hex[2..3])?);
                let a = if hex.len() == 4 {
                    expand(parse(&hex[3..4])?)
                } else {
                    255
                };
                (r, g, b, a)
            }
            6 | 8 => {
                let r = parse(&hex[0..2])?;
                let g = parse(&hex[2..4])?;
                let b = parse(&hex[4..6])?;
                let a = if hex.len() == 8 {
                    parse(&hex[6..8])?
                } else {
                    255
                };
                (r, g, b, a)
            }
            _ => {
                return Err(EaselError::validation(format!(
                    "hex color '{s}' must have 3, 4, 6, or 8 digits"
                )));
            }
        };

        Ok(Self::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        ))
    }

    /// Format as `#rrggbb` or `#rrggbbaa` when alpha is not opaque.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
