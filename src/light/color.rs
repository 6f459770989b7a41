/// One RGB light value, channels normalized to [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn is_black(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    /// Per-channel linear interpolation, `alpha` = weight of `b`.
    pub fn mix(a: Color, b: Color, alpha: f32) -> Color {
        Color {
            r: a.r + (b.r - a.r) * alpha,
            g: a.g + (b.g - a.g) * alpha,
            b: a.b + (b.b - a.b) * alpha,
        }
    }

    pub fn scaled(&self, factor: f32) -> Color {
        Color {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_endpoints_are_exact() {
        let a = Color::new(0.1, 0.5, 0.9);
        let b = Color::new(0.8, 0.2, 0.4);
        assert_eq!(Color::mix(a, b, 0.0), a);
        assert_eq!(Color::mix(a, b, 1.0), b);
    }

    #[test]
    fn mix_midpoint_is_between() {
        let a = Color::new(0.0, 1.0, 0.5);
        let b = Color::new(1.0, 0.0, 0.5);
        let m = Color::mix(a, b, 0.5);
        assert!(m.r > a.r && m.r < b.r);
        assert!(m.g < a.g && m.g > b.g);
        assert_eq!(m.b, 0.5);
    }
}
