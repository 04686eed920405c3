//! Pointer and programmatic perturbations of the height field.

use crate::error::RipplesError;
use crate::gpu::{FullscreenQuad, Gpu, UniformValue};
use crate::height_field::HeightField;
use crate::host::{ClientRect, PointerPosition, Viewport};
use crate::program::{ShaderProgram, UniformName};

/// A drop in normalized surface space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    /// Clip-space center, y up.
    pub center: [f32; 2],
    /// Radius as a fraction of the longest side.
    pub radius: f32,
    pub strength: f32,
}

impl Impulse {
    /// Maps a drop at pixel `(x, y)` on a `width × height` surface.
    ///
    /// Returns `None` for an empty surface or a non-positive radius.
    pub fn from_pixels(
        x: f64,
        y: f64,
        radius: f64,
        strength: f64,
        width: f64,
        height: f64,
    ) -> Option<Self> {
        let longest = width.max(height);
        if !(longest > 0.0) || !(radius > 0.0) || !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Self {
            center: [
                ((2.0 * x - width) / longest) as f32,
                ((height - 2.0 * y) / longest) as f32,
            ],
            radius: (radius / longest) as f32,
            strength: strength as f32,
        })
    }
}

impl<G: Gpu> HeightField<G> {
    /// Adds a cosine-shaped bump to the height channel.
    pub fn drop(
        &mut self,
        gpu: &mut G,
        perturb: &ShaderProgram<G>,
        quad: &FullscreenQuad<G>,
        impulse: Impulse,
    ) -> Result<(), RipplesError> {
        perturb.activate(gpu);
        perturb.set(gpu, UniformName::Center, UniformValue::Vec2(impulse.center))?;
        perturb.set(gpu, UniformName::Radius, UniformValue::Float(impulse.radius))?;
        perturb.set(gpu, UniformName::Strength, UniformValue::Float(impulse.strength))?;
        self.run_pass(gpu, perturb, quad);
        Ok(())
    }
}

/// Interactive drop presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Pointer or touch motion.
    Move,
    /// Mouse press or touch start.
    Press,
}

impl Gesture {
    pub fn radius_scale(self) -> f64 {
        match self {
            Gesture::Move => 1.0,
            Gesture::Press => 1.5,
        }
    }

    pub fn strength(self) -> f64 {
        match self {
            Gesture::Move => 0.01,
            Gesture::Press => 0.14,
        }
    }
}

/// Converts a pointer position to surface pixel coordinates.
///
/// `rect` is the surface's client rect and `pixel_size` its drawing buffer
/// size. Points outside the rect yield `None`.
pub fn surface_point(
    position: PointerPosition,
    rect: ClientRect,
    viewport: &Viewport,
    pixel_size: (u32, u32),
) -> Option<(f64, f64)> {
    let (client_x, client_y) = match position {
        PointerPosition::Client { x, y } => (x, y),
        PointerPosition::Page { x, y } => (x - viewport.scroll_x, y - viewport.scroll_y),
    };
    let x = client_x - rect.left;
    let y = client_y - rect.top;
    if x < 0.0 || y < 0.0 || x > rect.width || y > rect.height {
        return None;
    }
    let scale_x = if rect.width > 0.0 {
        pixel_size.0 as f64 / rect.width
    } else {
        1.0
    };
    let scale_y = if rect.height > 0.0 {
        pixel_size.1 as f64 / rect.height
    } else {
        1.0
    };
    Some((x * scale_x, y * scale_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_square_maps_to_origin() {
        let imp = Impulse::from_pixels(50.0, 50.0, 20.0, 0.1, 100.0, 100.0).unwrap();
        assert_eq!(imp.center, [0.0, 0.0]);
        assert!((imp.radius - 0.2).abs() < 1e-6);
    }

    #[test]
    fn top_left_is_y_up() {
        let imp = Impulse::from_pixels(0.0, 0.0, 10.0, 0.1, 200.0, 100.0).unwrap();
        assert_eq!(imp.center, [-1.0, 0.5]);
    }

    #[test]
    fn empty_surface_rejects() {
        assert!(Impulse::from_pixels(0.0, 0.0, 10.0, 0.1, 0.0, 0.0).is_none());
        assert!(Impulse::from_pixels(0.0, 0.0, 0.0, 0.1, 10.0, 10.0).is_none());
        assert!(Impulse::from_pixels(f64::NAN, 0.0, 1.0, 0.1, 10.0, 10.0).is_none());
    }

    #[test]
    fn presets() {
        assert_eq!((Gesture::Move.radius_scale(), Gesture::Move.strength()), (1.0, 0.01));
        assert_eq!((Gesture::Press.radius_scale(), Gesture::Press.strength()), (1.5, 0.14));
    }

    #[test]
    fn page_coordinates_subtract_scroll() {
        let rect = ClientRect {
            left: 10.0,
            top: 20.0,
            width: 100.0,
            height: 50.0,
        };
        let viewport = Viewport {
            scroll_x: 0.0,
            scroll_y: 300.0,
            width: 800.0,
            height: 600.0,
        };
        let p = surface_point(
            PointerPosition::Page { x: 60.0, y: 345.0 },
            rect,
            &viewport,
            (200, 100),
        );
        assert_eq!(p, Some((100.0, 50.0)));
        let outside = surface_point(
            PointerPosition::Client { x: 5.0, y: 30.0 },
            rect,
            &viewport,
            (200, 100),
        );
        assert_eq!(outside, None);
    }
}
