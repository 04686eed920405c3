//! Mapping between the element, its CSS background and the drawing surface.
//!
//! Everything here is a pure function of the current geometry so it can be
//! recomputed every frame.

use crate::config::ContentBounds;
use crate::css::{Attachment, BackgroundRules, BackgroundSize, SizeComponent};
use crate::host::{ElementBox, SurfaceLayout, Viewport};

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryInputs {
    pub element: ElementBox,
    pub viewport: Viewport,
    pub rules: BackgroundRules,
    /// Natural size of the background image.
    pub image_size: (f64, f64),
    pub content_bounds: Option<ContentBounds>,
    /// Drawing buffer size of the surface.
    pub surface_size: (u32, u32),
}

/// Where the surface lands in background texture space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryRect {
    pub top_left: [f32; 2],
    pub bottom_right: [f32; 2],
    /// Surface aspect, normalized so the longer side is 1.
    pub container_ratio: [f32; 2],
}

/// The box the background is positioned against.
pub fn background_container(element: &ElementBox, viewport: &Viewport, attachment: Attachment) -> Rect {
    match attachment {
        Attachment::Fixed => Rect {
            left: viewport.scroll_x,
            top: viewport.scroll_y,
            width: viewport.width,
            height: viewport.height,
        },
        Attachment::Scroll => Rect {
            left: element.page_left,
            top: element.page_top,
            width: element.client_width,
            height: element.client_height,
        },
    }
}

/// Rendered size of the background image inside `container`.
pub fn resolve_background_size(size: BackgroundSize, container: (f64, f64), image: (f64, f64)) -> (f64, f64) {
    let (cw, ch) = container;
    let (iw, ih) = image;
    let has_image = iw > 0.0 && ih > 0.0;
    match size {
        BackgroundSize::Cover | BackgroundSize::Contain if !has_image => (cw, ch),
        BackgroundSize::Cover => {
            let scale = (cw / iw).max(ch / ih);
            (iw * scale, ih * scale)
        }
        BackgroundSize::Contain => {
            let scale = (cw / iw).min(ch / ih);
            (iw * scale, ih * scale)
        }
        BackgroundSize::Explicit(w, h) => match (w, h) {
            (SizeComponent::Auto, SizeComponent::Auto) => (iw, ih),
            (SizeComponent::Length(w), SizeComponent::Auto) => {
                let w = w.resolve(cw);
                (w, if has_image { w * ih / iw } else { ih })
            }
            (SizeComponent::Auto, SizeComponent::Length(h)) => {
                let h = h.resolve(ch);
                (if has_image { h * iw / ih } else { iw }, h)
            }
            (SizeComponent::Length(w), SizeComponent::Length(h)) => (w.resolve(cw), h.resolve(ch)),
        },
    }
}

/// Page position of the background's top-left corner.
pub fn resolve_origin(rules: &BackgroundRules, container: &Rect, background: (f64, f64)) -> (f64, f64) {
    (
        container.left + rules.position.x.resolve(container.width - background.0),
        container.top + rules.position.y.resolve(container.height - background.1),
    )
}

/// The part of the element the surface covers.
pub fn target_rect(element: &ElementBox, bounds: Option<ContentBounds>) -> Rect {
    let base = Rect {
        left: element.page_left,
        top: element.page_top,
        width: element.client_width,
        height: element.client_height,
    };
    match bounds {
        None => base,
        Some(b) => Rect {
            left: base.left + base.width * b.x / 100.0,
            top: base.top + base.height * b.y / 100.0,
            width: base.width * b.width / 100.0,
            height: base.height * b.height / 100.0,
        },
    }
}

/// Size and placement of the drawing surface for the element.
pub fn surface_layout(element: &ElementBox, bounds: Option<ContentBounds>) -> SurfaceLayout {
    let (w, h) = match bounds {
        None => (element.client_width, element.client_height),
        Some(b) => (
            element.client_width * b.width / 100.0,
            element.client_height * b.height / 100.0,
        ),
    };
    SurfaceLayout {
        pixel_width: pixels(w),
        pixel_height: pixels(h),
        placement: bounds,
    }
}

fn pixels(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.floor().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

pub fn container_ratio(surface: (u32, u32)) -> [f32; 2] {
    let longest = surface.0.max(surface.1);
    if longest == 0 {
        return [1.0, 1.0];
    }
    [
        surface.0 as f32 / longest as f32,
        surface.1 as f32 / longest as f32,
    ]
}

pub fn compute_boundaries(inputs: &BoundaryInputs) -> BoundaryRect {
    let container = background_container(&inputs.element, &inputs.viewport, inputs.rules.attachment);
    let background = resolve_background_size(
        inputs.rules.size,
        (container.width, container.height),
        inputs.image_size,
    );
    let (bg_x, bg_y) = resolve_origin(&inputs.rules, &container, background);
    let target = target_rect(&inputs.element, inputs.content_bounds);

    let (left, right) = span(target.left - bg_x, target.width, background.0);
    let (top, bottom) = span(target.top - bg_y, target.height, background.1);

    BoundaryRect {
        top_left: [left as f32, top as f32],
        bottom_right: [right as f32, bottom as f32],
        container_ratio: container_ratio(inputs.surface_size),
    }
}

/// Start and end of `[offset, offset + length]` in units of `extent`.
fn span(offset: f64, length: f64, extent: f64) -> (f64, f64) {
    if !(extent > 0.0) || !extent.is_finite() || !offset.is_finite() || !length.is_finite() {
        return (0.0, 1.0);
    }
    let start = offset / extent;
    (start, start + length / extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Length;

    #[test]
    fn cover_scales_to_fill() {
        let size = resolve_background_size(BackgroundSize::Cover, (300.0, 200.0), (100.0, 50.0));
        assert_eq!(size, (400.0, 200.0));
    }

    #[test]
    fn contain_fits_inside() {
        let size = resolve_background_size(BackgroundSize::Contain, (300.0, 200.0), (100.0, 50.0));
        assert_eq!(size, (300.0, 150.0));
    }

    #[test]
    fn auto_axis_keeps_aspect() {
        let size = resolve_background_size(
            BackgroundSize::Explicit(SizeComponent::Length(Length::percent(50.0)), SizeComponent::Auto),
            (300.0, 200.0),
            (100.0, 50.0),
        );
        assert_eq!(size, (150.0, 75.0));
    }

    #[test]
    fn centered_origin() {
        let mut rules = BackgroundRules::default();
        rules.position.x = Length::percent(50.0);
        rules.position.y = Length::percent(50.0);
        let container = Rect {
            left: 10.0,
            top: 0.0,
            width: 300.0,
            height: 200.0,
        };
        assert_eq!(resolve_origin(&rules, &container, (400.0, 200.0)), (-40.0, 0.0));
    }

    #[test]
    fn ratio_of_empty_surface_is_unit() {
        assert_eq!(container_ratio((0, 0)), [1.0, 1.0]);
        assert_eq!(container_ratio((200, 100)), [1.0, 0.5]);
    }

    #[test]
    fn layout_floors_percent_size() {
        let element = ElementBox {
            client_width: 199.0,
            client_height: 100.0,
            ..ElementBox::default()
        };
        let layout = surface_layout(
            &element,
            Some(ContentBounds {
                x: 0.0,
                y: 0.0,
                width: 50.0,
                height: 33.0,
            }),
        );
        assert_eq!((layout.pixel_width, layout.pixel_height), (99, 33));
    }

    #[test]
    fn zero_sized_background_never_nan() {
        let inputs = BoundaryInputs {
            element: ElementBox::default(),
            viewport: Viewport::default(),
            rules: BackgroundRules::default(),
            image_size: (0.0, 0.0),
            content_bounds: None,
            surface_size: (0, 0),
        };
        let rect = compute_boundaries(&inputs);
        assert!(rect.top_left.iter().chain(&rect.bottom_right).all(|v| v.is_finite()));
    }
}
