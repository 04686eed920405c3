#![cfg(not(target_arch = "wasm32"))]
//! Property-based invariants for the coordinate mapping.
//!
//! Verifies:
//! 1. Boundaries are finite and ordered for any non-degenerate element
//! 2. `cover` never maps the element outside the image
//! 3. `contain` always maps the whole image inside the element
//! 4. CSS parsing never panics on arbitrary input
//! 5. Drops inside the surface land inside clip space
//! 6. Surface layout never exceeds the element

use proptest::prelude::*;
use ripples_wasm::boundary::{compute_boundaries, surface_layout, BoundaryInputs};
use ripples_wasm::css::{extract_url, BackgroundRules};
use ripples_wasm::host::{ElementBox, Viewport};
use ripples_wasm::perturb::Impulse;
use ripples_wasm::ContentBounds;

const EPS: f32 = 1e-4;

fn arb_size_rule() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("cover".to_string()),
        Just("contain".to_string()),
        Just("auto".to_string()),
        (1u32..300).prop_map(|p| format!("{p}%")),
        (1u32..2000, 1u32..2000).prop_map(|(w, h)| format!("{w}px {h}px")),
    ]
}

fn arb_position_rule() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("center".to_string()),
        Just("left top".to_string()),
        Just("right 10px bottom 5%".to_string()),
        (0u32..=100, 0u32..=100).prop_map(|(x, y)| format!("{x}% {y}%")),
        (-500i32..500, -500i32..500).prop_map(|(x, y)| format!("{x}px {y}px")),
    ]
}

fn arb_element() -> impl Strategy<Value = ElementBox> {
    (0.0..2000.0f64, 0.0..5000.0f64, 1.0..2000.0f64, 1.0..2000.0f64).prop_map(
        |(page_left, page_top, client_width, client_height)| ElementBox {
            page_left,
            page_top,
            client_width,
            client_height,
        },
    )
}

fn arb_bounds() -> impl Strategy<Value = Option<ContentBounds>> {
    prop_oneof![
        Just(None),
        (0.0..50.0f64, 0.0..50.0f64, 1.0..50.0f64, 1.0..50.0f64).prop_map(|(x, y, width, height)| {
            Some(ContentBounds {
                x,
                y,
                width,
                height,
            })
        }),
    ]
}

fn inputs(
    element: ElementBox,
    size: &str,
    position: &str,
    attachment: &str,
    image: (f64, f64),
    content_bounds: Option<ContentBounds>,
) -> BoundaryInputs {
    let layout = surface_layout(&element, content_bounds);
    BoundaryInputs {
        element,
        viewport: Viewport {
            scroll_x: 0.0,
            scroll_y: element.page_top * 0.5,
            width: 1280.0,
            height: 720.0,
        },
        rules: BackgroundRules::parse(size, position, attachment),
        image_size: image,
        content_bounds,
        surface_size: (layout.pixel_width, layout.pixel_height),
    }
}

proptest! {
    #[test]
    fn boundaries_are_finite_and_ordered(
        element in arb_element(),
        size in arb_size_rule(),
        position in arb_position_rule(),
        fixed in any::<bool>(),
        image in (1.0..4000.0f64, 1.0..4000.0f64),
        bounds in arb_bounds(),
    ) {
        let attachment = if fixed { "fixed" } else { "scroll" };
        let rect = compute_boundaries(&inputs(element, &size, &position, attachment, image, bounds));
        for v in rect.top_left.iter().chain(&rect.bottom_right).chain(&rect.container_ratio) {
            prop_assert!(v.is_finite());
        }
        prop_assert!(rect.bottom_right[0] > rect.top_left[0]);
        prop_assert!(rect.bottom_right[1] > rect.top_left[1]);
        prop_assert!(rect.container_ratio.iter().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn cover_stays_inside_the_image(
        element in arb_element(),
        image in (1.0..4000.0f64, 1.0..4000.0f64),
        x in 0u32..=100,
        y in 0u32..=100,
    ) {
        let position = format!("{x}% {y}%");
        let rect = compute_boundaries(&inputs(element, "cover", &position, "scroll", image, None));
        prop_assert!(rect.top_left[0] >= -EPS && rect.top_left[1] >= -EPS);
        prop_assert!(rect.bottom_right[0] <= 1.0 + EPS && rect.bottom_right[1] <= 1.0 + EPS);
    }

    #[test]
    fn contain_covers_the_whole_image(
        element in arb_element(),
        image in (1.0..4000.0f64, 1.0..4000.0f64),
        x in 0u32..=100,
        y in 0u32..=100,
    ) {
        let position = format!("{x}% {y}%");
        let rect = compute_boundaries(&inputs(element, "contain", &position, "scroll", image, None));
        prop_assert!(rect.top_left[0] <= EPS && rect.top_left[1] <= EPS);
        prop_assert!(rect.bottom_right[0] >= 1.0 - EPS && rect.bottom_right[1] >= 1.0 - EPS);
    }

    #[test]
    fn css_parsing_never_panics(size in ".{0,40}", position in ".{0,40}", attachment in ".{0,12}") {
        let _ = BackgroundRules::parse(&size, &position, &attachment);
        let _ = extract_url(&size);
    }

    #[test]
    fn drops_inside_the_surface_land_in_clip_space(
        width in 1.0..3000.0f64,
        height in 1.0..3000.0f64,
        fx in 0.0..=1.0f64,
        fy in 0.0..=1.0f64,
        radius in 0.1..200.0f64,
    ) {
        let impulse = Impulse::from_pixels(fx * width, fy * height, radius, 0.1, width, height).unwrap();
        prop_assert!(impulse.center.iter().all(|c| (-1.0 - EPS..=1.0 + EPS).contains(c)));
        prop_assert!(impulse.radius > 0.0);
    }

    #[test]
    fn surface_layout_fits_the_element(element in arb_element(), bounds in arb_bounds()) {
        let layout = surface_layout(&element, bounds);
        prop_assert!(f64::from(layout.pixel_width) <= element.client_width);
        prop_assert!(f64::from(layout.pixel_height) <= element.client_height);
        prop_assert_eq!(layout.placement, bounds);
    }
}
