//! Coordinate transformation between PDF field rectangles and preview pixels
//!
//! PDF field rectangles live in point space with a bottom-left origin,
//! relative to the unrotated page. Previews are raster images of the page
//! as a viewer shows it: rotated by `/Rotate`, cropped to the CropBox, with
//! a top-left origin.

use formfill_types::{FieldRect, PageGeometry, RenderedPreview, Rotation, ScreenRect};
use serde::Serialize;

/// Relative aspect-ratio deviation above which a preview is flagged
pub const ASPECT_TOLERANCE: f64 = 0.02;

/// Preview aspect ratio disagrees with the page box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AspectMismatch {
    /// Width / height of the displayed (rotation-aware) page box
    pub expected: f64,
    /// Width / height of the preview image
    pub actual: f64,
    /// `|actual / expected - 1|`
    pub deviation: f64,
}

/// Overlay rectangle plus any geometry diagnostic for it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayPlacement {
    pub rect: ScreenRect,
    pub aspect_mismatch: Option<AspectMismatch>,
}

/// Page size in points as displayed, with width and height swapped for quarter turns
pub fn displayed_size(page: &PageGeometry) -> (f64, f64) {
    if page.rotation.swaps_axes() {
        (page.box_height, page.box_width)
    } else {
        (page.box_width, page.box_height)
    }
}

/// Largest preview with the displayed page aspect that fits the given bounds
pub fn fit_preview(page: &PageGeometry, max_width: f64, max_height: Option<f64>) -> RenderedPreview {
    let (display_w, display_h) = displayed_size(page);
    let scale = match max_height {
        Some(max_height) => (max_width / display_w).min(max_height / display_h),
        None => max_width / display_w,
    };
    RenderedPreview::new(display_w * scale, display_h * scale)
}

/// Check the preview aspect ratio against the displayed page box
pub fn check_aspect(page: &PageGeometry, preview: &RenderedPreview) -> Option<AspectMismatch> {
    if !preview.is_ready() {
        return None;
    }

    let (display_w, display_h) = displayed_size(page);
    let expected = display_w / display_h;
    let actual = preview.pixel_width / preview.pixel_height;
    let deviation = (actual / expected - 1.0).abs();

    (deviation > ASPECT_TOLERANCE).then_some(AspectMismatch {
        expected,
        actual,
        deviation,
    })
}

/// Map a field rectangle onto the preview image
///
/// Returns `ScreenRect::ZERO` while the preview has no size. Zero-area
/// fields map to zero-area rectangles.
pub fn field_to_screen(
    field: &FieldRect,
    page: &PageGeometry,
    preview: &RenderedPreview,
) -> ScreenRect {
    if !preview.is_ready() {
        return ScreenRect::ZERO;
    }

    let (scale_x, scale_y) = scales(page, preview);
    let (box_w, box_h) = (page.box_width, page.box_height);

    // Re-base into crop-box-local space
    let fx = field.x - page.box_x;
    let fy = field.y - page.box_y;
    let (w, h) = (field.width, field.height);

    // (x, y, width, height) in the rotated page's bottom-left space, plus its vertical extent
    let (rx, ry, rw, rh, extent) = match page.rotation {
        Rotation::Deg0 => (fx, fy, w, h, box_h),
        Rotation::Deg90 => (fy, box_w - (fx + w), h, w, box_w),
        Rotation::Deg180 => (box_w - (fx + w), box_h - (fy + h), w, h, box_h),
        Rotation::Deg270 => (box_h - (fy + h), fx, h, w, box_w),
    };

    let top = extent - ry - rh;

    ScreenRect::new(rx * scale_x, top * scale_y, rw * scale_x, rh * scale_y)
}

/// Map a preview rectangle back to a field rectangle in PDF points
///
/// Returns `None` while the preview has no size.
pub fn screen_to_field(
    rect: &ScreenRect,
    page: &PageGeometry,
    preview: &RenderedPreview,
) -> Option<FieldRect> {
    if !preview.is_ready() {
        return None;
    }

    let (scale_x, scale_y) = scales(page, preview);
    let (box_w, box_h) = (page.box_width, page.box_height);

    let rx = rect.left / scale_x;
    let rw = rect.width / scale_x;
    let rh = rect.height / scale_y;
    let top = rect.top / scale_y;

    let (fx, fy, w, h) = match page.rotation {
        Rotation::Deg0 => (rx, box_h - top - rh, rw, rh),
        Rotation::Deg90 => {
            let ry = box_w - top - rh;
            (box_w - ry - rh, rx, rh, rw)
        }
        Rotation::Deg180 => {
            let ry = box_h - top - rh;
            (box_w - rx - rw, box_h - ry - rh, rw, rh)
        }
        Rotation::Deg270 => {
            let ry = box_w - top - rh;
            (ry, box_h - rx - rw, rh, rw)
        }
    };

    Some(FieldRect::new(fx + page.box_x, fy + page.box_y, w, h))
}

/// Transform with diagnostics: the rectangle is always produced, a skewed preview is flagged
pub fn place_overlay(
    field: &FieldRect,
    page: &PageGeometry,
    preview: &RenderedPreview,
) -> OverlayPlacement {
    let aspect_mismatch = check_aspect(page, preview);
    if let Some(mismatch) = &aspect_mismatch {
        tracing::warn!(
            page = page.page_number,
            rotation = page.rotation.degrees(),
            expected = mismatch.expected,
            actual = mismatch.actual,
            "Preview aspect ratio does not match page box; overlay may be misaligned"
        );
    }

    OverlayPlacement {
        rect: field_to_screen(field, page, preview),
        aspect_mismatch,
    }
}

/// Pixels per point along the preview's horizontal and vertical axes
fn scales(page: &PageGeometry, preview: &RenderedPreview) -> (f64, f64) {
    let (display_w, display_h) = displayed_size(page);
    (
        preview.pixel_width / display_w,
        preview.pixel_height / display_h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a4(rotation: Rotation) -> PageGeometry {
        PageGeometry::new(1, rotation, 0.0, 0.0, 595.0, 842.0).unwrap()
    }

    fn field() -> FieldRect {
        FieldRect::new(10.0, 20.0, 100.0, 30.0)
    }

    fn assert_rect_close(actual: FieldRect, expected: FieldRect) {
        let tolerance = 1e-9;
        assert!((actual.x - expected.x).abs() < tolerance, "x: {:?} vs {:?}", actual, expected);
        assert!((actual.y - expected.y).abs() < tolerance, "y: {:?} vs {:?}", actual, expected);
        assert!((actual.width - expected.width).abs() < tolerance, "w: {:?} vs {:?}", actual, expected);
        assert!((actual.height - expected.height).abs() < tolerance, "h: {:?} vs {:?}", actual, expected);
    }

    #[test]
    fn test_rotation_0_a4_at_double_scale() {
        let rect = field_to_screen(&field(), &a4(Rotation::Deg0), &RenderedPreview::new(1190.0, 1684.0));
        assert_eq!(rect, ScreenRect::new(20.0, 1584.0, 200.0, 60.0));
    }

    #[test]
    fn test_rotation_90_swaps_axes() {
        let rect = field_to_screen(&field(), &a4(Rotation::Deg90), &RenderedPreview::new(1684.0, 1190.0));
        assert_eq!(rect, ScreenRect::new(40.0, 20.0, 60.0, 200.0));
    }

    #[test]
    fn test_rotation_180_mirrors_both_axes() {
        let rect = field_to_screen(&field(), &a4(Rotation::Deg180), &RenderedPreview::new(1190.0, 1684.0));
        assert_eq!(rect, ScreenRect::new(970.0, 40.0, 200.0, 60.0));
    }

    #[test]
    fn test_rotation_270_counter_rotates() {
        let rect = field_to_screen(&field(), &a4(Rotation::Deg270), &RenderedPreview::new(1684.0, 1190.0));
        assert_eq!(rect, ScreenRect::new(1584.0, 970.0, 60.0, 200.0));
    }

    #[test]
    fn test_rotation_90_round_trip() {
        let page = a4(Rotation::Deg90);
        let preview = RenderedPreview::new(1684.0, 1190.0);
        let rect = field_to_screen(&field(), &page, &preview);
        let back = screen_to_field(&rect, &page, &preview).unwrap();
        assert_rect_close(back, field());
    }

    #[test]
    fn test_crop_box_offset_is_subtracted() {
        let page = PageGeometry::new(1, Rotation::Deg0, 50.0, 100.0, 500.0, 700.0).unwrap();
        let field = FieldRect::new(60.0, 120.0, 100.0, 30.0);
        let rect = field_to_screen(&field, &page, &RenderedPreview::new(500.0, 700.0));
        assert_eq!(rect, ScreenRect::new(10.0, 650.0, 100.0, 30.0));
    }

    #[test]
    fn test_zero_area_field_is_not_clamped() {
        let zero = FieldRect::new(10.0, 20.0, 0.0, 0.0);
        let rect = field_to_screen(&zero, &a4(Rotation::Deg0), &RenderedPreview::new(595.0, 842.0));
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
    }

    #[test]
    fn test_unloaded_preview_yields_sentinel() {
        let page = a4(Rotation::Deg0);
        assert_eq!(
            field_to_screen(&field(), &page, &RenderedPreview::new(0.0, 0.0)),
            ScreenRect::ZERO
        );
        assert!(screen_to_field(&ScreenRect::ZERO, &page, &RenderedPreview::default()).is_none());
    }

    #[test]
    fn test_aspect_mismatch_flagged_for_every_rotation() {
        for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
            let page = a4(rotation);
            // Square preview cannot match an A4 page in any orientation
            let placement = place_overlay(&field(), &page, &RenderedPreview::new(800.0, 800.0));
            assert!(placement.aspect_mismatch.is_some(), "rotation {:?}", rotation);
            assert!(placement.rect.width > 0.0);
        }
    }

    #[test]
    fn test_matching_aspect_not_flagged() {
        let page = a4(Rotation::Deg90);
        let placement = place_overlay(&field(), &page, &RenderedPreview::new(842.0, 595.0));
        assert!(placement.aspect_mismatch.is_none());

        // Unrotated preview of a rotated page is a geometry bug upstream
        let placement = place_overlay(&field(), &page, &RenderedPreview::new(595.0, 842.0));
        assert!(placement.aspect_mismatch.is_some());
    }

    #[test]
    fn test_fit_preview_keeps_displayed_aspect() {
        let preview = fit_preview(&a4(Rotation::Deg270), 1684.0, None);
        assert_eq!(preview, RenderedPreview::new(1684.0, 1190.0));

        let bounded = fit_preview(&a4(Rotation::Deg0), 1000.0, Some(842.0));
        assert_eq!(bounded, RenderedPreview::new(595.0, 842.0));
        assert!(check_aspect(&a4(Rotation::Deg0), &bounded).is_none());
    }
}
