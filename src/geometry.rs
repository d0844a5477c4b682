use serde::{Deserialize, Serialize};

use crate::error::StampError;

/// Relative placement box on a page: origin top-left, all four fields are
/// fractions of the page dimensions. Values outside [0,1] are accepted and
/// may place the box off-page; that is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementBox {
    #[serde(rename = "xPct")]
    pub x_pct: f64,
    #[serde(rename = "yPct")]
    pub y_pct: f64,
    #[serde(rename = "wPct")]
    pub w_pct: f64,
    #[serde(rename = "hPct")]
    pub h_pct: f64,
}

/// Absolute draw rectangle in PDF user space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Maps a relative placement box and the signature's native dimensions to
/// the absolute rectangle the image is drawn into.
///
/// The image is scaled to fit the box without distortion: whichever axis is
/// relatively larger gets pinned to the box bound, the other is derived from
/// the image aspect ratio, and the leftover space on the loose axis is split
/// evenly. The vertical result also flips the top-origin `y_pct` into
/// bottom-origin user space.
pub fn resolve(
    page_width: f64,
    page_height: f64,
    placement: &PlacementBox,
    image_width: f64,
    image_height: f64,
) -> Result<DrawRect, StampError> {
    if !(page_width > 0.0) || !(page_height > 0.0) {
        return Err(StampError::InvalidGeometry(format!(
            "page dimensions {page_width}x{page_height}"
        )));
    }
    if !(image_width > 0.0) || !(image_height > 0.0) {
        return Err(StampError::InvalidGeometry(format!(
            "image dimensions {image_width}x{image_height}"
        )));
    }

    let box_width = placement.w_pct * page_width;
    let box_height = placement.h_pct * page_height;
    if !(box_height > 0.0) || !box_width.is_finite() || !box_height.is_finite() {
        return Err(StampError::InvalidGeometry(format!(
            "placement box {box_width}x{box_height}"
        )));
    }

    let image_ratio = image_width / image_height;
    let box_ratio = box_width / box_height;

    let (draw_width, draw_height) = if image_ratio > box_ratio {
        // Image is relatively wider than the box: pin the width.
        (box_width, box_width / image_ratio)
    } else {
        // Relatively taller or equal: pin the height.
        (box_height * image_ratio, box_height)
    };

    let x = placement.x_pct * page_width + (box_width - draw_width) / 2.0;
    let y = page_height
        - placement.y_pct * page_height
        - draw_height
        - (box_height - draw_height) / 2.0;

    Ok(DrawRect {
        x,
        y,
        width: draw_width,
        height: draw_height,
    })
}
