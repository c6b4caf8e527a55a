use crate::detect::BoundingBox;

pub const DEFAULT_ZONE_HALF_WIDTH: u32 = 130;
pub const DEFAULT_ZONE_MARGIN: u32 = 50;

/// Vertical band in the middle of the frame where detections are actionable.
///
/// Fixed for the session once the frame size is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FocusZone {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl FocusZone {
    pub fn for_frame(width: u32, height: u32, half_width: u32, margin: u32) -> Self {
        let center = (width / 2) as i32;
        Self {
            x1: center - half_width as i32,
            y1: margin as i32,
            x2: center + half_width as i32,
            y2: height as i32 - margin as i32,
        }
    }

    /// Strictly inside on the horizontal axis; a center on the edge is peripheral.
    /// Vertical position and box width play no part.
    pub fn contains_center(&self, bbox: &BoundingBox) -> bool {
        let cx = bbox.center_x();
        self.x1 < cx && cx < self.x2
    }
}
