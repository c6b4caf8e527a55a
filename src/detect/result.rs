use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixel coordinates.
///
/// Detectors guarantee `x1 < x2` and `y1 < y2`; nothing downstream re-checks it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal center, floored to a whole pixel.
    pub fn center_x(&self) -> i32 {
        (self.x1 + self.x2).div_euclid(2)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> i64 {
        self.width().max(0) as i64 * self.height().max(0) as i64
    }

    /// Intersection over union, used by model backends for NMS.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter_w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0) as i64;
        let inter_h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0) as i64;
        let inter = inter_w * inter_h;
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            0.0
        } else {
            inter as f32 / union as f32
        }
    }
}

/// One detected object in one frame.
///
/// Detections carry no identity: they are produced fresh per frame and dropped
/// once the frame has been decided.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_floored() {
        let bbox = BoundingBox::new(189, 0, 192, 10);
        assert_eq!(bbox.center_x(), 190);
        assert_eq!(bbox.height(), 10);
        assert_eq!(BoundingBox::new(-3, 0, 0, 10).center_x(), -2);
    }

    #[test]
    fn iou_of_disjoint_and_identical_boxes() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(20, 20, 30, 30);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&a), 1.0);

        let half = BoundingBox::new(5, 0, 15, 10);
        assert!((a.iou(&half) - 1.0 / 3.0).abs() < 1e-6);
    }
}
