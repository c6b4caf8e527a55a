use crate::detect::BoundingBox;

pub const DEFAULT_DANGER_HEIGHT: i32 = 400;

/// Height-based closeness heuristic.
///
/// A box that fills most of the frame vertically is treated as close. There is
/// no depth estimate behind this.
#[derive(Clone, Copy, Debug)]
pub struct ProximityEstimator {
    danger_height: i32,
}

impl ProximityEstimator {
    pub fn new(danger_height: i32) -> Self {
        Self { danger_height }
    }

    pub fn is_danger_close(&self, bbox: &BoundingBox) -> bool {
        bbox.height() > self.danger_height
    }
}

impl Default for ProximityEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_DANGER_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn danger_threshold_is_strict() {
        let estimator = ProximityEstimator::default();
        assert!(!estimator.is_danger_close(&BoundingBox::new(0, 40, 100, 440)));
        assert!(estimator.is_danger_close(&BoundingBox::new(0, 40, 100, 441)));
    }

    #[test]
    fn width_does_not_matter() {
        let estimator = ProximityEstimator::default();
        assert!(!estimator.is_danger_close(&BoundingBox::new(0, 0, 640, 300)));
    }
}
