#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::Frame;

/// COCO class names in YOLOv8 output order.
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Tract-based YOLOv8 detector.
///
/// Loads a local ONNX export (`1x3xSxS` input, `1x(4+C)xN` output), resizes
/// each frame to the square model input and decodes boxes back into frame
/// pixel coordinates. Output is sorted by confidence after class-aware NMS.
/// No network I/O; nothing is written to disk.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    score_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            score_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        })
    }

    /// Raw score cut applied before NMS. The focus filter applies its own,
    /// stricter threshold afterwards.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let side = self.input_size as usize;
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let pixels = frame.pixels();

        // Nearest-neighbour stretch to the square model input.
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            let sx = (x * src_w / side).min(src_w - 1);
            let sy = (y * src_h / side).min(src_h - 1);
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, output: &Tensor, frame_w: u32, frame_h: u32) -> Result<Vec<Detection>> {
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let classes = shape[1] - 4;
        let anchors = shape[2];
        let sx = frame_w as f32 / self.input_size as f32;
        let sy = frame_h as f32 / self.input_size as f32;

        let mut candidates = Vec::new();
        for i in 0..anchors {
            let (class, score) = (0..classes)
                .map(|c| (c, view[[0, 4 + c, i]]))
                .fold((0, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 {
                        cur
                    } else {
                        best
                    }
                });
            if score.is_nan() || score <= self.score_threshold {
                continue;
            }
            let cx = view[[0, 0, i]];
            let cy = view[[0, 1, i]];
            let w = view[[0, 2, i]];
            let h = view[[0, 3, i]];
            let bbox = BoundingBox::new(
                clamp_coord((cx - w / 2.0) * sx, frame_w),
                clamp_coord((cy - h / 2.0) * sy, frame_h),
                clamp_coord((cx + w / 2.0) * sx, frame_w),
                clamp_coord((cy + h / 2.0) * sy, frame_h),
            );
            if bbox.width() <= 0 || bbox.height() <= 0 {
                continue;
            }
            let label = COCO_LABELS
                .get(class)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("class_{}", class));
            candidates.push(Detection::new(label, score, bbox));
        }

        Ok(non_max_suppression(
            candidates,
            self.iou_threshold,
            self.max_detections,
        ))
    }
}

fn clamp_coord(value: f32, limit: u32) -> i32 {
    value.round().clamp(0.0, limit as f32) as i32
}

/// Greedy class-aware NMS, highest confidence first.
pub(crate) fn non_max_suppression(
    mut items: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut picked: Vec<Detection> = Vec::new();
    'outer: for det in items {
        for kept in &picked {
            if kept.label == det.label && kept.bbox.iou(&det.bbox) >= iou_threshold {
                continue 'outer;
            }
        }
        picked.push(det);
        if picked.len() >= max_detections {
            break;
        }
    }
    picked
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        self.decode(output, frame.width, frame.height)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size as usize;
        let blank = Tensor::zero::<f32>(&[1, 3, side, side])?;
        self.model
            .run(tvec!(blank.into()))
            .context("ONNX warm-up failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_keeps_best_of_overlapping_same_class() {
        let a = Detection::new("cup", 0.7, BoundingBox::new(0, 0, 100, 100));
        let b = Detection::new("cup", 0.9, BoundingBox::new(5, 5, 105, 105));
        let c = Detection::new("bottle", 0.8, BoundingBox::new(5, 5, 105, 105));

        let kept = non_max_suppression(vec![a, b, c], 0.45, 10);
        let summary: Vec<_> = kept
            .iter()
            .map(|d| (d.label.as_str(), d.confidence))
            .collect();
        assert_eq!(summary, vec![("cup", 0.9), ("bottle", 0.8)]);
    }

    #[test]
    fn coco_table_contains_default_targets() {
        for label in crate::detect::DEFAULT_TARGET_LABELS {
            assert!(COCO_LABELS.contains(&label), "{label} missing");
        }
    }
}
