use crate::detect::result::Detection;

/// Minimum confidence a detection must strictly exceed.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.55;

/// Labels worth telling the wearer about.
pub const DEFAULT_TARGET_LABELS: [&str; 8] = [
    "bottle",
    "cell phone",
    "person",
    "cup",
    "laptop",
    "mouse",
    "keyboard",
    "chair",
];

/// Keeps confident detections whose label is on the allow-list.
///
/// Labels match case-insensitively and kept detections carry the allow-list
/// spelling, so "Cup" from one backend and "cup" from another are the same
/// object to the arbiter. Order is preserved, so the arbiter's first-in-order
/// tie-break still sees detector order.
#[derive(Clone, Debug)]
pub struct DetectionFilter {
    threshold: f32,
    allow_list: Vec<String>,
}

impl DetectionFilter {
    pub fn new<I, S>(threshold: f32, allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            threshold,
            allow_list: allow_list
                .into_iter()
                .map(|label| label.into().trim().to_lowercase())
                .collect(),
        }
    }

    fn canonical_label(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.allow_list
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(label))
            .map(String::as_str)
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.confidence > self.threshold && self.canonical_label(&detection.label).is_some()
    }

    pub fn filter(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|detection| detection.confidence > self.threshold)
            .filter_map(|mut detection| {
                let label = self.canonical_label(&detection.label)?;
                if label != detection.label {
                    detection.label = label.to_string();
                }
                Some(detection)
            })
            .collect()
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TARGET_LABELS)
    }
}
