mod backend;
pub mod backends;
mod filter;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::{ScriptedBackend, StubBackend};
pub use filter::{DetectionFilter, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TARGET_LABELS};
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection};
