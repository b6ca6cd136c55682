//! ONNX Runtime backed collaborators for `outfit_common`.

pub mod preprocess;
pub mod segmenter;
pub mod session;
pub mod yolo;

pub use segmenter::{OnnxSegmenter, SegmenterConfig};
pub use session::{init_runtime, load_session};
pub use yolo::{LocatorConfig, YoloLocator};
