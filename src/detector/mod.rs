pub mod analyzer;
pub mod gaze;
pub mod landmarks;
pub mod primary;

pub use analyzer::{AnalysisResult, FrameAnalyzer, Reason};
pub use gaze::{GazeClassifier, GazeSample, GazeVerdict};
pub use landmarks::{BoundingBox, EyeIndices, FaceLandmarks, FrameDims, Landmark};
pub use primary::{FaceRecord, PrimaryFaceSelector, RankedFaces};
