//! 单帧分析
//!
//! 组合主用户识别与视线分类，得到每帧的结论。无跨帧状态，
//! 相同输入必然得到相同输出。

use serde::{Deserialize, Serialize};

use crate::detector::gaze::GazeClassifier;
use crate::detector::landmarks::{FaceLandmarks, FrameDims};
use crate::detector::primary::PrimaryFaceSelector;

/// 帧结论原因，每个结果恰好一个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoFrame,
    NoFaces,
    SingleFace,
    GazeAtScreen,
    MultipleFacesNotLooking,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoFrame => "no_frame",
            Self::NoFaces => "no_faces",
            Self::SingleFace => "single_face",
            Self::GazeAtScreen => "gaze_at_screen",
            Self::MultipleFacesNotLooking => "multiple_faces_not_looking",
        }
    }
}

/// 单帧分析结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 检测到的人脸总数（含主用户）
    pub face_count: usize,
    pub peeking: bool,
    /// 置信度 (0.0 - 1.0)
    pub confidence: f64,
    pub reason: Reason,
}

impl AnalysisResult {
    fn quiet(face_count: usize, reason: Reason) -> Self {
        Self {
            face_count,
            peeking: false,
            confidence: 0.0,
            reason,
        }
    }

    pub fn no_frame() -> Self {
        Self::quiet(0, Reason::NoFrame)
    }
}

/// 帧分析器
#[derive(Debug, Clone)]
pub struct FrameAnalyzer {
    selector: PrimaryFaceSelector,
    classifier: GazeClassifier,
}

impl FrameAnalyzer {
    pub fn new(classifier: GazeClassifier) -> Self {
        Self {
            selector: PrimaryFaceSelector,
            classifier,
        }
    }

    pub fn with_threshold(gaze_threshold: f64) -> Self {
        Self::new(GazeClassifier::new(gaze_threshold))
    }

    pub fn classifier(&self) -> &GazeClassifier {
        &self.classifier
    }

    /// 分析一帧中的全部人脸
    ///
    /// - 0 张脸 → `no_faces`
    /// - 1 张脸 → `single_face`（单独一人不构成被窥视）
    /// - ≥2 张脸 → 任一候选旁观者在看屏幕即 `gaze_at_screen`，
    ///   置信度取所有命中候选中的最大值
    pub fn analyze(&self, faces: &[FaceLandmarks], dims: FrameDims) -> AnalysisResult {
        match faces.len() {
            0 => return AnalysisResult::quiet(0, Reason::NoFaces),
            1 => return AnalysisResult::quiet(1, Reason::SingleFace),
            _ => {}
        }

        let ranked = self.selector.rank(faces, dims);

        let best = ranked
            .observers()
            .iter()
            .map(|record| self.classifier.classify(record.landmarks))
            .filter(|verdict| verdict.looking_at_screen)
            .map(|verdict| verdict.confidence)
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |m| m.max(c))));

        match best {
            Some(confidence) => AnalysisResult {
                face_count: faces.len(),
                peeking: true,
                confidence,
                reason: Reason::GazeAtScreen,
            },
            None => AnalysisResult::quiet(faces.len(), Reason::MultipleFacesNotLooking),
        }
    }
}
