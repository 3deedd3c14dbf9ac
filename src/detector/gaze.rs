//! 视线分类模块
//!
//! 以眼眶轮廓的包围盒为参照系，计算虹膜质心在眼内的归一化位置
//! （0.5 为正中）。双眼水平位置的平均值足够接近正中时，视为在看屏幕。
//!
//! 退化包围盒（宽或高为 0）在该轴上的归一化位置固定为 0.5，
//! 关键点缺失时整只眼睛按居中处理。

use serde::Serialize;

use crate::detector::landmarks::{BoundingBox, EyeIndices, FaceLandmarks, LEFT_EYE, RIGHT_EYE};

/// 单只眼睛的归一化虹膜位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub normalized_x: f64,
    pub normalized_y: f64,
}

impl GazeSample {
    pub const CENTERED: Self = Self {
        normalized_x: 0.5,
        normalized_y: 0.5,
    };
}

/// 单张人脸的视线分类结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeVerdict {
    pub left: GazeSample,
    pub right: GazeSample,
    /// 双眼水平位置平均值
    pub avg_x: f64,
    pub looking_at_screen: bool,
    /// 置信度 (0.0 - 1.0)，正中为 1.0，阈值边界为 0.0
    pub confidence: f64,
}

/// 视线分类器
///
/// 只有水平偏移参与判定；垂直位置会计算但默认策略不使用。
#[derive(Debug, Clone)]
pub struct GazeClassifier {
    /// 与正中 (0.5) 的最大水平偏移，小于它视为看屏幕
    threshold: f64,
    left: EyeIndices,
    right: EyeIndices,
}

impl GazeClassifier {
    /// 使用精细人脸网格的默认眼部索引
    ///
    /// # 参数
    /// - `threshold`: 居中阈值，默认推荐 0.35
    pub fn new(threshold: f64) -> Self {
        Self::with_eyes(threshold, LEFT_EYE, RIGHT_EYE)
    }

    pub fn with_eyes(threshold: f64, left: EyeIndices, right: EyeIndices) -> Self {
        Self {
            threshold,
            left,
            right,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 计算单只眼睛的归一化虹膜位置
    ///
    /// `norm = (centroid - box_min) / (box_max - box_min)`，每个轴独立计算。
    pub fn eye_position(&self, face: &FaceLandmarks, eye: &EyeIndices) -> GazeSample {
        let (Some(iris), Some(contour)) = (face.select(&eye.iris), face.select(&eye.contour))
        else {
            return GazeSample::CENTERED;
        };

        let cx = iris.iter().map(|p| p.x).sum::<f64>() / iris.len() as f64;
        let cy = iris.iter().map(|p| p.y).sum::<f64>() / iris.len() as f64;

        let Some(bounds) = BoundingBox::around(contour) else {
            return GazeSample::CENTERED;
        };

        GazeSample {
            normalized_x: normalize_axis(cx, bounds.min_x, bounds.width()),
            normalized_y: normalize_axis(cy, bounds.min_y, bounds.height()),
        }
    }

    /// 分类一张人脸
    pub fn classify(&self, face: &FaceLandmarks) -> GazeVerdict {
        let left = self.eye_position(face, &self.left);
        let right = self.eye_position(face, &self.right);
        let avg_x = (left.normalized_x + right.normalized_x) / 2.0;

        GazeVerdict {
            left,
            right,
            avg_x,
            looking_at_screen: self.is_centered(avg_x),
            confidence: self.confidence(avg_x),
        }
    }

    /// `|avg_x - 0.5| < threshold`
    pub fn is_centered(&self, avg_x: f64) -> bool {
        (avg_x - 0.5).abs() < self.threshold
    }

    /// `clamp(1 - |avg_x - 0.5| / threshold, 0, 1)`
    pub fn confidence(&self, avg_x: f64) -> f64 {
        if self.threshold <= 0.0 {
            return 0.0;
        }
        let conf = 1.0 - (avg_x - 0.5).abs() / self.threshold;
        if conf.is_nan() {
            return 0.0;
        }
        conf.clamp(0.0, 1.0)
    }
}

fn normalize_axis(value: f64, min: f64, extent: f64) -> f64 {
    if extent > 0.0 {
        (value - min) / extent
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::landmarks::{Landmark, REFINED_MESH_LANDMARKS};

    /// 构造一张人脸：眼眶为 [0.4,0.6]x[0.4,0.5]，虹膜质心水平位置由 `iris_x` 决定
    fn face_with_iris(left_iris_x: f64, right_iris_x: f64) -> FaceLandmarks {
        let mut points = vec![Landmark::new(0.5, 0.45); REFINED_MESH_LANDMARKS];
        for eye in [LEFT_EYE, RIGHT_EYE] {
            for (i, &idx) in eye.contour.iter().enumerate() {
                let x = if i % 2 == 0 { 0.4 } else { 0.6 };
                let y = if i < 4 { 0.4 } else { 0.5 };
                points[idx] = Landmark::new(x, y);
            }
        }
        for &idx in &LEFT_EYE.iris {
            points[idx] = Landmark::new(left_iris_x, 0.45);
        }
        for &idx in &RIGHT_EYE.iris {
            points[idx] = Landmark::new(right_iris_x, 0.45);
        }
        FaceLandmarks::new(points)
    }

    #[test]
    fn perfectly_centered_gaze() {
        let classifier = GazeClassifier::new(0.35);
        let verdict = classifier.classify(&face_with_iris(0.5, 0.5));
        assert!((verdict.avg_x - 0.5).abs() < 1e-9);
        assert!(verdict.looking_at_screen);
        assert!((verdict.confidence - 1.0).abs() < 1e-9);
        assert!((verdict.left.normalized_y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn far_side_gaze_is_not_centered() {
        let classifier = GazeClassifier::new(0.35);
        assert!(!classifier.is_centered(0.86));
        assert_eq!(classifier.confidence(0.86), 0.0);

        // 0.4 + 0.2 * 0.9 = 0.58 -> normalized 0.9
        let verdict = classifier.classify(&face_with_iris(0.58, 0.58));
        assert!((verdict.avg_x - 0.9).abs() < 1e-9);
        assert!(!verdict.looking_at_screen);
    }

    #[test]
    fn confidence_scales_with_deviation() {
        let classifier = GazeClassifier::new(0.35);
        assert!((classifier.confidence(0.55) - (1.0 - 0.05 / 0.35)).abs() < 1e-9);
        assert!(classifier.confidence(0.45) > classifier.confidence(0.4));
        assert_eq!(classifier.confidence(0.0), 0.0);
        assert_eq!(classifier.confidence(1.0), 0.0);
    }

    #[test]
    fn degenerate_contour_width_is_centered() {
        let classifier = GazeClassifier::new(0.35);
        let mut points = vec![Landmark::new(0.5, 0.5); REFINED_MESH_LANDMARKS];
        for (i, &idx) in LEFT_EYE.contour.iter().enumerate() {
            points[idx] = Landmark::new(0.3, 0.4 + i as f64 * 0.01);
        }
        for &idx in &LEFT_EYE.iris {
            points[idx] = Landmark::new(0.9, 0.42);
        }
        let sample = classifier.eye_position(&FaceLandmarks::new(points), &LEFT_EYE);
        assert_eq!(sample.normalized_x, 0.5);
        assert!((sample.normalized_y - 0.2 / 0.7).abs() < 1e-9);
    }

    #[test]
    fn degenerate_contour_height_is_centered() {
        let classifier = GazeClassifier::new(0.35);
        let mut points = vec![Landmark::new(0.5, 0.5); REFINED_MESH_LANDMARKS];
        for (i, &idx) in RIGHT_EYE.contour.iter().enumerate() {
            points[idx] = Landmark::new(0.4 + i as f64 * 0.01, 0.3);
        }
        for &idx in &RIGHT_EYE.iris {
            points[idx] = Landmark::new(0.42, 0.9);
        }
        let sample = classifier.eye_position(&FaceLandmarks::new(points), &RIGHT_EYE);
        assert_eq!(sample.normalized_y, 0.5);
    }

    #[test]
    fn truncated_landmarks_fall_back_to_center() {
        let classifier = GazeClassifier::new(0.35);
        let face = FaceLandmarks::new(vec![Landmark::new(0.1, 0.1); 100]);
        let verdict = classifier.classify(&face);
        assert_eq!(verdict.left, GazeSample::CENTERED);
        assert_eq!(verdict.right, GazeSample::CENTERED);
        assert!(verdict.looking_at_screen);
    }
}
