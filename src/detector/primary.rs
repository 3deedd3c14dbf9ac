//! 主用户识别
//!
//! 按人脸包围盒的像素面积降序排列，最大者视为主用户（离摄像头最近），
//! 不参与视线判定；其余人脸为候选旁观者。
//!
//! 面积相同时保持检测顺序（稳定排序），先检测到的人脸为主用户。

use crate::detector::landmarks::{FaceLandmarks, FrameDims};

/// 单帧内一张人脸的派生数据，分析完即丢弃
#[derive(Debug, Clone, Copy)]
pub struct FaceRecord<'a> {
    pub landmarks: &'a FaceLandmarks,
    /// 关键点包围盒面积（像素²）
    pub size: f64,
    /// 关键点均值（像素坐标）
    pub center: (f64, f64),
    /// 在检测序列中的原始位置
    pub detection_index: usize,
}

impl<'a> FaceRecord<'a> {
    pub fn measure(landmarks: &'a FaceLandmarks, dims: FrameDims, detection_index: usize) -> Self {
        let w = f64::from(dims.width);
        let h = f64::from(dims.height);

        let size = landmarks
            .bounds()
            .map(|b| (b.width() * w) * (b.height() * h))
            .filter(|s| s.is_finite())
            .unwrap_or(0.0);

        let center = if landmarks.is_empty() {
            (0.0, 0.0)
        } else {
            let n = landmarks.len() as f64;
            let (sx, sy) = landmarks
                .points()
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x * w, sy + p.y * h));
            (sx / n, sy / n)
        };

        Self {
            landmarks,
            size,
            center,
            detection_index,
        }
    }
}

/// 按面积排序后的人脸集合
#[derive(Debug, Clone)]
pub struct RankedFaces<'a> {
    records: Vec<FaceRecord<'a>>,
}

impl<'a> RankedFaces<'a> {
    pub fn primary(&self) -> Option<&FaceRecord<'a>> {
        self.records.first()
    }

    /// 除主用户外的所有人脸，按面积降序
    pub fn observers(&self) -> &[FaceRecord<'a>] {
        self.records.get(1..).unwrap_or(&[])
    }

    pub fn records(&self) -> &[FaceRecord<'a>] {
        &self.records
    }
}

/// 主用户选择器
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryFaceSelector;

impl PrimaryFaceSelector {
    pub fn rank<'a>(&self, faces: &'a [FaceLandmarks], dims: FrameDims) -> RankedFaces<'a> {
        let mut records: Vec<FaceRecord<'a>> = faces
            .iter()
            .enumerate()
            .map(|(i, face)| FaceRecord::measure(face, dims, i))
            .collect();

        // sort_by 是稳定排序，面积相同保持检测顺序
        records.sort_by(|a, b| b.size.total_cmp(&a.size));

        RankedFaces { records }
    }
}
