//! 面部关键点数据模型
//!
//! 关键点坐标为帧归一化坐标（两个轴均为 0-1），索引语义由外部关键点模型固定。
//! 本模块只读取这些数据，不做任何修改。

use serde::{Deserialize, Serialize};

/// 单个关键点，序列化为 `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Landmark {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Landmark> for [f64; 2] {
    fn from(lm: Landmark) -> Self {
        [lm.x, lm.y]
    }
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// 计算点集的包围盒，空点集返回 `None`
    pub fn around<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Landmark>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(iter.fold(init, |b, p| Self {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// 单张人脸的关键点序列
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    /// 按索引取一组点；任一索引越界时返回 `None`
    pub fn select<const N: usize>(&self, indices: &[usize; N]) -> Option<[Landmark; N]> {
        let mut out = [Landmark::default(); N];
        for (slot, &idx) in out.iter_mut().zip(indices.iter()) {
            *slot = self.get(idx)?;
        }
        Some(out)
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::around(self.points.iter().copied())
    }
}

/// 帧的像素尺寸，用于把归一化坐标还原为像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDims {
    pub width: u32,
    pub height: u32,
}

impl FrameDims {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 单只眼睛的关键点索引：4 个虹膜点 + 8 个眼眶轮廓点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeIndices {
    pub iris: [usize; 4],
    pub contour: [usize; 8],
}

/// 左眼索引（478 点精细人脸网格）
pub const LEFT_EYE: EyeIndices = EyeIndices {
    iris: [469, 470, 471, 472],
    contour: [33, 133, 160, 159, 158, 144, 145, 153],
};

/// 右眼索引（478 点精细人脸网格）
pub const RIGHT_EYE: EyeIndices = EyeIndices {
    iris: [474, 475, 476, 477],
    contour: [362, 263, 387, 386, 385, 373, 374, 380],
};

/// 精细人脸网格的关键点总数
pub const REFINED_MESH_LANDMARKS: usize = 478;
