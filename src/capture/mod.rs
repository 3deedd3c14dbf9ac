//! 采集设备与关键点提供者的抽象
//!
//! 真实摄像头驱动和关键点模型都在本 crate 之外，通过这里的 trait 接入。
//! `replay` 提供基于录制文件的实现，供服务进程和测试使用。

pub mod replay;

use std::sync::Arc;

use crate::detector::{AnalysisResult, FaceLandmarks, FrameAnalyzer, FrameDims};

/// 一帧原始画面
///
/// `data` 的编码由采集设备与关键点提供者约定。
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 设备内单调递增的帧序号
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn dims(&self) -> FrameDims {
        FrameDims::new(self.width, self.height)
    }
}

/// 请求的采集参数，只是给设备的提示，不保证生效
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: crate::constants::DEFAULT_CAPTURE_WIDTH,
            height: crate::constants::DEFAULT_CAPTURE_HEIGHT,
            fps: crate::constants::DEFAULT_CAPTURE_FPS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Open(String),
    #[error("frame grab failed: {0}")]
    Read(String),
    #[error("capture stream ended")]
    EndOfStream,
}

/// 已打开的采集设备，drop 时释放
pub trait CaptureDevice: Send {
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// 打开采集设备的工厂，每次监控运行打开一次
pub trait CaptureSource: Send + Sync {
    fn open(&self, settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

/// 把一帧画面转换为按检测顺序排列的人脸关键点
///
/// 不会失败：检测不到人脸时返回空序列。
pub trait LandmarkProvider: Send + Sync {
    fn detect(&self, frame: &Frame) -> Vec<FaceLandmarks>;
}

/// 关键点提取 + 单帧分析
#[derive(Clone)]
pub struct FramePipeline {
    provider: Arc<dyn LandmarkProvider>,
    analyzer: FrameAnalyzer,
}

impl FramePipeline {
    pub fn new(provider: Arc<dyn LandmarkProvider>, analyzer: FrameAnalyzer) -> Self {
        Self { provider, analyzer }
    }

    pub fn analyzer(&self) -> &FrameAnalyzer {
        &self.analyzer
    }

    pub fn analyze(&self, frame: Option<&Frame>) -> AnalysisResult {
        let Some(frame) = frame else {
            return AnalysisResult::no_frame();
        };
        let faces = self.provider.detect(frame);
        self.analyzer.analyze(&faces, frame.dims())
    }
}
