//! 录制回放后端
//!
//! 录制文件为 JSON Lines，每行一帧：
//! `{"width":640,"height":480,"faces":[[[x,y],...], ...]}`，空行忽略。
//!
//! `ReplaySource` 打开时一次性加载并校验整个文件；产出的帧把该帧的人脸数据
//! 编码在 `Frame::data` 中，由 `RecordedLandmarks` 解码。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureDevice, CaptureError, CaptureSettings, CaptureSource, Frame, LandmarkProvider};
use crate::detector::{FaceLandmarks, FrameDims};

/// 录制中的一帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

impl RecordedFrame {
    pub fn dims(&self) -> FrameDims {
        FrameDims::new(self.width, self.height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read recording {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed recording at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid frame at line {line}: {message}")]
    InvalidFrame { line: usize, message: String },
    #[error("recording has no frames")]
    Empty,
}

impl From<ReplayError> for CaptureError {
    fn from(value: ReplayError) -> Self {
        CaptureError::Open(value.to_string())
    }
}

/// 解析整个录制文本
pub fn parse_recording(text: &str) -> Result<Vec<RecordedFrame>, ReplayError> {
    let mut frames = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let frame: RecordedFrame =
            serde_json::from_str(raw).map_err(|source| ReplayError::Malformed { line, source })?;
        if frame.width == 0 || frame.height == 0 {
            return Err(ReplayError::InvalidFrame {
                line,
                message: "width and height must be > 0".to_string(),
            });
        }
        frames.push(frame);
    }
    if frames.is_empty() {
        return Err(ReplayError::Empty);
    }
    Ok(frames)
}

pub fn load_recording(path: &Path) -> Result<Vec<RecordedFrame>, ReplayError> {
    let text = fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_recording(&text)
}

/// 基于录制文件的采集源
#[derive(Debug, Clone)]
pub struct ReplaySource {
    path: PathBuf,
    looped: bool,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, looped: bool) -> Self {
        Self {
            path: path.into(),
            looped,
        }
    }
}

impl CaptureSource for ReplaySource {
    fn open(&self, settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let recorded = load_recording(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            frames = recorded.len(),
            looped = self.looped,
            requested_width = settings.width,
            requested_height = settings.height,
            requested_fps = settings.fps,
            "Opened replay recording"
        );
        Ok(Box::new(ReplayDevice::new(recorded, self.looped)?))
    }
}

/// 回放设备：按顺序产出录制帧
pub struct ReplayDevice {
    frames: Vec<(u32, u32, Vec<u8>)>,
    cursor: usize,
    next_seq: u64,
    looped: bool,
}

impl ReplayDevice {
    pub fn new(recorded: Vec<RecordedFrame>, looped: bool) -> Result<Self, CaptureError> {
        let frames = recorded
            .into_iter()
            .map(|f| {
                serde_json::to_vec(&f.faces)
                    .map(|data| (f.width, f.height, data))
                    .map_err(|e| CaptureError::Open(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            frames,
            cursor: 0,
            next_seq: 0,
            looped,
        })
    }
}

impl CaptureDevice for ReplayDevice {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.cursor >= self.frames.len() {
            if !self.looped || self.frames.is_empty() {
                return Err(CaptureError::EndOfStream);
            }
            self.cursor = 0;
        }

        let (width, height, data) = &self.frames[self.cursor];
        self.cursor += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        Ok(Frame {
            seq,
            width: *width,
            height: *height,
            data: data.clone(),
        })
    }
}

impl Drop for ReplayDevice {
    fn drop(&mut self) {
        tracing::debug!(frames_read = self.next_seq, "Replay device released");
    }
}

/// 解码回放帧中携带的人脸关键点
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedLandmarks;

impl LandmarkProvider for RecordedLandmarks {
    fn detect(&self, frame: &Frame) -> Vec<FaceLandmarks> {
        match serde_json::from_slice(&frame.data) {
            Ok(faces) => faces,
            Err(e) => {
                tracing::debug!(seq = frame.seq, error = %e, "Frame carries no recorded landmarks");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const TWO_FRAMES: &str = r#"{"width":640,"height":480,"faces":[]}

{"width":320,"height":240,"faces":[[[0.1,0.1],[0.2,0.2]],[[0.5,0.5]]]}
"#;

    #[test]
    fn parses_lines_and_skips_blanks() {
        let frames = parse_recording(TWO_FRAMES).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].dims(), FrameDims::new(320, 240));
        assert_eq!(frames[1].faces.len(), 2);
    }

    #[test]
    fn reports_malformed_line_number() {
        let err = parse_recording("{\"width\":1,\"height\":1}\nnot json\n").unwrap_err();
        assert!(matches!(err, ReplayError::Malformed { line: 2, .. }));
    }

    #[test]
    fn rejects_empty_and_zero_sized_recordings() {
        assert!(matches!(parse_recording("\n\n"), Err(ReplayError::Empty)));
        assert!(matches!(
            parse_recording("{\"width\":0,\"height\":480}"),
            Err(ReplayError::InvalidFrame { line: 1, .. })
        ));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let source = ReplaySource::new("/nonexistent/peek-guard/recording.jsonl", true);
        let err = source.open(&CaptureSettings::default()).err().unwrap();
        assert!(matches!(err, CaptureError::Open(_)));
    }

    #[test]
    fn device_replays_in_order_and_stops() {
        let mut device = ReplayDevice::new(parse_recording(TWO_FRAMES).unwrap(), false).unwrap();
        let first = device.read_frame().unwrap();
        let second = device.read_frame().unwrap();
        assert_eq!((first.seq, first.width), (0, 640));
        assert_eq!((second.seq, second.width), (1, 320));
        assert!(matches!(device.read_frame(), Err(CaptureError::EndOfStream)));
        assert!(matches!(device.read_frame(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn looped_device_wraps_around() {
        let mut device = ReplayDevice::new(parse_recording(TWO_FRAMES).unwrap(), true).unwrap();
        let seqs: Vec<(u64, u32)> = (0..5)
            .map(|_| device.read_frame().map(|f| (f.seq, f.width)).unwrap())
            .collect();
        assert_eq!(seqs, vec![(0, 640), (1, 320), (2, 640), (3, 320), (4, 640)]);
    }

    #[test]
    fn provider_decodes_recorded_faces() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_FRAMES.as_bytes()).unwrap();

        let source = ReplaySource::new(file.path(), false);
        let mut device = source.open(&CaptureSettings::default()).unwrap();
        let provider = RecordedLandmarks;

        assert!(provider.detect(&device.read_frame().unwrap()).is_empty());
        let faces = provider.detect(&device.read_frame().unwrap());
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].len(), 1);
    }

    #[test]
    fn provider_never_fails_on_foreign_payload() {
        let frame = Frame {
            seq: 7,
            width: 640,
            height: 480,
            data: vec![0xff, 0xd8, 0xff],
        };
        assert!(RecordedLandmarks.detect(&frame).is_empty());
    }
}
