use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use peek_guard::capture::replay::RecordedFrame;
use peek_guard::detector::landmarks::{LEFT_EYE, REFINED_MESH_LANDMARKS, RIGHT_EYE};
use peek_guard::detector::{FaceLandmarks, Landmark};

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// 归一化坐标下的一张人脸：包围盒左上角 (x, y)、边长 side，
/// `gaze_x` 为虹膜在眼眶内的水平位置（0.5 为正中）
pub fn face(x: f64, y: f64, side: f64, gaze_x: f64) -> FaceLandmarks {
    let mut points = vec![Landmark::new(x + side / 2.0, y + side / 2.0); REFINED_MESH_LANDMARKS];
    points[0] = Landmark::new(x, y);
    points[1] = Landmark::new(x + side, y + side);
    for eye in [LEFT_EYE, RIGHT_EYE] {
        for (i, &idx) in eye.contour.iter().enumerate() {
            let ex = if i % 2 == 0 { x + side * 0.2 } else { x + side * 0.4 };
            let ey = if i < 4 { y + side * 0.3 } else { y + side * 0.4 };
            points[idx] = Landmark::new(ex, ey);
        }
        for &idx in &eye.iris {
            points[idx] = Landmark::new(x + side * (0.2 + 0.2 * gaze_x), y + side * 0.35);
        }
    }
    FaceLandmarks::new(points)
}

/// 主用户 + 一个正看屏幕的旁观者
pub fn peeking_faces() -> Vec<FaceLandmarks> {
    vec![face(0.3, 0.2, 0.4, 0.5), face(0.05, 0.05, 0.15, 0.5)]
}

/// 主用户 + 一个看向别处的旁观者
pub fn averted_faces() -> Vec<FaceLandmarks> {
    vec![face(0.3, 0.2, 0.4, 0.5), face(0.05, 0.05, 0.15, 0.95)]
}

pub fn single_face() -> Vec<FaceLandmarks> {
    vec![face(0.3, 0.2, 0.4, 0.5)]
}

pub fn recorded(faces: Vec<FaceLandmarks>) -> RecordedFrame {
    RecordedFrame {
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        faces,
    }
}

pub fn frame_json(faces: Vec<FaceLandmarks>) -> Value {
    serde_json::to_value(recorded(faces)).expect("serialize frame")
}

/// 写出 JSONL 录制文件，每个元素一帧
pub fn write_recording(dir: &Path, name: &str, frames: Vec<Vec<FaceLandmarks>>) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create recording");
    for faces in frames {
        let line = serde_json::to_string(&recorded(faces)).expect("serialize frame");
        writeln!(file, "{line}").expect("write frame");
    }
    path
}
