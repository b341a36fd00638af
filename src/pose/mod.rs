pub mod landmark;

pub use landmark::{FrameSize, Landmark, LandmarkIndex, LandmarkSet};

/// 1フレーム分の姿勢入力（ランドマーク + フレームサイズ + 時刻）
#[derive(Debug, Clone)]
pub struct PoseFrame {
    /// 単調増加するタイムスタンプ（秒）
    pub timestamp: f64,
    pub landmarks: LandmarkSet,
    pub frame: FrameSize,
}

impl PoseFrame {
    pub fn new(timestamp: f64, landmarks: LandmarkSet, frame: FrameSize) -> Self {
        Self { timestamp, landmarks, frame }
    }
}
