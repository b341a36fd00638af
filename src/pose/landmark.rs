use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 33点ボディトポロジーのランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub const ALL: [LandmarkIndex; LandmarkIndex::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight, LeftShoulder, RightShoulder, LeftElbow,
            RightElbow, LeftWrist, RightWrist, LeftPinky, RightPinky, LeftIndex, RightIndex,
            LeftThumb, RightThumb, LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// フレームのピクセルサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0, 下が正)
    pub y: f32,
    /// 相対的な奥行き（検出器依存）
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, z: 0.0, visibility }
    }

    pub fn new_3d(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視性が閾値以上で、座標が有限か
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold && self.x.is_finite() && self.y.is_finite()
    }

    /// ピクセル座標に変換
    pub fn to_pixel(&self, frame: FrameSize) -> Vector2<f32> {
        Vector2::new(self.x * frame.width as f32, self.y * frame.height as f32)
    }
}

/// 1フレーム分のランドマーク。各要素は欠損しうる
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    landmarks: [Option<Landmark>; LandmarkIndex::COUNT],
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self { landmarks: [None; LandmarkIndex::COUNT] }
    }
}

impl LandmarkSet {
    pub fn new(landmarks: [Option<Landmark>; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    /// 先頭からCOUNT個までを取り込む。不足分は欠損扱い
    pub fn from_slice(entries: &[Option<Landmark>]) -> Self {
        let mut landmarks = [None; LandmarkIndex::COUNT];
        for (slot, entry) in landmarks.iter_mut().zip(entries) {
            *slot = *entry;
        }
        Self { landmarks }
    }

    pub fn with(mut self, index: LandmarkIndex, landmark: Landmark) -> Self {
        self.landmarks[index as usize] = Some(landmark);
        self
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks[index as usize].as_ref()
    }

    /// 閾値以上の可視性を持つ場合のみ返す
    pub fn visible(&self, index: LandmarkIndex, threshold: f32) -> Option<&Landmark> {
        self.get(index).filter(|lm| lm.is_visible(threshold))
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkIndex, &Landmark)> {
        self.landmarks
            .iter()
            .enumerate()
            .filter_map(|(i, lm)| Some((LandmarkIndex::from_index(i)?, lm.as_ref()?)))
    }
}
