use log::debug;

use crate::config::CalibrationConfig;
use crate::filter::Ema;
use crate::pose::{FrameSize, LandmarkIndex, LandmarkSet};

/// スケール更新の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleUpdate {
    Initialized(f32),
    Accepted(f32),
    /// 変化率が大きすぎて棄却。現在値は維持
    Rejected { candidate: f32, current: f32 },
    /// 非有限・非正の候補
    Invalid,
}

/// 既知の身長とピクセル上の身長からcm/pxを推定する
#[derive(Debug, Clone)]
pub struct CalibrationScale {
    config: CalibrationConfig,
    known_height_cm: f32,
    scale: Ema,
}

impl CalibrationScale {
    pub fn new(known_height_cm: f32, config: CalibrationConfig) -> Self {
        let scale = Ema::new(config.smoothing);
        Self {
            config,
            known_height_cm,
            scale,
        }
    }

    /// 現在のcm/px
    pub fn value(&self) -> Option<f32> {
        self.scale.value()
    }

    /// ランドマークの縦方向スパンから候補値を求める
    ///
    /// 頭頂は鼻から肩中点方向の反対へ`head_top_ratio`倍だけ伸ばして推定し、
    /// 下端は踵（なければ足首）の平均。
    pub fn candidate(&self, landmarks: &LandmarkSet, frame: FrameSize, threshold: f32) -> Option<f32> {
        use LandmarkIndex::*;

        let y = |idx| landmarks.visible(idx, threshold).map(|lm| lm.y);
        let mean = |a, b| match (y(a), y(b)) {
            (Some(a), Some(b)) => Some((a + b) / 2.0),
            (a, b) => a.or(b),
        };

        let nose = y(Nose)?;
        let shoulders = match (y(LeftShoulder), y(RightShoulder)) {
            (Some(l), Some(r)) => (l + r) / 2.0,
            _ => return None,
        };
        let head_top = nose - self.config.head_top_ratio * (shoulders - nose);
        let feet = mean(LeftHeel, RightHeel).or_else(|| mean(LeftAnkle, RightAnkle))?;

        let span_px = (feet - head_top) * frame.height as f32;
        if !(span_px > 1.0) {
            return None;
        }
        Some(self.known_height_cm / span_px)
    }

    pub fn propose(&mut self, candidate: f32) -> ScaleUpdate {
        if !candidate.is_finite() || candidate <= 0.0 {
            return ScaleUpdate::Invalid;
        }
        let Some(current) = self.scale.value() else {
            self.scale.seed(candidate);
            debug!("scale initialized at {:.4} cm/px", candidate);
            return ScaleUpdate::Initialized(candidate);
        };

        // 棄却された候補は捨てるだけで、現在値には一切影響しない
        let jump = (candidate - current).abs() / current;
        if jump > self.config.max_jump_ratio {
            return ScaleUpdate::Rejected { candidate, current };
        }

        let value = self.scale.update(candidate).unwrap_or(candidate);
        ScaleUpdate::Accepted(value)
    }
}
