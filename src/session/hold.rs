use log::debug;

use crate::config::HoldConfig;

/// 静止保持ゲートの状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldStatus {
    /// 条件不成立または不安定。タイマーは初期化済み
    Reset,
    /// 条件成立、待機中
    Arming,
    /// 保持タイマー進行中（0.0〜1.0）
    Holding(f32),
    Complete,
}

/// 条件が連続して成立した時間で確定するゲート
///
/// 条件成立後`arming_secs`待ってから保持タイマーを開始し、
/// `hold_secs`続けば Complete。途中で一度でも崩れると最初からやり直す。
#[derive(Debug, Clone)]
pub struct HoldGate {
    arming_secs: f64,
    hold_secs: f64,
    armed_since: Option<f64>,
    holding_since: Option<f64>,
}

impl HoldGate {
    pub fn new(config: &HoldConfig) -> Self {
        Self {
            arming_secs: config.arming_secs,
            hold_secs: config.hold_secs,
            armed_since: None,
            holding_since: None,
        }
    }

    pub fn update(&mut self, valid: bool, stable: bool, now: f64) -> HoldStatus {
        if !valid || !stable {
            if self.holding_since.is_some() {
                debug!("hold reset (valid={}, stable={})", valid, stable);
            }
            self.reset();
            return HoldStatus::Reset;
        }

        let armed = *self.armed_since.get_or_insert(now);
        if now - armed < self.arming_secs {
            return HoldStatus::Arming;
        }
        let start = *self.holding_since.get_or_insert(now);
        let elapsed = now - start;
        if elapsed >= self.hold_secs {
            HoldStatus::Complete
        } else {
            HoldStatus::Holding((elapsed / self.hold_secs) as f32)
        }
    }

    pub fn progress(&self, now: f64) -> f32 {
        match self.holding_since {
            Some(start) if self.hold_secs > 0.0 => ((now - start) / self.hold_secs).clamp(0.0, 1.0) as f32,
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.armed_since = None;
        self.holding_since = None;
    }
}
