use log::debug;

use crate::config::RepThresholds;

/// この幅以下の変化は方向判定に使わない（度）
const DEADBAND_DEG: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Rising,
    Falling,
}

/// 角度信号の反転から反復回数を数える
///
/// 反転点の値が直前の極値から`min_amplitude_deg`以上離れ、かつ
/// `min_interval_ms`以上経過していれば極値として登録する。
/// 極値2つで1回。
#[derive(Debug, Clone)]
pub struct RepCounter {
    thresholds: RepThresholds,
    last: Option<(f64, f32)>,
    direction: Option<Direction>,
    extremum: Option<(f64, f32)>,
    half_cycle: bool,
    count: u32,
}

impl RepCounter {
    pub fn new(thresholds: RepThresholds) -> Self {
        Self {
            thresholds,
            last: None,
            direction: None,
            extremum: None,
            half_cycle: false,
            count: 0,
        }
    }

    /// 回数が増えたフレームでは Some(新しい回数)
    pub fn update(&mut self, t: f64, value: f32) -> Option<u32> {
        if !value.is_finite() || !t.is_finite() {
            return None;
        }
        let Some((last_t, last_v)) = self.last else {
            self.last = Some((t, value));
            self.extremum = Some((t, value));
            return None;
        };
        if t <= last_t {
            return None;
        }
        let delta = value - last_v;
        if delta.abs() <= DEADBAND_DEG {
            return None;
        }
        let direction = if delta > 0.0 { Direction::Rising } else { Direction::Falling };

        let mut counted = None;
        if self.direction.is_some_and(|d| d != direction) {
            counted = self.turn(last_t, last_v);
        }
        self.direction = Some(direction);
        self.last = Some((t, value));
        counted
    }

    fn turn(&mut self, t: f64, value: f32) -> Option<u32> {
        let (ext_t, ext_v) = self.extremum?;
        let amplitude = (value - ext_v).abs();
        let interval = t - ext_t;
        if amplitude < self.thresholds.min_amplitude_deg || interval < self.thresholds.min_interval_secs() {
            return None;
        }
        self.extremum = Some((t, value));
        if self.half_cycle {
            self.half_cycle = false;
            self.count += 1;
            debug!("rep {} (amplitude {:.1}, interval {:.2}s)", self.count, amplitude, interval);
            Some(self.count)
        } else {
            self.half_cycle = true;
            None
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_complete(&self) -> bool {
        self.count >= self.thresholds.target
    }

    /// 0.0〜1.0。半周期も0.5回として数える
    pub fn progress(&self) -> f32 {
        if self.thresholds.target == 0 {
            return 1.0;
        }
        let done = self.count as f32 + if self.half_cycle { 0.5 } else { 0.0 };
        (done / self.thresholds.target as f32).min(1.0)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.thresholds);
    }
}
