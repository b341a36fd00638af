use crate::config::FilterConfig;
use crate::pose::{Landmark, LandmarkIndex, LandmarkSet};

/// 経過時間の下限（秒）。dtが極端に小さいと微分が発散する
const MIN_DT: f64 = 1.0 / 120.0;

/// Low-pass filter component
#[derive(Debug, Clone, Default)]
struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        match self.prev {
            Some(prev) => {
                let result = alpha * value + (1.0 - alpha) * prev;
                self.prev = Some(result);
                result
            }
            None => {
                self.prev = Some(value);
                value
            }
        }
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// One Euro Filter for a single scalar signal sampled at variable intervals
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    prev_value: Option<f32>,
    last_time: Option<f64>,
    last_output: Option<f32>,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x_filter: LowPassFilter::default(),
            dx_filter: LowPassFilter::default(),
            prev_value: None,
            last_time: None,
            last_output: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.min_cutoff, config.beta, config.d_cutoff)
    }

    /// 値を平滑化して返す
    ///
    /// - 初回は入力をそのまま返す
    /// - 非有限値、または時刻が進んでいないサンプルは直前の出力を保持
    /// - 有効なサンプルを一度も受け取っていなければ None
    pub fn filter(&mut self, value: f32, timestamp: f64) -> Option<f32> {
        if !value.is_finite() || !timestamp.is_finite() {
            return self.last_output;
        }

        let dt = match self.last_time {
            None => {
                self.last_time = Some(timestamp);
                self.prev_value = Some(value);
                self.x_filter.filter(value, 1.0);
                self.last_output = Some(value);
                return self.last_output;
            }
            Some(last) if timestamp <= last => return self.last_output,
            Some(last) => (timestamp - last).max(MIN_DT) as f32,
        };
        self.last_time = Some(timestamp);

        let dx = match self.prev_value {
            Some(prev) => (value - prev) / dt,
            None => 0.0,
        };
        self.prev_value = Some(value);

        let edx = self
            .dx_filter
            .filter(dx, smoothing_factor(dt, self.d_cutoff));
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        let out = self.x_filter.filter(value, smoothing_factor(dt, cutoff));
        self.last_output = Some(out);
        self.last_output
    }

    pub fn value(&self) -> Option<f32> {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.prev_value = None;
        self.last_time = None;
        self.last_output = None;
    }
}

/// One Euro Filter for every landmark of a LandmarkSet (x, y)
///
/// 閾値未満になったランドマークのフィルタは破棄し、再出現時は入力から再開する
pub struct LandmarkFilter {
    joints: [[OneEuroFilter; 2]; LandmarkIndex::COUNT],
    threshold: f32,
}

impl LandmarkFilter {
    pub fn new(config: &FilterConfig, threshold: f32) -> Self {
        Self {
            joints: std::array::from_fn(|_| std::array::from_fn(|_| OneEuroFilter::from_config(config))),
            threshold,
        }
    }

    pub fn apply(&mut self, landmarks: &LandmarkSet, timestamp: f64) -> LandmarkSet {
        let mut out = LandmarkSet::default();
        for idx in LandmarkIndex::ALL {
            let [fx, fy] = &mut self.joints[idx as usize];
            match landmarks.get(idx) {
                Some(lm) if lm.is_visible(self.threshold) => {
                    let x = fx.filter(lm.x, timestamp).unwrap_or(lm.x);
                    let y = fy.filter(lm.y, timestamp).unwrap_or(lm.y);
                    out = out.with(idx, Landmark::new_3d(x, y, lm.z, lm.visibility));
                }
                Some(lm) => {
                    fx.reset();
                    fy.reset();
                    out = out.with(idx, *lm);
                }
                None => {
                    fx.reset();
                    fy.reset();
                }
            }
        }
        out
    }
}
