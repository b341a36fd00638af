use std::collections::VecDeque;

/// 動き窓の統計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStats {
    pub std_dev: f32,
    /// 隣接サンプル間の最大|dv/dt|
    pub peak_velocity: f32,
    /// 先頭から末尾までの変位
    pub displacement: f32,
}

impl MotionStats {
    pub fn is_stable(&self, max_std: f32, max_peak_velocity: f32) -> bool {
        self.std_dev <= max_std && self.peak_velocity <= max_peak_velocity
    }
}

/// 直近`window_secs`秒の (時刻, 値) 系列
#[derive(Debug, Clone)]
pub struct MotionWindow {
    window_secs: f64,
    samples: VecDeque<(f64, f32)>,
}

impl MotionWindow {
    pub fn new(window_secs: f64) -> Self {
        Self {
            window_secs,
            samples: VecDeque::new(),
        }
    }

    /// 非有限値と時刻が戻るサンプルは捨てる
    pub fn push(&mut self, t: f64, value: f32) {
        if !value.is_finite() || !t.is_finite() {
            return;
        }
        if let Some((last, _)) = self.samples.back() {
            if t < *last {
                return;
            }
        }
        self.samples.push_back((t, value));
        while let Some((front, _)) = self.samples.front() {
            if t - *front > self.window_secs {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 2サンプル未満なら None
    pub fn stats(&self) -> Option<MotionStats> {
        if self.samples.len() < 2 {
            return None;
        }
        let n = self.samples.len() as f32;
        let mean = self.samples.iter().map(|(_, v)| v).sum::<f32>() / n;
        let var = self.samples.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f32>() / n;

        let peak_velocity = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .filter(|((t0, _), (t1, _))| t1 > t0)
            .map(|((t0, v0), (t1, v1))| (v1 - v0).abs() / (t1 - t0) as f32)
            .fold(0.0f32, f32::max);

        let first = self.samples.front().map(|(_, v)| *v).unwrap_or(0.0);
        let last = self.samples.back().map(|(_, v)| *v).unwrap_or(0.0);

        Some(MotionStats {
            std_dev: var.sqrt(),
            peak_velocity,
            displacement: last - first,
        })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
