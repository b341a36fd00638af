/// ステップ中の角度信号の最小・最大
#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    bounds: Option<(f32, f32)>,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        self.bounds = Some(match self.bounds {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        });
    }

    pub fn bounds(&self) -> Option<(f32, f32)> {
        self.bounds
    }

    /// max - min（非負）
    pub fn rom(&self) -> Option<f32> {
        self.bounds().map(|(lo, hi)| (hi - lo).max(0.0))
    }

    pub fn reset(&mut self) {
        self.bounds = None;
    }
}
