/// 指数移動平均 (EMA)
///
/// 欠損値・非有限値は無視し、直前の値を保持する
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f32,
    value: Option<f32>,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    pub fn update(&mut self, sample: impl Into<Option<f32>>) -> Option<f32> {
        let x = match sample.into() {
            Some(x) if x.is_finite() => x,
            _ => return self.value,
        };
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        self.value
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// 現在値を直接設定する（再シード用）
    pub fn seed(&mut self, value: f32) {
        if value.is_finite() {
            self.value = Some(value);
        }
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_first_sample_passthrough() {
        let mut ema = Ema::new(0.5);
        assert_eq!(ema.update(3.0), Some(3.0));
    }

    #[test]
    fn test_weighted_update() {
        let mut ema = Ema::new(0.25);
        ema.update(0.0);
        let v = ema.update(4.0).unwrap();
        assert!(approx_eq_f32(v, 1.0, 1e-6));
    }

    #[test]
    fn test_ignores_missing_and_nan() {
        let mut ema = Ema::new(0.5);
        assert_eq!(ema.update(None), None);
        ema.update(2.0);
        assert_eq!(ema.update(f32::NAN), Some(2.0));
        assert_eq!(ema.update(None), Some(2.0));
    }

    #[test]
    fn test_constant_input_converges() {
        let mut ema = Ema::new(0.1);
        ema.update(0.0);
        for _ in 0..500 {
            ema.update(7.5);
        }
        assert!(approx_eq_f32(ema.value().unwrap(), 7.5, 1e-4));
    }

    #[test]
    fn test_alpha_one_tracks_input() {
        let mut ema = Ema::new(1.0);
        ema.update(1.0);
        assert_eq!(ema.update(9.0), Some(9.0));
    }

    #[test]
    fn test_reset() {
        let mut ema = Ema::new(0.0);
        ema.update(1.0);
        ema.reset();
        assert_eq!(ema.update(5.0), Some(5.0));
    }
}
