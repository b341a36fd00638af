use std::collections::VecDeque;

/// 7タップの二次平滑化カーネル（合計21）
const WEIGHTS: [f32; 7] = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0];
const NORM: f32 = 21.0;

/// 直近7サンプルによる畳み込み平滑化
///
/// バッファが埋まるまでは入力をそのまま返す
#[derive(Debug, Clone, Default)]
pub struct SmoothingKernel7 {
    window: VecDeque<f32>,
    last_output: Option<f32>,
}

impl SmoothingKernel7 {
    pub const TAPS: usize = WEIGHTS.len();

    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(Self::TAPS + 1),
            last_output: None,
        }
    }

    pub fn update(&mut self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return self.last_output;
        }
        self.window.push_back(value);
        if self.window.len() > Self::TAPS {
            self.window.pop_front();
        }

        let out = if !self.is_full() {
            value
        } else {
            self.window
                .iter()
                .zip(WEIGHTS.iter())
                .map(|(v, w)| v * w)
                .sum::<f32>()
                / NORM
        };
        self.last_output = Some(out);
        self.last_output
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == Self::TAPS
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.last_output = None;
    }
}
