use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub hold: HoldConfig,
    #[serde(default)]
    pub reps: RepsConfig,
    #[serde(default)]
    pub contour: ContourConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 被験者の実身長（cm）。スケール推定に使用
    #[serde(default = "default_known_height_cm")]
    pub known_height_cm: f32,
    /// ランドマークを有効とみなす可視性の閾値
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// 動き統計の窓長（秒）
    #[serde(default = "default_motion_window_secs")]
    pub motion_window_secs: f64,
    /// ステップの最短滞在時間（秒）
    #[serde(default = "default_min_step_secs")]
    pub min_step_secs: f64,
    /// 画像端からの余白（正規化座標）。全身フレーミング判定用
    #[serde(default = "default_frame_margin")]
    pub frame_margin: f32,
}

fn default_known_height_cm() -> f32 { 170.0 }
fn default_visibility_threshold() -> f32 { 0.5 }
fn default_motion_window_secs() -> f64 { 1.0 }
fn default_min_step_secs() -> f64 { 1.0 }
fn default_frame_margin() -> f32 { 0.02 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            known_height_cm: default_known_height_cm(),
            visibility_threshold: default_visibility_threshold(),
            motion_window_secs: default_motion_window_secs(),
            min_step_secs: default_min_step_secs(),
            frame_margin: default_frame_margin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// One Euro: 最小カットオフ周波数 (Hz)
    #[serde(default = "default_min_cutoff")]
    pub min_cutoff: f32,
    /// One Euro: 速度係数
    #[serde(default = "default_beta")]
    pub beta: f32,
    /// One Euro: 微分のカットオフ周波数 (Hz)
    #[serde(default = "default_d_cutoff")]
    pub d_cutoff: f32,
    /// 計測値のメディアン窓
    #[serde(default = "default_median_window")]
    pub median_window: usize,
    /// 計測値のEMA係数
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f32,
}

fn default_min_cutoff() -> f32 { 1.0 }
fn default_beta() -> f32 { 0.05 }
fn default_d_cutoff() -> f32 { 1.0 }
fn default_median_window() -> usize { 5 }
fn default_ema_alpha() -> f32 { 0.3 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_cutoff: default_min_cutoff(),
            beta: default_beta(),
            d_cutoff: default_d_cutoff(),
            median_window: default_median_window(),
            ema_alpha: default_ema_alpha(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    /// 直前の採用値からの許容変化率
    #[serde(default = "default_max_jump_ratio")]
    pub max_jump_ratio: f32,
    /// 採用値のEMA係数
    #[serde(default = "default_scale_smoothing")]
    pub smoothing: f32,
    /// 体幹の傾きがこれを超えるフレームでは候補値を出さない（度）
    #[serde(default = "default_max_trunk_lean_deg")]
    pub max_trunk_lean_deg: f32,
    /// 鼻から頭頂までの距離（鼻〜肩中点距離に対する比）
    #[serde(default = "default_head_top_ratio")]
    pub head_top_ratio: f32,
}

fn default_max_jump_ratio() -> f32 { 0.12 }
fn default_scale_smoothing() -> f32 { 0.2 }
fn default_max_trunk_lean_deg() -> f32 { 20.0 }
fn default_head_top_ratio() -> f32 { 0.6 }

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_jump_ratio: default_max_jump_ratio(),
            smoothing: default_scale_smoothing(),
            max_trunk_lean_deg: default_max_trunk_lean_deg(),
            head_top_ratio: default_head_top_ratio(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldConfig {
    /// 静止保持の必要時間（秒）
    #[serde(default = "default_hold_secs")]
    pub hold_secs: f64,
    /// タイマー開始までの待機時間（秒）
    #[serde(default = "default_arming_secs")]
    pub arming_secs: f64,
    /// 確定後の再トリガー禁止時間（秒）
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,
    /// 動き窓の標準偏差上限（正規化座標）
    #[serde(default = "default_max_std")]
    pub max_std: f32,
    /// 動き窓のピーク速度上限（正規化座標/秒）
    #[serde(default = "default_max_peak_velocity")]
    pub max_peak_velocity: f32,
}

fn default_hold_secs() -> f64 { 2.0 }
fn default_arming_secs() -> f64 { 0.6 }
fn default_cooldown_secs() -> f64 { 0.8 }
fn default_max_std() -> f32 { 0.015 }
fn default_max_peak_velocity() -> f32 { 0.4 }

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            hold_secs: default_hold_secs(),
            arming_secs: default_arming_secs(),
            cooldown_secs: default_cooldown_secs(),
            max_std: default_max_std(),
            max_peak_velocity: default_max_peak_velocity(),
        }
    }
}

/// 反復カウントのしきい値
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RepThresholds {
    /// 反転とみなす最小振幅（度）
    pub min_amplitude_deg: f32,
    /// 直前の極値からの最小時間（ミリ秒）
    pub min_interval_ms: u64,
    /// 確定に必要な回数
    pub target: u32,
}

impl RepThresholds {
    pub fn new(min_amplitude_deg: f32, min_interval_ms: u64, target: u32) -> Self {
        Self { min_amplitude_deg, min_interval_ms, target }
    }

    pub fn min_interval_secs(&self) -> f64 {
        self.min_interval_ms as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepsConfig {
    #[serde(default = "default_squat")]
    pub squat: RepThresholds,
    #[serde(default = "default_elbow")]
    pub elbow: RepThresholds,
    #[serde(default = "default_shoulder")]
    pub shoulder: RepThresholds,
    #[serde(default = "default_neck")]
    pub neck: RepThresholds,
}

fn default_squat() -> RepThresholds { RepThresholds::new(40.0, 400, 3) }
fn default_elbow() -> RepThresholds { RepThresholds::new(50.0, 300, 3) }
fn default_shoulder() -> RepThresholds { RepThresholds::new(50.0, 480, 3) }
fn default_neck() -> RepThresholds { RepThresholds::new(35.0, 250, 2) }

impl Default for RepsConfig {
    fn default() -> Self {
        Self {
            squat: default_squat(),
            elbow: default_elbow(),
            shoulder: default_shoulder(),
            neck: default_neck(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContourConfig {
    /// 輪郭抽出に必要な最小占有セル数
    #[serde(default = "default_min_pixels")]
    pub min_pixels: usize,
    /// 角切り平滑化の反復回数
    #[serde(default = "default_smoothing_iterations")]
    pub smoothing_iterations: usize,
    /// 再サンプリング後の点数
    #[serde(default = "default_resample_points")]
    pub resample_points: usize,
}

fn default_min_pixels() -> usize { 24 }
fn default_smoothing_iterations() -> usize { 2 }
fn default_resample_points() -> usize { 96 }

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_pixels: default_min_pixels(),
            smoothing_iterations: default_smoothing_iterations(),
            resample_points: default_resample_points(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込みに失敗した場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("config {} not used ({:#}), falling back to defaults", path.as_ref().display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.session;
        if !(s.known_height_cm.is_finite() && s.known_height_cm > 0.0) {
            return Err(ConfigError::OutOfRange { field: "session.known_height_cm", value: s.known_height_cm as f64 });
        }
        if !(0.0..=1.0).contains(&s.visibility_threshold) {
            return Err(ConfigError::OutOfRange { field: "session.visibility_threshold", value: s.visibility_threshold as f64 });
        }
        if s.motion_window_secs <= 0.0 {
            return Err(ConfigError::OutOfRange { field: "session.motion_window_secs", value: s.motion_window_secs });
        }
        if !(0.0..1.0).contains(&self.calibration.max_jump_ratio) {
            return Err(ConfigError::OutOfRange { field: "calibration.max_jump_ratio", value: self.calibration.max_jump_ratio as f64 });
        }
        if !(0.0..=1.0).contains(&self.filter.ema_alpha) {
            return Err(ConfigError::OutOfRange { field: "filter.ema_alpha", value: self.filter.ema_alpha as f64 });
        }
        if self.hold.hold_secs <= 0.0 {
            return Err(ConfigError::OutOfRange { field: "hold.hold_secs", value: self.hold.hold_secs });
        }
        for (name, reps) in [
            ("reps.squat", &self.reps.squat),
            ("reps.elbow", &self.reps.elbow),
            ("reps.shoulder", &self.reps.shoulder),
            ("reps.neck", &self.reps.neck),
        ] {
            if reps.target == 0 {
                return Err(ConfigError::ZeroRepTarget(name));
            }
        }
        if self.contour.resample_points < 3 {
            return Err(ConfigError::OutOfRange { field: "contour.resample_points", value: self.contour.resample_points as f64 });
        }
        Ok(())
    }
}
