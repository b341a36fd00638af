use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Config, RepThresholds};
use crate::metrics::{Coverage, MetricInput, Signal, View};

/// 計測ステップ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    FullFrame,
    ReferencePose,
    SideProfile,
    ForwardBend,
    SquatReps,
    ElbowReps,
    ShoulderAbductionReps,
    NeckRom,
    Done,
}

impl StepId {
    pub fn name(self) -> &'static str {
        match self {
            StepId::FullFrame => "full_frame",
            StepId::ReferencePose => "reference_pose",
            StepId::SideProfile => "side_profile",
            StepId::ForwardBend => "forward_bend",
            StepId::SquatReps => "squat_reps",
            StepId::ElbowReps => "elbow_reps",
            StepId::ShoulderAbductionReps => "shoulder_abduction_reps",
            StepId::NeckRom => "neck_rom",
            StepId::Done => "done",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 前屈と判定する体幹角度の下限（度）
pub const FORWARD_BEND_MIN_DEG: f32 = 45.0;
/// 膝を伸ばしているとみなす角度の下限（度）
pub const STRAIGHT_KNEE_MIN_DEG: f32 = 165.0;
/// 基準姿勢での肩外転の許容範囲（度）
pub const REFERENCE_ABDUCTION_DEG: (f32, f32) = (10.0, 45.0);

/// ゲート判定の入力
pub struct GateInput<'a> {
    pub metrics: &'a MetricInput<'a>,
    pub coverage: Coverage,
    pub view: Option<View>,
    pub frame_margin: f32,
}

/// 不成立時は案内文を返す
pub type Predicate = fn(&GateInput) -> Result<(), &'static str>;

#[derive(Clone, Copy)]
pub enum Gate {
    Hold { predicate: Predicate, stability: bool },
    Reps { signal: Signal, thresholds: RepThresholds },
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Hold { stability, .. } => f.debug_struct("Hold").field("stability", stability).finish(),
            Gate::Reps { signal, thresholds } => f
                .debug_struct("Reps")
                .field("signal", signal)
                .field("thresholds", thresholds)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
    pub id: StepId,
    pub gate: Gate,
    /// 確定時に可動域として記録する信号
    pub rom: Option<Signal>,
    /// 最短滞在時間（秒）
    pub min_duration: f64,
    pub guidance: &'static str,
}

pub fn full_frame(input: &GateInput) -> Result<(), &'static str> {
    if !input.coverage.is_full() {
        return Err("Step back until your whole body is visible");
    }
    let lo = input.frame_margin;
    let hi = 1.0 - input.frame_margin;
    let inside = input
        .metrics
        .landmarks
        .iter()
        .filter(|(_, lm)| lm.is_visible(input.metrics.threshold))
        .all(|(_, lm)| (lo..=hi).contains(&lm.x) && (lo..=hi).contains(&lm.y));
    if !inside {
        return Err("Move to the center of the frame");
    }
    Ok(())
}

pub fn reference_pose(input: &GateInput) -> Result<(), &'static str> {
    if input.view != Some(View::Frontal) {
        return Err("Face the camera");
    }
    let knees = Signal::KneeFlexion.compute(input.metrics).ok_or("Keep your legs in view")?;
    if knees < STRAIGHT_KNEE_MIN_DEG {
        return Err("Straighten your knees");
    }
    let arms = Signal::ShoulderAbduction.compute(input.metrics).ok_or("Keep your arms in view")?;
    let (lo, hi) = REFERENCE_ABDUCTION_DEG;
    if !(lo..=hi).contains(&arms) {
        return Err("Hold your arms slightly away from your body");
    }
    Ok(())
}

pub fn side_profile(input: &GateInput) -> Result<(), &'static str> {
    match input.view {
        Some(View::Profile) => Ok(()),
        Some(_) => Err("Turn sideways to the camera"),
        None => Err("Keep your shoulders and hips in view"),
    }
}

pub fn forward_bend(input: &GateInput) -> Result<(), &'static str> {
    let trunk = Signal::TrunkFlexion.compute(input.metrics).ok_or("Keep your shoulders and hips in view")?;
    if trunk < FORWARD_BEND_MIN_DEG {
        return Err("Bend forward from the hips");
    }
    Ok(())
}

/// 既定のステップ列（Doneは含まない）
pub fn default_steps(config: &Config) -> Vec<StepDescriptor> {
    let min_duration = config.session.min_step_secs;
    let hold = |id, predicate: Predicate, rom, guidance| StepDescriptor {
        id,
        gate: Gate::Hold { predicate, stability: true },
        rom,
        min_duration,
        guidance,
    };
    let reps = |id, signal, thresholds, guidance| StepDescriptor {
        id,
        gate: Gate::Reps { signal, thresholds },
        rom: Some(signal),
        min_duration,
        guidance,
    };
    vec![
        hold(StepId::FullFrame, full_frame, None, "Stand so your whole body fits in the frame"),
        hold(StepId::ReferencePose, reference_pose, None, "Face the camera, arms slightly out, and hold still"),
        hold(StepId::SideProfile, side_profile, None, "Turn sideways and hold still"),
        hold(StepId::ForwardBend, forward_bend, Some(Signal::TrunkFlexion), "Bend forward as far as is comfortable and hold"),
        reps(StepId::SquatReps, Signal::KneeFlexion, config.reps.squat, "Do slow squats"),
        reps(StepId::ElbowReps, Signal::ElbowFlexion, config.reps.elbow, "Bend and straighten your elbows"),
        reps(
            StepId::ShoulderAbductionReps,
            Signal::ShoulderAbduction,
            config.reps.shoulder,
            "Raise your arms out to the side and lower them",
        ),
        reps(StepId::NeckRom, Signal::NeckTilt, config.reps.neck, "Tilt your head toward each shoulder"),
    ]
}
