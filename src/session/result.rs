//! 計測結果とステップごとのスナップショット
//!
//! 全フィールドは Option。マージは両方あれば平均、片方だけならそのまま、
//! どちらにもなければ None のまま（0で埋めない）。

use serde::{Deserialize, Serialize};

use super::step::StepId;
use crate::metrics::{MetricId, Signal};

/// フィールド単位のマージ
pub trait Merge {
    fn merge(&self, other: &Self) -> Self;
}

pub fn merge_value(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (a, b) => a.or(b),
    }
}

macro_rules! measure_group {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<f32>,
            )*
        }

        impl $name {
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }
        }

        impl Merge for $name {
            fn merge(&self, other: &Self) -> Self {
                Self {
                    $($field: merge_value(self.$field, other.$field),)*
                }
            }
        }
    };
}

measure_group! {
    /// 体節長・幅（cm）
    Lengths {
        upper_arm_left,
        upper_arm_right,
        forearm_left,
        forearm_right,
        thigh_left,
        thigh_right,
        shin_left,
        shin_right,
        shoulder_width,
        pelvis_width,
        torso_length,
    }
}

measure_group! {
    /// 円形断面近似の周囲長（cm）
    Circumferences {
        chest,
        waist,
        hip,
    }
}

measure_group! {
    /// 左右差（cm）
    Symmetry {
        arm_length_delta,
        leg_length_delta,
        shoulder_height_delta,
        hip_height_delta,
    }
}

measure_group! {
    /// 姿勢角（度）。踵の浮きのみcm
    Posture {
        neck_flexion,
        trunk_lean,
        shoulder_tilt,
        knee_valgus_left,
        knee_valgus_right,
        heel_lift_left,
        heel_lift_right,
        foot_angle_left,
        foot_angle_right,
    }
}

measure_group! {
    /// 可動域（度）
    RangeOfMotion {
        trunk_flexion,
        knee_flexion,
        elbow_flexion,
        shoulder_abduction,
        neck_lateral_flexion,
    }
}

measure_group! {
    RepCounts {
        squat,
        elbow,
        shoulder_abduction,
        neck,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cm_per_px: Option<f32>,
    /// カバレッジスコア (0.0〜1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f32>,
    #[serde(default, skip_serializing_if = "Lengths::is_empty")]
    pub lengths: Lengths,
    #[serde(default, skip_serializing_if = "Circumferences::is_empty")]
    pub circumferences: Circumferences,
    #[serde(default, skip_serializing_if = "Symmetry::is_empty")]
    pub symmetry: Symmetry,
    #[serde(default, skip_serializing_if = "Posture::is_empty")]
    pub posture: Posture,
    #[serde(default, skip_serializing_if = "RangeOfMotion::is_empty")]
    pub range_of_motion: RangeOfMotion,
    #[serde(default, skip_serializing_if = "RepCounts::is_empty")]
    pub reps: RepCounts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed_steps: Vec<StepId>,
}

impl MeasureResult {
    pub fn metric_mut(&mut self, id: MetricId) -> &mut Option<f32> {
        match id {
            MetricId::UpperArmLeft => &mut self.lengths.upper_arm_left,
            MetricId::UpperArmRight => &mut self.lengths.upper_arm_right,
            MetricId::ForearmLeft => &mut self.lengths.forearm_left,
            MetricId::ForearmRight => &mut self.lengths.forearm_right,
            MetricId::ThighLeft => &mut self.lengths.thigh_left,
            MetricId::ThighRight => &mut self.lengths.thigh_right,
            MetricId::ShinLeft => &mut self.lengths.shin_left,
            MetricId::ShinRight => &mut self.lengths.shin_right,
            MetricId::ShoulderWidth => &mut self.lengths.shoulder_width,
            MetricId::PelvisWidth => &mut self.lengths.pelvis_width,
            MetricId::TorsoLength => &mut self.lengths.torso_length,
            MetricId::ArmLengthDelta => &mut self.symmetry.arm_length_delta,
            MetricId::LegLengthDelta => &mut self.symmetry.leg_length_delta,
            MetricId::ShoulderHeightDelta => &mut self.symmetry.shoulder_height_delta,
            MetricId::HipHeightDelta => &mut self.symmetry.hip_height_delta,
            MetricId::NeckFlexion => &mut self.posture.neck_flexion,
            MetricId::TrunkLean => &mut self.posture.trunk_lean,
            MetricId::ShoulderTilt => &mut self.posture.shoulder_tilt,
            MetricId::KneeValgusLeft => &mut self.posture.knee_valgus_left,
            MetricId::KneeValgusRight => &mut self.posture.knee_valgus_right,
            MetricId::HeelLiftLeft => &mut self.posture.heel_lift_left,
            MetricId::HeelLiftRight => &mut self.posture.heel_lift_right,
            MetricId::FootAngleLeft => &mut self.posture.foot_angle_left,
            MetricId::FootAngleRight => &mut self.posture.foot_angle_right,
        }
    }

    /// 可動域として記録する信号のみ
    pub fn rom_mut(&mut self, signal: Signal) -> Option<&mut Option<f32>> {
        let rom = &mut self.range_of_motion;
        match signal {
            Signal::TrunkFlexion => Some(&mut rom.trunk_flexion),
            Signal::KneeFlexion => Some(&mut rom.knee_flexion),
            Signal::ElbowFlexion => Some(&mut rom.elbow_flexion),
            Signal::ShoulderAbduction => Some(&mut rom.shoulder_abduction),
            Signal::NeckTilt => Some(&mut rom.neck_lateral_flexion),
            _ => None,
        }
    }

    pub fn reps_mut(&mut self, step: StepId) -> Option<&mut Option<f32>> {
        let reps = &mut self.reps;
        match step {
            StepId::SquatReps => Some(&mut reps.squat),
            StepId::ElbowReps => Some(&mut reps.elbow),
            StepId::ShoulderAbductionReps => Some(&mut reps.shoulder_abduction),
            StepId::NeckRom => Some(&mut reps.neck),
            _ => None,
        }
    }
}

impl Merge for MeasureResult {
    fn merge(&self, other: &Self) -> Self {
        let mut completed_steps = self.completed_steps.clone();
        for step in &other.completed_steps {
            if !completed_steps.contains(step) {
                completed_steps.push(*step);
            }
        }
        Self {
            cm_per_px: merge_value(self.cm_per_px, other.cm_per_px),
            coverage: merge_value(self.coverage, other.coverage),
            lengths: self.lengths.merge(&other.lengths),
            circumferences: self.circumferences.merge(&other.circumferences),
            symmetry: self.symmetry.merge(&other.symmetry),
            posture: self.posture.merge(&other.posture),
            range_of_motion: self.range_of_motion.merge(&other.range_of_motion),
            reps: self.reps.merge(&other.reps),
            completed_steps,
        }
    }
}

/// 確定時点のステップ結果
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot {
    pub step: StepId,
    /// 確定時刻（秒）
    pub timestamp: f64,
    pub result: MeasureResult,
}

/// ステップ順に左から畳み込む。ペアごとの平均なので後のスナップショットほど重みが大きい（一様平均ではない）
pub fn merge_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a StepSnapshot>) -> MeasureResult {
    snapshots
        .into_iter()
        .fold(None, |acc: Option<MeasureResult>, s| {
            Some(match acc {
                Some(acc) => acc.merge(&s.result),
                None => s.result.clone(),
            })
        })
        .unwrap_or_default()
}
