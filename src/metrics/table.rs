//! 計測値とトラッキング信号の宣言テーブル
//!
//! 各エントリは必要なランドマークと計算関数を持ち、セッションは毎フレーム
//! テーブルを一様に走査する。必要ランドマークが1つでも欠ければそのエントリ
//! だけが None になる。

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::geometry::{angle_at_vertex, angle_to_horizontal, distance, midpoint, vector_to_vertical};
use crate::pose::{FrameSize, Landmark, LandmarkIndex, LandmarkSet};

use LandmarkIndex::*;

/// 肩幅/胴長がこれ以上なら正面
pub const FRONTAL_MIN_RATIO: f32 = 0.4;
/// 肩幅/胴長がこれ以下なら側面
pub const PROFILE_MAX_RATIO: f32 = 0.25;

/// 1フレーム分の計算入力
pub struct MetricInput<'a> {
    pub landmarks: &'a LandmarkSet,
    pub frame: FrameSize,
    pub threshold: f32,
    /// cm/px。未確定ならNone（長さ系はNoneになる）
    pub cm_per_px: Option<f32>,
}

impl<'a> MetricInput<'a> {
    pub fn new(landmarks: &'a LandmarkSet, frame: FrameSize, threshold: f32, cm_per_px: Option<f32>) -> Self {
        Self { landmarks, frame, threshold, cm_per_px }
    }

    pub fn lm(&self, idx: LandmarkIndex) -> Option<&'a Landmark> {
        self.landmarks.visible(idx, self.threshold)
    }

    pub fn px(&self, idx: LandmarkIndex) -> Option<Vector2<f32>> {
        self.lm(idx).map(|l| l.to_pixel(self.frame))
    }

    pub fn has_all(&self, joints: &[LandmarkIndex]) -> bool {
        joints.iter().all(|idx| self.lm(*idx).is_some())
    }

    fn dist(&self, a: LandmarkIndex, b: LandmarkIndex) -> Option<f32> {
        distance(self.lm(a), self.lm(b), self.frame)
    }

    fn dist_cm(&self, a: LandmarkIndex, b: LandmarkIndex) -> Option<f32> {
        Some(self.dist(a, b)? * self.cm_per_px?)
    }

    fn angle(&self, a: LandmarkIndex, b: LandmarkIndex, c: LandmarkIndex) -> Option<f32> {
        angle_at_vertex(self.lm(a), self.lm(b), self.lm(c), self.frame)
    }

    fn mid(&self, a: LandmarkIndex, b: LandmarkIndex) -> Option<Vector2<f32>> {
        midpoint(self.lm(a), self.lm(b), self.frame)
    }

    /// 肩幅 / 胴長（ピクセル比）
    pub fn shoulder_torso_ratio(&self) -> Option<f32> {
        let width = self.dist(LeftShoulder, RightShoulder)?;
        let torso = (self.mid(LeftShoulder, RightShoulder)? - self.mid(LeftHip, RightHip)?).norm();
        if torso < f32::EPSILON {
            return None;
        }
        Some(width / torso)
    }

    pub fn view(&self) -> Option<View> {
        let ratio = self.shoulder_torso_ratio()?;
        Some(if ratio >= FRONTAL_MIN_RATIO {
            View::Frontal
        } else if ratio <= PROFILE_MAX_RATIO {
            View::Profile
        } else {
            View::Oblique
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Frontal,
    Oblique,
    Profile,
}

/// 計測値の有効な視点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRequirement {
    Any,
    Frontal,
    Profile,
}

impl ViewRequirement {
    pub fn accepts(self, view: Option<View>) -> bool {
        match self {
            ViewRequirement::Any => true,
            ViewRequirement::Frontal => view == Some(View::Frontal),
            ViewRequirement::Profile => view == Some(View::Profile),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricId {
    UpperArmLeft,
    UpperArmRight,
    ForearmLeft,
    ForearmRight,
    ThighLeft,
    ThighRight,
    ShinLeft,
    ShinRight,
    ShoulderWidth,
    PelvisWidth,
    TorsoLength,
    ArmLengthDelta,
    LegLengthDelta,
    ShoulderHeightDelta,
    HipHeightDelta,
    NeckFlexion,
    TrunkLean,
    ShoulderTilt,
    KneeValgusLeft,
    KneeValgusRight,
    HeelLiftLeft,
    HeelLiftRight,
    FootAngleLeft,
    FootAngleRight,
}

pub struct MetricSpec {
    pub id: MetricId,
    pub required: &'static [LandmarkIndex],
    pub view: ViewRequirement,
    pub compute: fn(&MetricInput) -> Option<f32>,
}

impl MetricSpec {
    /// 必要ランドマークと視点が揃っていれば計算する
    pub fn evaluate(&self, input: &MetricInput, view: Option<View>) -> Option<f32> {
        if !self.view.accepts(view) || !input.has_all(self.required) {
            return None;
        }
        (self.compute)(input).filter(|v| v.is_finite())
    }
}

fn arm_length(input: &MetricInput, shoulder: LandmarkIndex, elbow: LandmarkIndex, wrist: LandmarkIndex) -> Option<f32> {
    Some(input.dist_cm(shoulder, elbow)? + input.dist_cm(elbow, wrist)?)
}

fn leg_length(input: &MetricInput, hip: LandmarkIndex, knee: LandmarkIndex, ankle: LandmarkIndex) -> Option<f32> {
    Some(input.dist_cm(hip, knee)? + input.dist_cm(knee, ankle)?)
}

fn height_delta_cm(input: &MetricInput, a: LandmarkIndex, b: LandmarkIndex) -> Option<f32> {
    Some((input.px(a)?.y - input.px(b)?.y).abs() * input.cm_per_px?)
}

fn knee_valgus(input: &MetricInput, hip: LandmarkIndex, knee: LandmarkIndex, ankle: LandmarkIndex) -> Option<f32> {
    Some((180.0 - input.angle(hip, knee, ankle)?).max(0.0))
}

/// 踵がつま先より高い分（cm）
fn heel_lift(input: &MetricInput, heel: LandmarkIndex, toe: LandmarkIndex) -> Option<f32> {
    Some(((input.px(toe)?.y - input.px(heel)?.y) * input.cm_per_px?).max(0.0))
}

fn foot_angle(input: &MetricInput, heel: LandmarkIndex, toe: LandmarkIndex) -> Option<f32> {
    angle_to_horizontal(input.px(toe)? - input.px(heel)?)
}

/// 可視な側の平均
fn side_mean(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (l, r) => l.or(r),
    }
}

fn neck_flexion(input: &MetricInput) -> Option<f32> {
    let side = |ear, shoulder| vector_to_vertical(input.px(ear)? - input.px(shoulder)?);
    side_mean(side(LeftEar, LeftShoulder), side(RightEar, RightShoulder))
}

fn trunk_lean(input: &MetricInput) -> Option<f32> {
    vector_to_vertical(input.mid(LeftShoulder, RightShoulder)? - input.mid(LeftHip, RightHip)?)
}

pub static METRICS: &[MetricSpec] = &[
    MetricSpec { id: MetricId::UpperArmLeft, required: &[LeftShoulder, LeftElbow], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(LeftShoulder, LeftElbow) },
    MetricSpec { id: MetricId::UpperArmRight, required: &[RightShoulder, RightElbow], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(RightShoulder, RightElbow) },
    MetricSpec { id: MetricId::ForearmLeft, required: &[LeftElbow, LeftWrist], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(LeftElbow, LeftWrist) },
    MetricSpec { id: MetricId::ForearmRight, required: &[RightElbow, RightWrist], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(RightElbow, RightWrist) },
    MetricSpec { id: MetricId::ThighLeft, required: &[LeftHip, LeftKnee], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(LeftHip, LeftKnee) },
    MetricSpec { id: MetricId::ThighRight, required: &[RightHip, RightKnee], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(RightHip, RightKnee) },
    MetricSpec { id: MetricId::ShinLeft, required: &[LeftKnee, LeftAnkle], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(LeftKnee, LeftAnkle) },
    MetricSpec { id: MetricId::ShinRight, required: &[RightKnee, RightAnkle], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(RightKnee, RightAnkle) },
    MetricSpec { id: MetricId::ShoulderWidth, required: &[LeftShoulder, RightShoulder], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(LeftShoulder, RightShoulder) },
    MetricSpec { id: MetricId::PelvisWidth, required: &[LeftHip, RightHip], view: ViewRequirement::Frontal,
        compute: |i| i.dist_cm(LeftHip, RightHip) },
    MetricSpec { id: MetricId::TorsoLength, required: &[LeftShoulder, RightShoulder, LeftHip, RightHip], view: ViewRequirement::Frontal,
        compute: |i| Some((i.mid(LeftShoulder, RightShoulder)? - i.mid(LeftHip, RightHip)?).norm() * i.cm_per_px?) },
    MetricSpec { id: MetricId::ArmLengthDelta,
        required: &[LeftShoulder, LeftElbow, LeftWrist, RightShoulder, RightElbow, RightWrist], view: ViewRequirement::Frontal,
        compute: |i| Some((arm_length(i, LeftShoulder, LeftElbow, LeftWrist)? - arm_length(i, RightShoulder, RightElbow, RightWrist)?).abs()) },
    MetricSpec { id: MetricId::LegLengthDelta,
        required: &[LeftHip, LeftKnee, LeftAnkle, RightHip, RightKnee, RightAnkle], view: ViewRequirement::Frontal,
        compute: |i| Some((leg_length(i, LeftHip, LeftKnee, LeftAnkle)? - leg_length(i, RightHip, RightKnee, RightAnkle)?).abs()) },
    MetricSpec { id: MetricId::ShoulderHeightDelta, required: &[LeftShoulder, RightShoulder], view: ViewRequirement::Frontal,
        compute: |i| height_delta_cm(i, LeftShoulder, RightShoulder) },
    MetricSpec { id: MetricId::HipHeightDelta, required: &[LeftHip, RightHip], view: ViewRequirement::Frontal,
        compute: |i| height_delta_cm(i, LeftHip, RightHip) },
    // 片側の耳と肩があれば計算できる
    MetricSpec { id: MetricId::NeckFlexion, required: &[], view: ViewRequirement::Profile,
        compute: neck_flexion },
    MetricSpec { id: MetricId::TrunkLean, required: &[LeftShoulder, RightShoulder, LeftHip, RightHip], view: ViewRequirement::Profile,
        compute: trunk_lean },
    MetricSpec { id: MetricId::ShoulderTilt, required: &[LeftShoulder, RightShoulder], view: ViewRequirement::Frontal,
        compute: |i| angle_to_horizontal(i.px(LeftShoulder)? - i.px(RightShoulder)?) },
    MetricSpec { id: MetricId::KneeValgusLeft, required: &[LeftHip, LeftKnee, LeftAnkle], view: ViewRequirement::Frontal,
        compute: |i| knee_valgus(i, LeftHip, LeftKnee, LeftAnkle) },
    MetricSpec { id: MetricId::KneeValgusRight, required: &[RightHip, RightKnee, RightAnkle], view: ViewRequirement::Frontal,
        compute: |i| knee_valgus(i, RightHip, RightKnee, RightAnkle) },
    MetricSpec { id: MetricId::HeelLiftLeft, required: &[LeftHeel, LeftFootIndex], view: ViewRequirement::Profile,
        compute: |i| heel_lift(i, LeftHeel, LeftFootIndex) },
    MetricSpec { id: MetricId::HeelLiftRight, required: &[RightHeel, RightFootIndex], view: ViewRequirement::Profile,
        compute: |i| heel_lift(i, RightHeel, RightFootIndex) },
    MetricSpec { id: MetricId::FootAngleLeft, required: &[LeftHeel, LeftFootIndex], view: ViewRequirement::Any,
        compute: |i| foot_angle(i, LeftHeel, LeftFootIndex) },
    MetricSpec { id: MetricId::FootAngleRight, required: &[RightHeel, RightFootIndex], view: ViewRequirement::Any,
        compute: |i| foot_angle(i, RightHeel, RightFootIndex) },
];

/// 動き窓・反復カウント・可動域で追跡するスカラー信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// 正規化座標
    HipCenterX,
    HipCenterY,
    ShoulderCenterX,
    ShoulderCenterY,
    NoseX,
    NoseY,
    /// 角度（度）
    KneeFlexion,
    ElbowFlexion,
    ShoulderAbduction,
    TrunkFlexion,
    NeckTilt,
}

impl Signal {
    pub const ALL: [Signal; 11] = [
        Signal::HipCenterX,
        Signal::HipCenterY,
        Signal::ShoulderCenterX,
        Signal::ShoulderCenterY,
        Signal::NoseX,
        Signal::NoseY,
        Signal::KneeFlexion,
        Signal::ElbowFlexion,
        Signal::ShoulderAbduction,
        Signal::TrunkFlexion,
        Signal::NeckTilt,
    ];

    /// 静止判定に使う位置信号
    pub const POSITIONAL: [Signal; 6] = [
        Signal::HipCenterX,
        Signal::HipCenterY,
        Signal::ShoulderCenterX,
        Signal::ShoulderCenterY,
        Signal::NoseX,
        Signal::NoseY,
    ];

    pub fn compute(self, input: &MetricInput) -> Option<f32> {
        let norm_mid = |a, b| {
            let (a, b): (&Landmark, &Landmark) = (input.lm(a)?, input.lm(b)?);
            Some(((a.x + b.x) / 2.0, (a.y + b.y) / 2.0))
        };
        let value = match self {
            Signal::HipCenterX => norm_mid(LeftHip, RightHip).map(|m| m.0),
            Signal::HipCenterY => norm_mid(LeftHip, RightHip).map(|m| m.1),
            Signal::ShoulderCenterX => norm_mid(LeftShoulder, RightShoulder).map(|m| m.0),
            Signal::ShoulderCenterY => norm_mid(LeftShoulder, RightShoulder).map(|m| m.1),
            Signal::NoseX => input.lm(Nose).map(|l| l.x),
            Signal::NoseY => input.lm(Nose).map(|l| l.y),
            Signal::KneeFlexion => side_mean(
                input.angle(LeftHip, LeftKnee, LeftAnkle),
                input.angle(RightHip, RightKnee, RightAnkle),
            ),
            Signal::ElbowFlexion => side_mean(
                input.angle(LeftShoulder, LeftElbow, LeftWrist),
                input.angle(RightShoulder, RightElbow, RightWrist),
            ),
            Signal::ShoulderAbduction => side_mean(
                input.angle(LeftHip, LeftShoulder, LeftElbow),
                input.angle(RightHip, RightShoulder, RightElbow),
            ),
            Signal::TrunkFlexion => trunk_lean(input),
            Signal::NeckTilt => {
                // 右耳→左耳ベクトルの符号付き傾き
                let v = input.px(LeftEar)? - input.px(RightEar)?;
                if v.norm() < f32::EPSILON {
                    None
                } else {
                    Some(v.y.atan2(v.x).to_degrees())
                }
            }
        };
        value.filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{profile_pose, standing_pose, with_knee_angle, TEST_FRAME};

    fn input(set: &LandmarkSet, scale: Option<f32>) -> MetricInput<'_> {
        MetricInput::new(set, TEST_FRAME, 0.5, scale)
    }

    fn eval(id: MetricId, input: &MetricInput) -> Option<f32> {
        let spec = METRICS.iter().find(|m| m.id == id).unwrap();
        spec.evaluate(input, input.view())
    }

    #[test]
    fn test_every_metric_listed_once() {
        let mut ids: Vec<MetricId> = METRICS.iter().map(|m| m.id).collect();
        let n = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), n);
    }

    #[test]
    fn test_standing_pose_is_frontal() {
        let set = standing_pose();
        assert_eq!(input(&set, None).view(), Some(View::Frontal));
        let side = profile_pose();
        assert_eq!(input(&side, None).view(), Some(View::Profile));
    }

    #[test]
    fn test_lengths_need_scale() {
        let set = standing_pose();
        assert_eq!(eval(MetricId::ShoulderWidth, &input(&set, None)), None);
        let width = eval(MetricId::ShoulderWidth, &input(&set, Some(0.2))).unwrap();
        // 160px * 0.2
        assert!((width - 32.0).abs() < 1e-3, "got {}", width);
    }

    #[test]
    fn test_missing_joint_nulls_only_that_metric() {
        let set = standing_pose();
        let mut partial = LandmarkSet::default();
        for (idx, lm) in set.iter() {
            if idx != LandmarkIndex::LeftWrist {
                partial = partial.with(idx, *lm);
            }
        }
        let i = input(&partial, Some(0.2));
        assert_eq!(eval(MetricId::ForearmLeft, &i), None);
        assert_eq!(eval(MetricId::ArmLengthDelta, &i), None);
        assert!(eval(MetricId::ForearmRight, &i).is_some());
        assert!(eval(MetricId::UpperArmLeft, &i).is_some());
    }

    #[test]
    fn test_symmetric_pose_has_zero_deltas() {
        let set = standing_pose();
        let i = input(&set, Some(0.2));
        assert!(eval(MetricId::ArmLengthDelta, &i).unwrap() < 1e-3);
        assert!(eval(MetricId::LegLengthDelta, &i).unwrap() < 1e-3);
        assert!(eval(MetricId::ShoulderTilt, &i).unwrap() < 1e-3);
        assert!(eval(MetricId::KneeValgusLeft, &i).unwrap() < 0.1);
    }

    #[test]
    fn test_profile_metrics_skip_frontal_pose() {
        let set = standing_pose();
        assert_eq!(eval(MetricId::NeckFlexion, &input(&set, Some(0.2))), None);
        let side = profile_pose();
        let neck = eval(MetricId::NeckFlexion, &input(&side, Some(0.2))).unwrap();
        assert!(neck > 5.0 && neck < 30.0, "got {}", neck);
        assert_eq!(eval(MetricId::ShoulderWidth, &input(&side, Some(0.2))), None);
    }

    #[test]
    fn test_knee_flexion_signal() {
        let set = with_knee_angle(&standing_pose(), 90.0);
        let v = Signal::KneeFlexion.compute(&input(&set, None)).unwrap();
        assert!((v - 90.0).abs() < 0.5, "got {}", v);
        let straight = Signal::KneeFlexion.compute(&input(&standing_pose(), None)).unwrap();
        assert!((straight - 180.0).abs() < 0.5);
    }

    #[test]
    fn test_positional_signals_are_normalized() {
        let set = standing_pose();
        let i = input(&set, None);
        assert!((Signal::HipCenterX.compute(&i).unwrap() - 0.5).abs() < 1e-6);
        assert!((Signal::NoseY.compute(&i).unwrap() - 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_neck_tilt_sign() {
        let level = standing_pose();
        let tilt = Signal::NeckTilt.compute(&input(&level, None)).unwrap();
        assert!(tilt.abs() < 1e-3);
        let ear = *level.get(LandmarkIndex::LeftEar).unwrap();
        let tilted = level.clone().with(LandmarkIndex::LeftEar, Landmark::new(ear.x, ear.y + 0.06, 0.9));
        assert!(Signal::NeckTilt.compute(&input(&tilted, None)).unwrap() > 20.0);
    }
}
