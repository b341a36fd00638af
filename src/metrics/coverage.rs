use serde::Serialize;

use crate::pose::{LandmarkIndex, LandmarkSet};

/// カバレッジ判定の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageClass {
    Full,
    Partial,
    NoPerson,
}

/// Score at or above which the body counts as fully in view.
pub const FULL_THRESHOLD: f32 = 0.9;
/// Score below which no person is considered present.
pub const NO_PERSON_THRESHOLD: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointGroup {
    Head,
    Shoulders,
    Elbows,
    Wrists,
    Hips,
    Knees,
    Ankles,
    Feet,
}

impl JointGroup {
    pub const ALL: [JointGroup; 8] = [
        JointGroup::Head,
        JointGroup::Shoulders,
        JointGroup::Elbows,
        JointGroup::Wrists,
        JointGroup::Hips,
        JointGroup::Knees,
        JointGroup::Ankles,
        JointGroup::Feet,
    ];

    pub fn joints(self) -> &'static [LandmarkIndex] {
        use LandmarkIndex::*;
        match self {
            JointGroup::Head => &[Nose, LeftEar, RightEar],
            JointGroup::Shoulders => &[LeftShoulder, RightShoulder],
            JointGroup::Elbows => &[LeftElbow, RightElbow],
            JointGroup::Wrists => &[LeftWrist, RightWrist],
            JointGroup::Hips => &[LeftHip, RightHip],
            JointGroup::Knees => &[LeftKnee, RightKnee],
            JointGroup::Ankles => &[LeftAnkle, RightAnkle],
            JointGroup::Feet => &[LeftHeel, RightHeel, LeftFootIndex, RightFootIndex],
        }
    }

    /// 体幹は重め
    pub fn weight(self) -> f32 {
        match self {
            JointGroup::Shoulders | JointGroup::Hips => 1.5,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    /// 重み付き完全性 (0.0〜1.0)
    pub score: f32,
    pub class: CoverageClass,
}

impl Coverage {
    pub fn is_full(&self) -> bool {
        self.class == CoverageClass::Full
    }
}

/// グループ内で閾値以上に見えているランドマークの割合
pub fn group_visibility(landmarks: &LandmarkSet, group: JointGroup, threshold: f32) -> f32 {
    let joints = group.joints();
    let visible = joints
        .iter()
        .filter(|idx| landmarks.visible(**idx, threshold).is_some())
        .count();
    visible as f32 / joints.len() as f32
}

pub fn coverage(landmarks: &LandmarkSet, threshold: f32) -> Coverage {
    let (sum, total) = JointGroup::ALL.iter().fold((0.0, 0.0), |(sum, total), g| {
        (sum + g.weight() * group_visibility(landmarks, *g, threshold), total + g.weight())
    });
    let score = (sum / total).clamp(0.0, 1.0);
    let class = if score >= FULL_THRESHOLD {
        CoverageClass::Full
    } else if score < NO_PERSON_THRESHOLD {
        CoverageClass::NoPerson
    } else {
        CoverageClass::Partial
    };
    Coverage { score, class }
}
