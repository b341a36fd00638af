//! Synthetic poses shared by unit tests.

use crate::pose::{FrameSize, Landmark, LandmarkIndex, LandmarkSet};

use LandmarkIndex::*;

pub const TEST_FRAME: FrameSize = FrameSize { width: 1000, height: 1000 };

const VIS: f32 = 0.9;

fn build(points: &[(LandmarkIndex, f32, f32)]) -> LandmarkSet {
    points
        .iter()
        .fold(LandmarkSet::default(), |set, (idx, x, y)| set.with(*idx, Landmark::new(*x, *y, VIS)))
}

/// 正面を向いて直立、腕を軽く外転
pub fn standing_pose() -> LandmarkSet {
    build(&[
        (Nose, 0.50, 0.12),
        (LeftEyeInner, 0.51, 0.11),
        (LeftEye, 0.515, 0.11),
        (LeftEyeOuter, 0.52, 0.11),
        (RightEyeInner, 0.49, 0.11),
        (RightEye, 0.485, 0.11),
        (RightEyeOuter, 0.48, 0.11),
        (LeftEar, 0.53, 0.12),
        (RightEar, 0.47, 0.12),
        (MouthLeft, 0.51, 0.14),
        (MouthRight, 0.49, 0.14),
        (LeftShoulder, 0.58, 0.22),
        (RightShoulder, 0.42, 0.22),
        (LeftElbow, 0.62, 0.36),
        (RightElbow, 0.38, 0.36),
        (LeftWrist, 0.65, 0.49),
        (RightWrist, 0.35, 0.49),
        (LeftPinky, 0.66, 0.52),
        (RightPinky, 0.34, 0.52),
        (LeftIndex, 0.655, 0.525),
        (RightIndex, 0.345, 0.525),
        (LeftThumb, 0.645, 0.515),
        (RightThumb, 0.355, 0.515),
        (LeftHip, 0.55, 0.52),
        (RightHip, 0.45, 0.52),
        (LeftKnee, 0.55, 0.71),
        (RightKnee, 0.45, 0.71),
        (LeftAnkle, 0.55, 0.89),
        (RightAnkle, 0.45, 0.89),
        (LeftHeel, 0.55, 0.91),
        (RightHeel, 0.45, 0.91),
        (LeftFootIndex, 0.57, 0.92),
        (RightFootIndex, 0.43, 0.92),
    ])
}

/// 右向きの側面立位。耳が肩よりやや前方
pub fn profile_pose() -> LandmarkSet {
    build(&[
        (Nose, 0.56, 0.13),
        (LeftEar, 0.53, 0.12),
        (RightEar, 0.525, 0.12),
        (LeftShoulder, 0.505, 0.22),
        (RightShoulder, 0.495, 0.22),
        (LeftElbow, 0.505, 0.36),
        (RightElbow, 0.495, 0.36),
        (LeftWrist, 0.51, 0.49),
        (RightWrist, 0.49, 0.49),
        (LeftHip, 0.505, 0.52),
        (RightHip, 0.495, 0.52),
        (LeftKnee, 0.51, 0.71),
        (RightKnee, 0.50, 0.71),
        (LeftAnkle, 0.50, 0.89),
        (RightAnkle, 0.49, 0.89),
        (LeftHeel, 0.48, 0.91),
        (RightHeel, 0.47, 0.91),
        (LeftFootIndex, 0.54, 0.915),
        (RightFootIndex, 0.53, 0.915),
    ])
}

fn replace(set: &LandmarkSet, idx: LandmarkIndex, x: f32, y: f32) -> LandmarkSet {
    set.clone().with(idx, Landmark::new(x, y, VIS))
}

/// 股関節-膝-足首の内角が`deg`になるよう足首を置き直す
pub fn with_knee_angle(set: &LandmarkSet, deg: f32) -> LandmarkSet {
    let (s, c) = deg.to_radians().sin_cos();
    let shin = 0.18;
    let mut out = set.clone();
    for (knee, ankle, side) in [(LeftKnee, LeftAnkle, 1.0), (RightKnee, RightAnkle, -1.0)] {
        if let Some(k) = set.get(knee) {
            // 大腿は真上方向なので、上向き単位ベクトルを deg 回転
            out = replace(&out, ankle, k.x + side * shin * s, k.y - shin * c);
        }
    }
    out
}

/// 肩-肘-手首の内角が`deg`になるよう手首を置き直す（上腕は真下）
pub fn with_elbow_angle(set: &LandmarkSet, deg: f32) -> LandmarkSet {
    let (s, c) = deg.to_radians().sin_cos();
    let forearm = 0.13;
    let mut out = set.clone();
    for (shoulder, elbow, wrist, side) in [
        (LeftShoulder, LeftElbow, LeftWrist, 1.0),
        (RightShoulder, RightElbow, RightWrist, -1.0),
    ] {
        if let Some(sh) = set.get(shoulder) {
            let ex = sh.x;
            let ey = sh.y + 0.14;
            out = replace(&out, elbow, ex, ey);
            out = replace(&out, wrist, ex + side * forearm * s, ey - forearm * c);
        }
    }
    out
}

/// 体幹を`deg`だけ前屈させる（股関節中心で肩系を回転）
pub fn with_trunk_flexion(set: &LandmarkSet, deg: f32) -> LandmarkSet {
    let (s, c) = deg.to_radians().sin_cos();
    let (Some(lh), Some(rh)) = (set.get(LeftHip), set.get(RightHip)) else {
        return set.clone();
    };
    let (hx, hy) = ((lh.x + rh.x) / 2.0, (lh.y + rh.y) / 2.0);
    let mut out = set.clone();
    for idx in [Nose, LeftEar, RightEar, LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist] {
        if let Some(p) = set.get(idx) {
            let (dx, dy) = (p.x - hx, p.y - hy);
            // 画像座標で時計回り（右向きの人物が前に倒れる方向）
            out = replace(&out, idx, hx + dx * c - dy * s, hy + dx * s + dy * c);
        }
    }
    out
}

/// 頭部を肩中点まわりに`deg`だけ横へ傾ける（画像座標で時計回りが正）
pub fn with_neck_tilt(set: &LandmarkSet, deg: f32) -> LandmarkSet {
    let (s, c) = deg.to_radians().sin_cos();
    let (Some(ls), Some(rs)) = (set.get(LeftShoulder), set.get(RightShoulder)) else {
        return set.clone();
    };
    let (cx, cy) = ((ls.x + rs.x) / 2.0, (ls.y + rs.y) / 2.0);
    let mut out = set.clone();
    for idx in [
        Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter, LeftEar, RightEar, MouthLeft,
        MouthRight,
    ] {
        if let Some(p) = set.get(idx) {
            let (dx, dy) = (p.x - cx, p.y - cy);
            out = replace(&out, idx, cx + dx * c - dy * s, cy + dx * s + dy * c);
        }
    }
    out
}

/// 全ランドマークを平行移動
pub fn shifted(set: &LandmarkSet, dx: f32, dy: f32) -> LandmarkSet {
    set.iter()
        .fold(LandmarkSet::default(), |out, (idx, lm)| out.with(idx, Landmark::new(lm.x + dx, lm.y + dy, lm.visibility)))
}
