//! Pixel-space geometric primitives over landmarks.
//!
//! All functions are null-safe: a missing point yields `None` and nothing
//! here panics.

use nalgebra::Vector2;

use crate::pose::{FrameSize, Landmark};

/// 2点間のピクセル距離
pub fn distance(a: Option<&Landmark>, b: Option<&Landmark>, frame: FrameSize) -> Option<f32> {
    let (a, b) = (a?.to_pixel(frame), b?.to_pixel(frame));
    Some((a - b).norm())
}

/// 頂点bにおける内角（度）
///
/// ゼロ長のベクトルがある場合は None
pub fn angle_at_vertex(
    a: Option<&Landmark>,
    b: Option<&Landmark>,
    c: Option<&Landmark>,
    frame: FrameSize,
) -> Option<f32> {
    let (a, b, c) = (a?.to_pixel(frame), b?.to_pixel(frame), c?.to_pixel(frame));
    angle_between(a - b, c - b)
}

/// from→toベクトルと上向き鉛直の角度（度）
pub fn angle_to_vertical(from: Option<&Landmark>, to: Option<&Landmark>, frame: FrameSize) -> Option<f32> {
    let v = to?.to_pixel(frame) - from?.to_pixel(frame);
    vector_to_vertical(v)
}

/// 2ベクトルのなす角（度）
pub fn angle_between(v1: Vector2<f32>, v2: Vector2<f32>) -> Option<f32> {
    let (m1, m2) = (v1.norm(), v2.norm());
    if m1 < f32::EPSILON || m2 < f32::EPSILON {
        return None;
    }
    let cos = (v1.dot(&v2) / (m1 * m2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// 画像座標（y下向き）のベクトルと上向き鉛直の角度（度）
pub fn vector_to_vertical(v: Vector2<f32>) -> Option<f32> {
    let len = v.norm();
    if len < f32::EPSILON {
        return None;
    }
    let cos = (-v.y / len).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// 水平線からの傾き（度, 0〜90）
pub fn angle_to_horizontal(v: Vector2<f32>) -> Option<f32> {
    if v.norm() < f32::EPSILON {
        return None;
    }
    Some(v.y.abs().atan2(v.x.abs()).to_degrees())
}

/// 2点の中点（ピクセル座標）
pub fn midpoint(a: Option<&Landmark>, b: Option<&Landmark>, frame: FrameSize) -> Option<Vector2<f32>> {
    Some((a?.to_pixel(frame) + b?.to_pixel(frame)) / 2.0)
}
