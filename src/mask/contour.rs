//! マスク境界の抽出
//!
//! マーチングスクエアでセル境界の線分を作り、端点でつないで閉ループにする。
//! 最大面積のループを角切り（Chaikin）で平滑化し、弧長で等間隔に再標本化する。
//! 座標はマスクのセル単位で、セル(x, y)の中心が(x, y)。

use std::collections::HashMap;

use nalgebra::Vector2;

use super::grid::SegMask;
use crate::config::ContourConfig;
use crate::pose::FrameSize;

/// 閉じた多角形（始点は末尾に重複させない）
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Vector2<f32>>,
}

impl Contour {
    pub fn new(points: Vec<Vector2<f32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 靴紐公式による面積（常に非負）
    pub fn area(&self) -> f32 {
        polygon_area(&self.points).abs()
    }

    /// マスク座標からフレームのピクセル座標へ
    pub fn to_frame(&self, mask: &SegMask, frame: FrameSize) -> Contour {
        if mask.width() == 0 || mask.height() == 0 {
            return Contour::new(Vec::new());
        }
        let sx = frame.width as f32 / mask.width() as f32;
        let sy = frame.height as f32 / mask.height() as f32;
        let points = self
            .points
            .iter()
            .map(|p| Vector2::new((p.x + 0.5) * sx, (p.y + 0.5) * sy))
            .collect();
        Contour::new(points)
    }
}

/// マスクの外形を抽出する。最大連結領域が小さすぎる場合は None
pub fn extract(mask: &SegMask, config: &ContourConfig) -> Option<Contour> {
    if mask.largest_component() < config.min_pixels {
        return None;
    }
    let segments = march(mask);
    let largest = stitch(&segments)
        .into_iter()
        .map(|ring| ring.into_iter().map(|k| Vector2::new(k.0 as f32 / 2.0, k.1 as f32 / 2.0)).collect::<Vec<_>>())
        .filter(|ring| ring.len() >= 3)
        .max_by(|a, b| polygon_area(a).abs().total_cmp(&polygon_area(b).abs()))?;

    let mut points = largest;
    for _ in 0..config.smoothing_iterations {
        points = chaikin(&points);
    }
    if config.resample_points >= 3 {
        points = resample(&points, config.resample_points);
    }
    if points.len() < 3 {
        return None;
    }
    Some(Contour::new(points))
}

/// 2倍座標の線分端点（半整数座標を整数で表す）
type Key = (i64, i64);

/// 2x2近傍ごとの境界線分
fn march(mask: &SegMask) -> Vec<(Key, Key)> {
    let (w, h) = (mask.width() as i64, mask.height() as i64);
    let mut segments = Vec::new();
    // 外周を空セルで囲んだものとして走査し、端に接するループも閉じさせる
    for y in -1..h {
        for x in -1..w {
            let tl = mask.get(x, y);
            let tr = mask.get(x + 1, y);
            let br = mask.get(x + 1, y + 1);
            let bl = mask.get(x, y + 1);
            let case = (tl as u8) << 3 | (tr as u8) << 2 | (br as u8) << 1 | bl as u8;

            let top = (2 * x + 1, 2 * y);
            let right = (2 * x + 2, 2 * y + 1);
            let bottom = (2 * x + 1, 2 * y + 2);
            let left = (2 * x, 2 * y + 1);

            match case {
                0 | 15 => {}
                1 | 14 => segments.push((left, bottom)),
                2 | 13 => segments.push((bottom, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((top, right)),
                6 | 9 => segments.push((top, bottom)),
                7 | 8 => segments.push((left, top)),
                // 鞍点は対角の角を分離したまま扱う
                5 => {
                    segments.push((left, bottom));
                    segments.push((top, right));
                }
                10 => {
                    segments.push((left, top));
                    segments.push((bottom, right));
                }
                _ => {}
            }
        }
    }
    segments
}

/// 端点を共有する線分をたどって閉ループにまとめる。閉じないチェーンは捨てる
fn stitch(segments: &[(Key, Key)]) -> Vec<Vec<Key>> {
    let mut by_point: HashMap<Key, Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        by_point.entry(*a).or_default().push(i);
        by_point.entry(*b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut rings = Vec::new();
    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (origin, mut cursor) = segments[start];
        let mut ring = vec![origin];
        let closed = loop {
            if cursor == origin {
                break true;
            }
            ring.push(cursor);
            let next = by_point
                .get(&cursor)
                .and_then(|ids| ids.iter().copied().find(|id| !used[*id]));
            let Some(id) = next else {
                break false;
            };
            used[id] = true;
            let (a, b) = segments[id];
            cursor = if a == cursor { b } else { a };
        };
        if closed {
            rings.push(ring);
        }
    }
    rings
}

fn edges(points: &[Vector2<f32>]) -> impl Iterator<Item = (Vector2<f32>, Vector2<f32>)> + '_ {
    let n = points.len();
    (0..n).map(move |i| (points[i], points[(i + 1) % n]))
}

/// 符号付き面積
fn polygon_area(points: &[Vector2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    edges(points).map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f32>() / 2.0
}

/// 角切り1回分。各辺の1/4と3/4の点で置き換える
fn chaikin(points: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    edges(points)
        .flat_map(|(a, b)| [a * 0.75 + b * 0.25, a * 0.25 + b * 0.75])
        .collect()
}

/// 周長を等分する`count`点に再標本化
fn resample(points: &[Vector2<f32>], count: usize) -> Vec<Vector2<f32>> {
    let perimeter: f32 = edges(points).map(|(a, b)| (b - a).norm()).sum();
    if perimeter <= f32::EPSILON || count == 0 {
        return points.to_vec();
    }
    let step = perimeter / count as f32;
    let mut out = Vec::with_capacity(count);
    let mut target = 0.0;
    let mut walked = 0.0;
    for (a, b) in edges(points) {
        let len = (b - a).norm();
        while out.len() < count && target <= walked + len {
            let t = if len > f32::EPSILON { (target - walked) / len } else { 0.0 };
            out.push(a + (b - a) * t);
            target += step;
        }
        walked += len;
    }
    out
}
