use nalgebra::Vector2;

use super::contour::{extract, Contour};
use super::grid::SegMask;
use crate::config::ContourConfig;
use crate::pose::{FrameSize, LandmarkSet};

/// 輪郭の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineSource {
    /// 今フレームのマスクから抽出
    Mask,
    /// 前回抽出した輪郭
    Cached,
    /// 可視ランドマークの凸包
    SkeletonHull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// フレームのピクセル座標
    pub contour: Contour,
    pub source: OutlineSource,
}

/// オーバーレイ用のフレームごとの外形
///
/// マスク輪郭 → 前回の輪郭 → 骨格の凸包 の順にフォールバックする。
pub struct OutlineTracker {
    config: ContourConfig,
    cached: Option<Contour>,
}

impl OutlineTracker {
    pub fn new(config: ContourConfig) -> Self {
        Self { config, cached: None }
    }

    pub fn update(
        &mut self,
        mask: Option<&SegMask>,
        landmarks: &LandmarkSet,
        frame: FrameSize,
        threshold: f32,
    ) -> Option<Outline> {
        if let Some(contour) = mask.and_then(|m| extract(m, &self.config).map(|c| c.to_frame(m, frame))) {
            self.cached = Some(contour.clone());
            return Some(Outline { contour, source: OutlineSource::Mask });
        }
        if let Some(contour) = &self.cached {
            return Some(Outline { contour: contour.clone(), source: OutlineSource::Cached });
        }
        let points: Vec<Vector2<f32>> = landmarks
            .iter()
            .filter(|(_, lm)| lm.is_visible(threshold))
            .map(|(_, lm)| lm.to_pixel(frame))
            .collect();
        convex_hull(points).map(|contour| Outline { contour, source: OutlineSource::SkeletonHull })
    }

    pub fn cached(&self) -> Option<&Contour> {
        self.cached.as_ref()
    }

    pub fn reset(&mut self) {
        self.cached = None;
    }
}

fn cross(o: Vector2<f32>, a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Andrewのモノトーンチェーン。3点未満か一直線なら None
pub fn convex_hull(mut points: Vec<Vector2<f32>>) -> Option<Contour> {
    points.retain(|p| p.x.is_finite() && p.y.is_finite());
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup();
    if points.len() < 3 {
        return None;
    }

    let mut lower: Vec<Vector2<f32>> = Vec::new();
    for p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Vector2<f32>> = Vec::new();
    for p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return None;
    }
    Some(Contour::new(lower))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{standing_pose, TEST_FRAME};

    fn blob() -> SegMask {
        SegMask::from_fn(40, 40, |x, y| (10..30).contains(&x) && (5..35).contains(&y))
    }

    #[test]
    fn test_fresh_mask_then_cache() {
        let mut tracker = OutlineTracker::new(ContourConfig::default());
        let pose = standing_pose();

        let first = tracker.update(Some(&blob()), &pose, TEST_FRAME, 0.5).unwrap();
        assert_eq!(first.source, OutlineSource::Mask);

        let empty = SegMask::from_fn(40, 40, |_, _| false);
        let second = tracker.update(Some(&empty), &pose, TEST_FRAME, 0.5).unwrap();
        assert_eq!(second.source, OutlineSource::Cached);
        assert_eq!(second.contour, first.contour);

        let third = tracker.update(None, &pose, TEST_FRAME, 0.5).unwrap();
        assert_eq!(third.source, OutlineSource::Cached);
    }

    #[test]
    fn test_hull_fallback_without_mask() {
        let mut tracker = OutlineTracker::new(ContourConfig::default());
        let outline = tracker.update(None, &standing_pose(), TEST_FRAME, 0.5).unwrap();
        assert_eq!(outline.source, OutlineSource::SkeletonHull);
        assert!(outline.contour.len() >= 4);
        assert!(outline.contour.area() > 0.0);
    }

    #[test]
    fn test_nothing_available() {
        let mut tracker = OutlineTracker::new(ContourConfig::default());
        assert!(tracker.update(None, &LandmarkSet::default(), TEST_FRAME, 0.5).is_none());
    }

    #[test]
    fn test_reset_drops_cache() {
        let mut tracker = OutlineTracker::new(ContourConfig::default());
        tracker.update(Some(&blob()), &standing_pose(), TEST_FRAME, 0.5);
        assert!(tracker.cached().is_some());
        tracker.reset();
        assert!(tracker.cached().is_none());
    }

    #[test]
    fn test_hull_of_square_with_interior_point() {
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
            Vector2::new(5.0, 5.0),
        ];
        let hull = convex_hull(pts).unwrap();
        assert_eq!(hull.len(), 4);
        assert!((hull.area() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_collinear_points_have_no_hull() {
        let pts = vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0), Vector2::new(2.0, 2.0)];
        assert!(convex_hull(pts).is_none());
    }
}
