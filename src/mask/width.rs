use super::grid::SegMask;
use crate::pose::FrameSize;

/// 指定行（高さに対する割合）の占有幅（セル数）
///
/// 最初と最後の占有セルの間隔。占有セルがなければ0
pub fn row_width(mask: &SegMask, row_fraction: f32) -> usize {
    let Some(y) = row_index(mask, row_fraction) else {
        return 0;
    };
    let Some(row) = mask.row(y) else {
        return 0;
    };
    match (row.iter().position(|c| *c), row.iter().rposition(|c| *c)) {
        (Some(first), Some(last)) => last - first + 1,
        _ => 0,
    }
}

/// 行幅をフレームのピクセル単位に換算
pub fn row_width_px(mask: &SegMask, row_fraction: f32, frame: FrameSize) -> f32 {
    if mask.width() == 0 {
        return 0.0;
    }
    row_width(mask, row_fraction) as f32 * frame.width as f32 / mask.width() as f32
}

/// 円形断面近似の周囲長（cm）。幅0なら None
pub fn circumference_cm(width_px: f32, cm_per_px: f32) -> Option<f32> {
    if !(width_px > 0.0) || !(cm_per_px > 0.0) {
        return None;
    }
    Some(width_px * cm_per_px * std::f32::consts::PI)
}

fn row_index(mask: &SegMask, row_fraction: f32) -> Option<usize> {
    if mask.height() == 0 || !(0.0..=1.0).contains(&row_fraction) {
        return None;
    }
    let y = (row_fraction * mask.height() as f32).floor() as usize;
    Some(y.min(mask.height() - 1))
}
