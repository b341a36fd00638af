/// 2値の占有グリッド（人物シルエット）
#[derive(Debug, Clone, PartialEq)]
pub struct SegMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl SegMask {
    /// cellsは行優先。長さが合わなければ None
    pub fn new(width: usize, height: usize, cells: Vec<bool>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self { width, height, cells })
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self { width, height, cells }
    }

    /// セグメンテーションモデルの確率出力を閾値で2値化
    pub fn from_probabilities(width: usize, height: usize, probs: &[f32], threshold: f32) -> Option<Self> {
        if probs.len() != width * height {
            return None;
        }
        let cells = probs.iter().map(|p| *p >= threshold).collect();
        Some(Self { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// 範囲外は非占有
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.cells[y as usize * self.width + x as usize]
    }

    pub fn row(&self, y: usize) -> Option<&[bool]> {
        if y >= self.height {
            return None;
        }
        Some(&self.cells[y * self.width..(y + 1) * self.width])
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    /// 4近傍で連結した最大領域のセル数
    pub fn largest_component(&self) -> usize {
        let mut seen = vec![false; self.cells.len()];
        let mut stack = Vec::new();
        let mut largest = 0;
        for start in 0..self.cells.len() {
            if !self.cells[start] || seen[start] {
                continue;
            }
            seen[start] = true;
            stack.push(start);
            let mut size = 0;
            while let Some(i) = stack.pop() {
                size += 1;
                let (x, y) = (i % self.width, i / self.width);
                let neighbors = [
                    (x > 0).then(|| i - 1),
                    (x + 1 < self.width).then(|| i + 1),
                    (y > 0).then(|| i - self.width),
                    (y + 1 < self.height).then(|| i + self.width),
                ];
                for n in neighbors.into_iter().flatten() {
                    if self.cells[n] && !seen[n] {
                        seen[n] = true;
                        stack.push(n);
                    }
                }
            }
            largest = largest.max(size);
        }
        largest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_length() {
        assert!(SegMask::new(3, 3, vec![false; 8]).is_none());
        assert!(SegMask::new(3, 3, vec![false; 9]).is_some());
    }

    #[test]
    fn test_out_of_bounds_is_empty() {
        let mask = SegMask::from_fn(2, 2, |_, _| true);
        assert!(mask.get(0, 0));
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(2, 1));
        assert!(!mask.get(1, 2));
    }

    #[test]
    fn test_largest_component_is_four_connected() {
        // 対角でしか接しない2ブロック
        let mask = SegMask::from_fn(6, 6, |x, y| (x < 3 && y < 3) || ((3..5).contains(&x) && (3..5).contains(&y)));
        assert_eq!(mask.occupied_count(), 13);
        assert_eq!(mask.largest_component(), 9);
        assert_eq!(SegMask::from_fn(4, 4, |_, _| false).largest_component(), 0);
    }

    #[test]
    fn test_from_probabilities() {
        let mask = SegMask::from_probabilities(2, 1, &[0.2, 0.8], 0.5).unwrap();
        assert!(!mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert_eq!(mask.occupied_count(), 1);
    }
}
