//! Scanline sampling shared by the linear readers.

use image::GrayImage;

/// Alternating run lengths of one binarized scanline.
///
/// Even indices are light runs, odd indices are dark runs. A row that
/// starts with ink gets a zero-length leading light run so the parity
/// always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runs {
    lengths: Vec<u32>,
}

impl Runs {
    /// Binarizes `row`, treating values below `threshold` as ink.
    pub fn from_row(row: &[u8], threshold: u8) -> Self {
        let mut lengths = Vec::new();
        let mut dark = false;
        let mut current = 0u32;
        for &v in row {
            let is_dark = v < threshold;
            if is_dark == dark {
                current += 1;
            } else {
                lengths.push(current);
                dark = is_dark;
                current = 1;
            }
        }
        lengths.push(current);
        Self { lengths }
    }

    /// Same runs read right to left.
    pub fn reversed(&self) -> Self {
        let mut lengths: Vec<u32> = self.lengths.iter().rev().copied().collect();
        // Keep a light run at index 0.
        if self.lengths.len() % 2 == 0 {
            lengths.insert(0, 0);
        }
        Self { lengths }
    }

    /// Run lengths, light first.
    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    /// Indices of dark runs preceded by a light run of at least `quiet` pixels.
    pub fn bar_starts<'a>(&'a self, quiet: impl Fn(usize) -> u32 + 'a) -> impl Iterator<Item = usize> + 'a {
        (1..self.lengths.len())
            .step_by(2)
            .filter(move |&i| self.lengths[i - 1] >= quiet(i))
    }

    /// Total width of `count` runs starting at `start`.
    pub fn width(&self, start: usize, count: usize) -> u32 {
        self.lengths[start..start + count].iter().sum()
    }
}

/// Row indices to sweep: the middle row first, then alternately above
/// and below, evenly spread over the image height.
pub fn sweep_rows(height: u32, count: u32) -> Vec<u32> {
    if height == 0 {
        return Vec::new();
    }
    let count = count.clamp(1, height);
    let step = (height / (count + 1)).max(1);
    let middle = height / 2;
    let mut rows = vec![middle];
    let mut offset = 1;
    while (rows.len() as u32) < count {
        let delta = step * offset;
        if let Some(above) = middle.checked_sub(delta) {
            rows.push(above);
        }
        if (rows.len() as u32) < count && middle + delta < height {
            rows.push(middle + delta);
        }
        if delta >= height {
            break;
        }
        offset += 1;
    }
    rows
}

/// Borrows row `y` of a luminance image.
pub fn row(luma: &GrayImage, y: u32) -> &[u8] {
    let width = luma.width() as usize;
    let start = y as usize * width;
    &luma.as_raw()[start..start + width]
}

/// Average deviation of `counters` from `pattern` scaled to the same
/// total width, relative to that width. `None` when any single element
/// strays further than `max_individual` modules.
pub fn pattern_variance(counters: &[u32], pattern: &[u8], max_individual: f32) -> Option<f32> {
    let total: u32 = counters.iter().sum();
    let modules: u32 = pattern.iter().map(|&p| p as u32).sum();
    if total < modules {
        return None;
    }
    let unit = total as f32 / modules as f32;
    let max_individual = max_individual * unit;
    let mut variance = 0.0f32;
    for (&counter, &expected) in counters.iter().zip(pattern) {
        let scaled = expected as f32 * unit;
        let diff = (counter as f32 - scaled).abs();
        if diff > max_individual {
            return None;
        }
        variance += diff;
    }
    Some(variance / total as f32)
}
