//! Neighborhood bounding rectangles.
//!
//! The city layout is 59 rectangles on a 400×625 grid, one per community
//! district. Any other neighborhood count falls back to an even block split
//! of the grid.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

pub const NYC_WIDTH: u32 = 400;
pub const NYC_HEIGHT: u32 = 625;
pub const NYC_HOODS: usize = 59;

/// Half-open rectangle `[min_x, max_x) × [min_y, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoodRect {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl HoodRect {
    pub const fn new(min_x: u32, max_x: u32, min_y: u32, max_y: u32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn area(&self) -> u64 {
        self.max_x.saturating_sub(self.min_x) as u64 * self.max_y.saturating_sub(self.min_y) as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.min_x..self.max_x).contains(&x) && (self.min_y..self.max_y).contains(&y)
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + use<> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..self.max_y).flat_map(move |y| (min_x..max_x).map(move |x| (x, y)))
    }
}

// Indexed by neighborhood id: (min_x, max_x, min_y, max_y)
const NYC_RECTS: [(u32, u32, u32, u32); NYC_HOODS] = [
    (60, 140, 78, 98),
    (140, 230, 78, 98),
    (160, 230, 60, 78),
    (60, 160, 60, 78),
    (60, 120, 40, 60),
    (120, 230, 40, 60),
    (60, 230, 18, 40),
    (0, 60, 0, 42),
    (230, 288, 36, 88),
    (288, 400, 36, 88),
    (230, 400, 18, 36),
    (60, 400, 0, 18),
    (60, 205, 182, 210),
    (60, 160, 210, 230),
    (160, 280, 210, 230),
    (205, 264, 182, 210),
    (182, 280, 230, 286),
    (60, 106, 230, 286),
    (60, 150, 286, 318),
    (106, 154, 230, 258),
    (106, 154, 258, 286),
    (60, 150, 318, 350),
    (180, 280, 350, 380),
    (150, 235, 286, 318),
    (180, 215, 380, 455),
    (150, 235, 318, 350),
    (215, 280, 380, 455),
    (154, 182, 230, 286),
    (235, 280, 286, 350),
    (180, 280, 455, 555),
    (0, 60, 328, 350),
    (0, 30, 282, 328),
    (30, 60, 282, 328),
    (0, 21, 222, 282),
    (21, 40, 222, 282),
    (40, 60, 222, 282),
    (0, 30, 164, 222),
    (30, 60, 164, 222),
    (0, 12, 80, 164),
    (12, 36, 80, 164),
    (36, 60, 80, 164),
    (0, 60, 42, 80),
    (60, 230, 98, 130),
    (60, 264, 130, 152),
    (230, 324, 88, 130),
    (264, 324, 130, 162),
    (60, 264, 152, 182),
    (264, 324, 162, 210),
    (324, 400, 88, 210),
    (306, 348, 210, 360),
    (280, 306, 210, 360),
    (280, 307, 360, 555),
    (348, 400, 210, 360),
    (307, 347, 360, 555),
    (347, 400, 360, 555),
    (180, 400, 555, 625),
    (0, 180, 350, 415),
    (0, 180, 415, 520),
    (0, 180, 520, 625),
];

pub fn nyc_layout() -> Vec<HoodRect> {
    NYC_RECTS
        .iter()
        .map(|&(min_x, max_x, min_y, max_y)| HoodRect::new(min_x, max_x, min_y, max_y))
        .collect()
}

/// Split the grid into `n` near-equal blocks, row-major. Blocks in the last
/// column and row stretch to the grid edge.
pub fn block_layout(n: usize, width: u32, height: u32) -> SimResult<Vec<HoodRect>> {
    if n == 0 {
        return Err(SimError::Config("cannot lay out zero neighborhoods".into()));
    }
    let cols = (n as f64).sqrt().ceil() as u32;
    let rows = (n as u32).div_ceil(cols);
    if width < cols || height < rows {
        return Err(SimError::Config(format!(
            "{width}x{height} grid is too small for {n} neighborhoods"
        )));
    }
    let block_w = width / cols;
    let block_h = height / rows;

    Ok((0..n as u32)
        .map(|k| {
            let (col, row) = (k % cols, k / cols);
            let max_x = if col + 1 == cols { width } else { (col + 1) * block_w };
            let max_y = if row + 1 == rows { height } else { (row + 1) * block_h };
            HoodRect::new(col * block_w, max_x, row * block_h, max_y)
        })
        .collect())
}

/// City layout for the standard grid, block layout otherwise.
pub fn layout_for(n: usize, width: u32, height: u32) -> SimResult<Vec<HoodRect>> {
    if n == NYC_HOODS && width == NYC_WIDTH && height == NYC_HEIGHT {
        Ok(nyc_layout())
    } else {
        block_layout(n, width, height)
    }
}

/// Check that every rectangle is non-empty and inside the grid.
pub fn validate_layout(rects: &[HoodRect], expected: usize, width: u32, height: u32) -> SimResult<()> {
    if rects.len() != expected {
        return Err(SimError::LayoutMismatch {
            layout: rects.len(),
            expected,
        });
    }
    for (i, r) in rects.iter().enumerate() {
        if r.area() == 0 || r.max_x > width || r.max_y > height {
            return Err(SimError::LayoutOutOfBounds {
                hood: i as u32,
                min_x: r.min_x,
                min_y: r.min_y,
                max_x: r.max_x,
                max_y: r.max_y,
                width,
                height,
            });
        }
    }
    Ok(())
}
