//! Box colours

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Ground colour (green)
pub const GROUND_COLOR: u32 = 0x008800;
/// Fallback block colour (sky blue)
pub const BLOCK_COLOR: u32 = 0x00aaff;

const PALETTE: [u32; 8] = [
    0x00aaff, 0x33ccff, 0x3399ff, 0x66ddcc, 0xffaa33, 0xff6677, 0xaa88ff, 0xffdd55,
];

/// How a box is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxStyle {
    /// 0xRRGGBB
    pub color: u32,
    pub wireframe: bool,
}

impl BoxStyle {
    pub fn solid(color: u32) -> Self {
        Self {
            color,
            wireframe: false,
        }
    }

    pub fn ground() -> Self {
        Self::solid(GROUND_COLOR)
    }

    /// CSS colour string for canvas/DOM renderers
    pub fn css_color(&self) -> String {
        format!("#{:06x}", self.color & 0xffffff)
    }
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self::solid(BLOCK_COLOR)
    }
}

/// Seeded colour choice for stacked blocks
///
/// Never picks the same colour twice in a row so neighbouring layers stay
/// distinguishable.
#[derive(Debug, Clone)]
pub struct StylePicker {
    rng: Pcg32,
    last: Option<usize>,
}

impl StylePicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            last: None,
        }
    }

    pub fn next_block(&mut self) -> BoxStyle {
        let mut index = self.rng.random_range(0..PALETTE.len());
        if Some(index) == self.last {
            index = (index + 1) % PALETTE.len();
        }
        self.last = Some(index);
        BoxStyle::solid(PALETTE[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_colors() {
        let mut a = StylePicker::new(42);
        let mut b = StylePicker::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_block(), b.next_block());
        }
    }

    #[test]
    fn test_no_repeat_neighbours() {
        let mut picker = StylePicker::new(7);
        let mut prev = picker.next_block();
        for _ in 0..100 {
            let next = picker.next_block();
            assert_ne!(prev.color, next.color);
            prev = next;
        }
    }

    #[test]
    fn test_css_color() {
        assert_eq!(BoxStyle::ground().css_color(), "#008800");
    }
}
