//! Screen slots for the search array. Pure geometry: origin-centered pixel
//! coordinates, independent of landscape and session state.

use serde::{Deserialize, Serialize};

use crate::core::error::{GemsError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: ScreenPos) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// `num` evenly spaced values over `[start, stop]`; a single value is `start`.
fn linspace(start: f32, stop: f32, num: u32) -> Vec<f32> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f32;
            (0..num).map(|i| start + step * i as f32).collect()
        }
    }
}

/// Evenly spaced slots over a `viewport = (width, height)` centered at the
/// origin, keeping `margin` pixels from each edge.
///
/// Ordering: column (x) positions outer, row (y) positions inner, so slot
/// `i` is column `i / n_rows`, row `i % n_rows`.
pub fn layout(n_rows: u32, n_cols: u32, viewport: (f32, f32), margin: f32) -> Vec<ScreenPos> {
    let (w, h) = viewport;
    let xs = linspace(-w / 2.0 + margin, w / 2.0 - margin, n_cols);
    let ys = linspace(-h / 2.0 + margin, h / 2.0 - margin, n_rows);
    xs.iter()
        .flat_map(|&x| ys.iter().map(move |&y| ScreenPos::new(x, y)))
        .collect()
}

/// Slots plus the stimulus footprint used for hit testing.
#[derive(Clone, Debug, PartialEq)]
pub struct StimulusLayout {
    slots: Vec<ScreenPos>,
    stim_size: f32,
}

impl StimulusLayout {
    pub fn new(
        n_rows: u32,
        n_cols: u32,
        viewport: (f32, f32),
        margin: f32,
        stim_size: f32,
    ) -> Result<Self> {
        if n_rows == 0 || n_cols == 0 {
            return Err(GemsError::Configuration(format!(
                "stimulus grid must be at least 1x1, got {n_rows}x{n_cols}"
            )));
        }
        if !(stim_size.is_finite() && stim_size > 0.0) {
            return Err(GemsError::Configuration(format!(
                "stimulus size must be positive, got {stim_size}"
            )));
        }
        if 2.0 * margin > viewport.0 || 2.0 * margin > viewport.1 {
            return Err(GemsError::Configuration(format!(
                "margin {margin} does not fit a {}x{} viewport",
                viewport.0, viewport.1
            )));
        }
        Ok(Self {
            slots: layout(n_rows, n_cols, viewport, margin),
            stim_size,
        })
    }

    pub fn slots(&self) -> &[ScreenPos] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stim_size(&self) -> f32 {
        self.stim_size
    }

    /// Index of the slot whose circular stimulus contains `pos`.
    pub fn hit_test(&self, pos: ScreenPos) -> Option<usize> {
        let radius = self.stim_size / 2.0;
        self.slots
            .iter()
            .position(|slot| slot.distance(pos) <= radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(-1.0, 1.0, 3), vec![-1.0, 0.0, 1.0]);
        assert_eq!(linspace(4.0, 9.0, 1), vec![4.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn three_by_three_ordering() {
        let slots = layout(3, 3, (600.0, 600.0), 100.0);
        assert_eq!(slots.len(), 9);
        assert_eq!(slots[0], ScreenPos::new(-200.0, -200.0));
        assert_eq!(slots[1], ScreenPos::new(-200.0, 0.0));
        assert_eq!(slots[3], ScreenPos::new(0.0, -200.0));
        assert_eq!(slots[8], ScreenPos::new(200.0, 200.0));
    }

    #[test]
    fn hit_test_uses_circle() {
        let lay = StimulusLayout::new(3, 3, (600.0, 600.0), 100.0, 60.0).unwrap();
        assert_eq!(lay.hit_test(ScreenPos::new(0.0, 0.0)), Some(4));
        assert_eq!(lay.hit_test(ScreenPos::new(20.0, 20.0)), Some(4));
        assert_eq!(lay.hit_test(ScreenPos::new(25.0, 25.0)), None);
        assert_eq!(lay.hit_test(ScreenPos::new(-100.0, 0.0)), None);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(StimulusLayout::new(0, 3, (100.0, 100.0), 0.0, 10.0).is_err());
        assert!(StimulusLayout::new(3, 3, (100.0, 100.0), 60.0, 10.0).is_err());
        assert!(StimulusLayout::new(3, 3, (100.0, 100.0), 0.0, 0.0).is_err());
    }
}
