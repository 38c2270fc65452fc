use super::DownscaleError;
use crate::config::ASPECT_FACTOR;
use ndarray::{s, ArrayView2};
use num_traits::Float;

/// Rounded half extents of the lapse-rate estimation window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalfWindow {
    /// Half-width along x (columns)
    pub x: usize,
    /// Half-width along y (rows)
    pub y: usize,
}

impl HalfWindow {
    /// `y = round(half_a_box)`, `x = round(0.8 * half_a_box)`, rounding half away from zero.
    /// Both extents must be at least one cell.
    pub fn from_half_a_box(half_a_box: f64) -> Result<Self, DownscaleError> {
        if !half_a_box.is_finite() || half_a_box <= 0.0 {
            return Err(DownscaleError::InvalidWindowSize(half_a_box));
        }

        let y = half_a_box.round();
        let x = (ASPECT_FACTOR * half_a_box).round();
        if y < 1.0 || x < 1.0 {
            return Err(DownscaleError::InvalidWindowSize(half_a_box));
        }

        Ok(Self {
            x: x as usize,
            y: y as usize,
        })
    }
}

/// First and last valid center index along one axis
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interior {
    pub first: usize,
    pub last: usize,
}

impl Interior {
    /// Centers run over `half..len - half`; `None` when the axis is too short to hold one.
    pub fn along(len: usize, half: usize) -> Option<Self> {
        if len > 2 * half {
            Some(Self {
                first: half,
                last: len - half - 1,
            })
        } else {
            None
        }
    }

    /// Inclusive offsets of the write band for `center`, the scatter form of
    /// [`Interior::owning_center`].
    ///
    /// The first center extends a full half-window towards the low boundary and
    /// the last center towards the high boundary; everything else collapses to
    /// the center itself. The first-center test wins when `first == last`.
    #[cfg(test)]
    pub(crate) fn edge_band(&self, center: usize, half: usize) -> (isize, isize) {
        let half = half as isize;
        if center == self.first {
            (-half, 0)
        } else if center == self.last {
            (0, half)
        } else {
            (0, 0)
        }
    }

    /// The center whose write band covers `index`, if any.
    ///
    /// Every index is covered by at most one center, which is what allows
    /// output rows to be filled independently.
    pub fn owning_center(&self, index: usize) -> Option<usize> {
        if index <= self.first {
            Some(self.first)
        } else if index >= self.last {
            (self.last > self.first).then_some(self.last)
        } else {
            Some(index)
        }
    }
}

/// Window of `array` centered at `(row, col)`: rows `row - half.y .. row + half.y`,
/// columns `col - half.x .. col + half.x` (end-exclusive).
///
/// The caller guarantees the center lies in the interior of both axes.
pub fn window<'a, T>(
    array: &ArrayView2<'a, T>,
    row: usize,
    col: usize,
    half: HalfWindow,
) -> ArrayView2<'a, T> {
    array.clone().slice_move(s![
        row - half.y..row + half.y,
        col - half.x..col + half.x
    ])
}

/// Minimum and maximum of `values`, ignoring NaN. All-NaN (or empty) input gives `(NaN, NaN)`.
pub fn nan_extrema<T: Float>(values: &ArrayView2<'_, T>) -> (T, T) {
    values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<(T, T)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((T::nan(), T::nan()))
}
