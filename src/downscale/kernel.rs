use super::window::{nan_extrema, window, HalfWindow, Interior};
use super::DownscaleError;
use crate::config::FillPolicy;
use ndarray::{Array2, ArrayView2};
use num_traits::{Float, Zero};
use rayon::prelude::*;
use tracing::debug;

/// Lapse rate estimated from the extrema of one window
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalLapse<T> {
    /// `max_elev_lo == min_elev_lo`: no lapse signal, the field is copied unchanged
    Flat,
    /// `(min_field_lo - max_field_lo) / (max_elev_lo - min_elev_lo)`
    Sloped(T),
}

impl<T: Float> LocalLapse<T> {
    /// Estimate the lapse rate from the `field_lo` and `elev_lo` windows centered at `(row, col)`
    pub fn estimate(
        field_lo: &ArrayView2<'_, T>,
        elev_lo: &ArrayView2<'_, T>,
        row: usize,
        col: usize,
        half: HalfWindow,
    ) -> Self {
        let (min_elev_lo, max_elev_lo) = nan_extrema(&window(elev_lo, row, col, half));
        if max_elev_lo == min_elev_lo {
            return LocalLapse::Flat;
        }

        let (min_field_lo, max_field_lo) = nan_extrema(&window(field_lo, row, col, half));
        LocalLapse::Sloped((min_field_lo - max_field_lo) / (max_elev_lo - min_elev_lo))
    }

    /// Corrected value of one cell
    pub fn apply(&self, field_lo: T, elev_hi: T, elev_lo: T) -> T {
        match *self {
            LocalLapse::Flat => field_lo,
            LocalLapse::Sloped(lapse) => field_lo + lapse * (elev_hi - elev_lo),
        }
    }
}

/// The four co-registered 2D inputs of one time step
pub(crate) struct SliceInputs<'a, T, M> {
    pub field_lo: ArrayView2<'a, T>,
    pub elev_hi: ArrayView2<'a, T>,
    pub elev_lo: ArrayView2<'a, T>,
    pub mask: ArrayView2<'a, M>,
}

/// Downscale one 2D slice. Shapes are checked by the caller.
///
/// Output rows are filled in parallel; each row is written only by the worker
/// that owns it.
pub(crate) fn downscale_slice<T, M>(
    inputs: &SliceInputs<'_, T, M>,
    half: HalfWindow,
    fill_policy: FillPolicy,
) -> Result<Array2<T>, DownscaleError>
where
    T: Float + Send + Sync,
    M: Zero + PartialOrd + Copy + Sync,
{
    let (size_y, size_x) = inputs.field_lo.dim();

    let mut data: Vec<T> = match fill_policy {
        FillPolicy::Nan => vec![T::nan(); size_y * size_x],
        FillPolicy::PassThrough => inputs.field_lo.iter().copied().collect(),
    };

    match (
        Interior::along(size_y, half.y),
        Interior::along(size_x, half.x),
    ) {
        (Some(rows), Some(cols)) => {
            debug!(
                "Centers span rows {}..={} and columns {}..={}",
                rows.first, rows.last, cols.first, cols.last
            );
            data.par_chunks_mut(size_x)
                .enumerate()
                .for_each(|(r, out_row)| fill_row(inputs, half, rows, cols, r, out_row));
        }
        _ => debug!(
            "Grid {}x{} is too small for half window {:?}, nothing to downscale",
            size_y, size_x, half
        ),
    }

    Ok(Array2::from_shape_vec((size_y, size_x), data)?)
}

fn fill_row<T, M>(
    inputs: &SliceInputs<'_, T, M>,
    half: HalfWindow,
    rows: Interior,
    cols: Interior,
    r: usize,
    out_row: &mut [T],
) where
    T: Float,
    M: Zero + PartialOrd + Copy,
{
    let Some(i) = rows.owning_center(r) else {
        return;
    };

    for (c, out) in out_row.iter_mut().enumerate() {
        let Some(j) = cols.owning_center(c) else {
            continue;
        };
        if !(inputs.mask[[i, j]] > M::zero() && inputs.mask[[r, c]] > M::zero()) {
            continue;
        }

        let lapse = LocalLapse::estimate(&inputs.field_lo, &inputs.elev_lo, i, j, half);
        *out = lapse.apply(
            inputs.field_lo[[r, c]],
            inputs.elev_hi[[r, c]],
            inputs.elev_lo[[r, c]],
        );
    }
}
