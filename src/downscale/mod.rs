//! Elevation lapse-rate downscaling.
//!
//! A coarse field already resampled onto the fine grid is corrected cell by cell:
//! the lapse rate is estimated from the extrema of the coarse elevation and the
//! coarse field inside a moving window, then applied to the difference between
//! the fine and the coarse elevation.

mod kernel;
mod window;

#[cfg(test)]
mod tests;

pub use kernel::LocalLapse;
pub use window::{nan_extrema, window, HalfWindow, Interior};

use crate::config::DownscaleConfig;
use kernel::SliceInputs;
use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayView3, ArrayViewD, Axis, Ix2, Ix3};
use num_traits::{Float, Zero};
use rayon::prelude::*;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DownscaleError {
    #[error("{name} has shape {found:?}, expected {expected:?}")]
    DimensionMismatch {
        name: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("field has {0} dimensions after squeezing, at most 3 (time, y, x) are supported")]
    TooManyDimensions(usize),

    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    #[error("Invalid window size: half_a_box = {0}")]
    InvalidWindowSize(f64),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// How the field relates to the 2D orography grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    /// Same shape as the orography
    Spatial,
    /// Leading time axis of the given length, trailing axes match the orography
    TimeLeading(usize),
}

impl Layout {
    fn detect(field: &[usize], grid: &[usize]) -> Result<Self, DownscaleError> {
        match field.len() {
            2 if field == grid => Ok(Layout::Spatial),
            2 => Err(DownscaleError::DimensionMismatch {
                name: "field_lo",
                expected: grid.to_vec(),
                found: field.to_vec(),
            }),
            3 if &field[1..] == grid => Ok(Layout::TimeLeading(field[0])),
            _ => Err(DownscaleError::UnsupportedLayout(format!(
                "field shape {:?} does not align with orography shape {:?}, time must lead",
                field, grid
            ))),
        }
    }
}

/// Drop every axis of length one
fn squeeze<A>(mut view: ArrayViewD<'_, A>) -> ArrayViewD<'_, A> {
    while let Some(axis) = view.shape().iter().position(|&len| len == 1) {
        view = view.index_axis_move(Axis(axis), 0);
    }
    view
}

fn check_shape(
    name: &'static str,
    expected: &[usize],
    found: &[usize],
) -> Result<(), DownscaleError> {
    if expected == found {
        Ok(())
    } else {
        Err(DownscaleError::DimensionMismatch {
            name,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}

/// Downscale `field_lo` onto the fine grid described by `elev_hi`.
///
/// Size-one axes are squeezed before the layout is inspected. After squeezing the
/// orography and the mask must be 2D `(y, x)` and the field either `(y, x)` or
/// `(time, y, x)`; time steps are processed independently. The result has the
/// shape of `field_lo` as given.
///
/// Cells outside every write band, and cells whose band center fails the mask,
/// hold the value selected by `config.fill_policy` (NaN by default).
pub fn downscale<'a, T, M>(
    field_lo: ArrayViewD<'a, T>,
    elev_hi: ArrayViewD<'a, T>,
    elev_lo: ArrayViewD<'a, T>,
    mask: ArrayViewD<'a, M>,
    config: &DownscaleConfig,
) -> Result<ArrayD<T>, DownscaleError>
where
    T: Float + Send + Sync,
    M: Zero + PartialOrd + Copy + Send + Sync,
{
    let start = Instant::now();
    let half = config.half_window()?;
    info!("Half a box x and y are: ({}, {})", half.x, half.y);

    let output_shape = field_lo.shape().to_vec();
    let field = squeeze(field_lo);
    if field.ndim() > 3 {
        return Err(DownscaleError::TooManyDimensions(field.ndim()));
    }

    let elev_hi = squeeze(elev_hi);
    let elev_lo = squeeze(elev_lo);
    check_shape("elev_lo", elev_hi.shape(), elev_lo.shape())?;
    if elev_hi.ndim() != 2 {
        return Err(DownscaleError::UnsupportedLayout(format!(
            "orography must be 2D after squeezing, got shape {:?}",
            elev_hi.shape()
        )));
    }
    let mask = squeeze(mask);
    check_shape("mask", elev_hi.shape(), mask.shape())?;

    let elev_hi = elev_hi.into_dimensionality::<Ix2>()?;
    let elev_lo = elev_lo.into_dimensionality::<Ix2>()?;
    let mask = mask.into_dimensionality::<Ix2>()?;

    let result = match Layout::detect(field.shape(), elev_hi.shape())? {
        Layout::Spatial => {
            let inputs = SliceInputs {
                field_lo: field.into_dimensionality::<Ix2>()?,
                elev_hi,
                elev_lo,
                mask,
            };
            kernel::downscale_slice(&inputs, half, config.fill_policy)?.into_dyn()
        }
        Layout::TimeLeading(steps) => {
            warn!("Field has a time dimension, looping over {} time steps", steps);
            let field = field.into_dimensionality::<Ix3>()?;
            downscale_time_steps(field, elev_hi, elev_lo, mask, half, config)?.into_dyn()
        }
    };

    info!("Finished! Time was {:.3}s", start.elapsed().as_secs_f64());
    Ok(result.into_shape(output_shape)?)
}

/// Typed entry point for a single 2D field. All four arrays must share one shape.
pub fn downscale_2d<'a, T, M>(
    field_lo: ArrayView2<'a, T>,
    elev_hi: ArrayView2<'a, T>,
    elev_lo: ArrayView2<'a, T>,
    mask: ArrayView2<'a, M>,
    config: &DownscaleConfig,
) -> Result<Array2<T>, DownscaleError>
where
    T: Float + Send + Sync,
    M: Zero + PartialOrd + Copy + Sync,
{
    let half = config.half_window()?;
    check_shape("elev_lo", elev_hi.shape(), elev_lo.shape())?;
    check_shape("mask", elev_hi.shape(), mask.shape())?;
    check_shape("field_lo", elev_hi.shape(), field_lo.shape())?;

    let inputs = SliceInputs {
        field_lo,
        elev_hi,
        elev_lo,
        mask,
    };
    kernel::downscale_slice(&inputs, half, config.fill_policy)
}

fn downscale_time_steps<'a, T, M>(
    field: ArrayView3<'a, T>,
    elev_hi: ArrayView2<'a, T>,
    elev_lo: ArrayView2<'a, T>,
    mask: ArrayView2<'a, M>,
    half: HalfWindow,
    config: &DownscaleConfig,
) -> Result<Array3<T>, DownscaleError>
where
    T: Float + Send + Sync,
    M: Zero + PartialOrd + Copy + Send + Sync,
{
    let steps = field.len_of(Axis(0));
    if steps == 0 {
        return Ok(Array3::from_elem(field.dim(), T::nan()));
    }

    let slices = (0..steps)
        .into_par_iter()
        .map(|t| {
            debug!("Working on time step {}", t);
            let inputs = SliceInputs {
                field_lo: field.index_axis(Axis(0), t),
                elev_hi: elev_hi.view(),
                elev_lo: elev_lo.view(),
                mask: mask.view(),
            };
            kernel::downscale_slice(&inputs, half, config.fill_policy)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let views: Vec<ArrayView2<'_, T>> = slices.iter().map(|s| s.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}
