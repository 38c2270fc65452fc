//! Atmospheric forcing fields for the ice-sheet model.
//!
//! Monthly GCM output on the model grid is reduced to what the model's
//! atmosphere couplers read: either a yearly cycle summary (annual and July
//! mean temperature plus mean precipitation) or the monthly series as given.
//! Precipitation is converted from a water mass flux to an ice-equivalent rate.

use ndarray::{Array2, ArrayD, ArrayView3, ArrayViewD, Axis};
use thiserror::Error;

/// Density of glacier ice (kg m-3) used for the water flux to ice rate conversion
pub const ICE_DENSITY: f64 = 910.0;

/// Index of July in a January-first monthly series
pub const JULY: usize = 6;

#[derive(Error, Debug)]
pub enum AtmoError {
    #[error("{name} has no time steps")]
    EmptyTimeAxis { name: &'static str },

    #[error("temperature has {found} time steps, a July mean needs at least {needed}")]
    MissingMonth { needed: usize, found: usize },

    #[error("{name} must be (time, y, x), got shape {shape:?}")]
    NotTimeSeries { name: &'static str, shape: Vec<usize> },

    #[error("precipitation grid {found:?} does not match temperature grid {expected:?}")]
    GridMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// Yearly cycle summary of monthly temperature and precipitation
#[derive(Debug, Clone)]
pub struct YearlyCycle {
    /// Mean over all time steps (K)
    pub air_temp_mean_annual: Array2<f64>,
    /// Temperature of the July step (K)
    pub air_temp_mean_july: Array2<f64>,
    /// Mean precipitation as ice equivalent (m s-1)
    pub precipitation: Array2<f64>,
}

/// Convert precipitation from kg m-2 s-1 to m s-1 of ice.
///
/// 1 kg m-2 of water is 1 mm of water, i.e. `1 / ICE_DENSITY` m of ice.
pub fn precip_to_ice_equivalent(precip: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    precip.mapv(|p| p / ICE_DENSITY)
}

/// Mean over the leading time axis
pub fn time_mean(
    name: &'static str,
    series: ArrayView3<'_, f64>,
) -> Result<Array2<f64>, AtmoError> {
    series
        .mean_axis(Axis(0))
        .ok_or(AtmoError::EmptyTimeAxis { name })
}

/// The July slice of a monthly series
pub fn july_mean(temperature: ArrayView3<'_, f64>) -> Result<Array2<f64>, AtmoError> {
    let steps = temperature.len_of(Axis(0));
    if steps <= JULY {
        return Err(AtmoError::MissingMonth {
            needed: JULY + 1,
            found: steps,
        });
    }
    Ok(temperature.index_axis(Axis(0), JULY).to_owned())
}

/// View a `(time, y, x)` series, rejecting anything else
pub fn as_time_series<'a>(
    name: &'static str,
    data: ArrayViewD<'a, f64>,
) -> Result<ArrayView3<'a, f64>, AtmoError> {
    let shape = data.shape().to_vec();
    data.into_dimensionality().map_err(|_| AtmoError::NotTimeSeries { name, shape })
}

/// Reduce monthly temperature and precipitation to a yearly cycle summary
pub fn yearly_cycle(
    temperature: ArrayView3<'_, f64>,
    precipitation: ArrayView3<'_, f64>,
) -> Result<YearlyCycle, AtmoError> {
    let (_, ty, tx) = temperature.dim();
    let (_, py, px) = precipitation.dim();
    if (ty, tx) != (py, px) {
        return Err(AtmoError::GridMismatch {
            expected: vec![ty, tx],
            found: vec![py, px],
        });
    }

    let precip_mean = time_mean("precipitation", precipitation)?;
    Ok(YearlyCycle {
        air_temp_mean_annual: time_mean("temperature", temperature)?,
        air_temp_mean_july: july_mean(temperature)?,
        precipitation: precip_mean.mapv(|p| p / ICE_DENSITY),
    })
}
