//! NetCDF adapter feeding the downscaling kernel.
//!
//! Only moves plain arrays in and out; no metadata conventions are applied
//! beyond dimension names, `units` and a NaN `_FillValue`.

pub mod reader;
pub mod writer;

pub use reader::*;
pub use writer::*;

use crate::atmo::{self, AtmoError};
use crate::config::{AtmoMode, AtmoRunConfig, RunConfig};
use crate::downscale::DownscaleError;
use crate::parallel::downscale_with_threads;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DataIoError {
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("Variable {name} has {found} dimensions but {expected} dimension names were given")]
    DimensionCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Dimension {name} has length {expected} in the output file, data has {found}")]
    DimensionLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Downscaling failed: {0}")]
    Downscale(#[from] DownscaleError),

    #[error("Atmosphere forcing: {0}")]
    Atmo(#[from] AtmoError),
}

/// Read the four inputs named in `config`, downscale, and write the result
pub fn run_downscale(config: &RunConfig) -> Result<(), DataIoError> {
    let field = read_variable(&config.field)?;
    let elev_hi = read_variable(&config.elev_hi)?;
    let elev_lo = read_variable(&config.elev_lo)?;
    let mask = read_variable(&config.mask)?;

    info!(
        "Downscaling {} {:?} with orography {} and mask {}",
        config.field,
        field.data.shape(),
        config.elev_hi,
        config.mask
    );

    let downscaled = downscale_with_threads(
        field.data.view(),
        elev_hi.data.view(),
        elev_lo.data.view(),
        mask.data.view(),
        &config.downscale,
        config.num_threads,
    )?;

    write_variable(
        &config.output,
        &config.output_var,
        &field.dims,
        &downscaled,
        field.units.as_deref(),
    )?;

    info!("Wrote {} to {}", config.output_var, config.output.display());
    Ok(())
}

/// Write the atmosphere forcing variables for `config.mode`.
///
/// Both inputs must be `(time, y, x)` on the same grid. Yearly cycle output
/// lives on the temperature's `(y, x)` dimensions, given output on its
/// `(time, y, x)` dimensions.
pub fn run_prep_atmo(config: &AtmoRunConfig) -> Result<(), DataIoError> {
    let temperature = read_variable(&config.temperature)?;
    let precipitation = read_variable(&config.precipitation)?;
    let temp = atmo::as_time_series("temperature", temperature.data.view())?;
    let precip = atmo::as_time_series("precipitation", precipitation.data.view())?;

    info!(
        "Preparing {:?} atmosphere forcing from {} and {}",
        config.mode, config.temperature, config.precipitation
    );

    match config.mode {
        AtmoMode::YearlyCycle => {
            let cycle = atmo::yearly_cycle(temp, precip)?;
            let grid_dims = &temperature.dims[1..];
            for (name, data, units) in [
                ("air_temp_mean_annual", cycle.air_temp_mean_annual, "K"),
                ("air_temp_mean_july", cycle.air_temp_mean_july, "K"),
                ("precipitation", cycle.precipitation, "m s-1"),
            ] {
                write_variable(&config.output, name, grid_dims, &data.into_dyn(), Some(units))?;
            }
        }
        AtmoMode::Given => {
            if temp.dim() != precip.dim() {
                return Err(AtmoError::GridMismatch {
                    expected: temp.shape().to_vec(),
                    found: precip.shape().to_vec(),
                }
                .into());
            }
            let ice = atmo::precip_to_ice_equivalent(precipitation.data.view());
            write_variable(
                &config.output,
                "air_temp",
                &temperature.dims,
                &temperature.data,
                Some("K"),
            )?;
            write_variable(
                &config.output,
                "precipitation",
                &temperature.dims,
                &ice,
                Some("m s-1"),
            )?;
        }
    }

    info!("Wrote atmosphere forcing to {}", config.output.display());
    Ok(())
}
