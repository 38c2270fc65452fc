pub mod atmo;
pub mod benchmark;
pub mod config;
#[cfg(feature = "netcdf")]
pub mod data_io;
pub mod downscale;
pub mod parallel;

pub use downscale::{downscale, downscale_2d, DownscaleError};
