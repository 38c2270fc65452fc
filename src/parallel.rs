use crate::config::DownscaleConfig;
use crate::downscale::{downscale, DownscaleError};
use ndarray::{ArrayD, ArrayViewD};
use num_traits::{Float, Zero};
use tracing::info;

/// Downscale inside a dedicated rayon thread pool.
///
/// `num_threads == 0` lets rayon pick the number of workers.
pub fn downscale_with_threads<'a, T, M>(
    field_lo: ArrayViewD<'a, T>,
    elev_hi: ArrayViewD<'a, T>,
    elev_lo: ArrayViewD<'a, T>,
    mask: ArrayViewD<'a, M>,
    config: &DownscaleConfig,
    num_threads: usize,
) -> Result<ArrayD<T>, DownscaleError>
where
    T: Float + Send + Sync,
    M: Zero + PartialOrd + Copy + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?;

    info!(
        "Downscaling {:?} field using {} threads",
        field_lo.shape(),
        pool.current_num_threads()
    );

    pool.install(|| downscale(field_lo, elev_hi, elev_lo, mask, config))
}
