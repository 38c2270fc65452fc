use crate::config::DownscaleConfig;
use crate::parallel::downscale_with_threads;
use ndarray::{Array2, Array3};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// Deterministic downscaling inputs for timing runs
#[derive(Debug, Clone)]
pub struct SyntheticInputs {
    /// Temperature (K) with layout [time, y, x]
    pub field_lo: Array3<f64>,
    /// Ridge-shaped fine orography (m)
    pub elev_hi: Array2<f64>,
    /// Blocky copy of `elev_hi`, as if resampled from a grid 4x coarser
    pub elev_lo: Array2<f64>,
    /// Elliptical ice-sheet mask (1 inside, 0 outside)
    pub mask: Array2<f64>,
}

/// Build a synthetic case on a `size_y` x `size_x` grid with `time_steps` monthly steps
pub fn synthetic_inputs(time_steps: usize, size_y: usize, size_x: usize) -> SyntheticInputs {
    let cy = size_y as f64 / 2.0;
    let cx = size_x as f64 / 2.0;

    let elev_hi = Array2::from_shape_fn((size_y, size_x), |(r, c)| {
        let ridge = 1.0 - ((c as f64 - cx) / cx.max(1.0)).abs();
        2500.0 * ridge.max(0.0) + 5.0 * r as f64
    });
    let elev_lo = Array2::from_shape_fn((size_y, size_x), |(r, c)| {
        elev_hi[[(r / 4) * 4, (c / 4) * 4]]
    });
    let mask = Array2::from_shape_fn((size_y, size_x), |(r, c)| {
        let dy = (r as f64 - cy) / cy.max(1.0);
        let dx = (c as f64 - cx) / cx.max(1.0);
        if dy * dy + dx * dx < 0.8 {
            1.0
        } else {
            0.0
        }
    });
    let field_lo = Array3::from_shape_fn((time_steps, size_y, size_x), |(t, r, c)| {
        let season = 10.0 * (2.0 * std::f64::consts::PI * t as f64 / 12.0).sin();
        273.15 + season - 0.0065 * elev_lo[[r, c]]
    });

    SyntheticInputs {
        field_lo,
        elev_hi,
        elev_lo,
        mask,
    }
}

/// Timing of one thread configuration
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub thread_count: usize,
    pub duration: Duration,
    pub cells_per_second: f64,
}

/// Timings over several thread counts
#[derive(Debug, Clone)]
pub struct BenchmarkSuite {
    pub results: Vec<BenchmarkResult>,
    /// [time, y, x]
    pub shape: (usize, usize, usize),
    pub half_a_box: f64,
}

impl BenchmarkSuite {
    /// Time the kernel once per entry of `thread_counts`
    pub fn run_suite(
        shape: (usize, usize, usize),
        half_a_box: f64,
        thread_counts: &[usize],
    ) -> Result<Self, String> {
        if thread_counts.is_empty() {
            return Err("No thread counts to benchmark".to_string());
        }

        let (time_steps, size_y, size_x) = shape;
        let inputs = synthetic_inputs(time_steps, size_y, size_x);
        let config = DownscaleConfig::new(half_a_box);
        let cells = (time_steps * size_y * size_x) as f64;

        info!(
            "Benchmarking {}x{}x{} grid with half_a_box {} over thread counts {:?}",
            time_steps, size_y, size_x, half_a_box, thread_counts
        );

        let mut results = Vec::with_capacity(thread_counts.len());
        for &thread_count in thread_counts {
            let start = Instant::now();
            downscale_with_threads(
                inputs.field_lo.view().into_dyn(),
                inputs.elev_hi.view().into_dyn(),
                inputs.elev_lo.view().into_dyn(),
                inputs.mask.view().into_dyn(),
                &config,
                thread_count,
            )
            .map_err(|e| format!("Benchmark with {} threads failed: {}", thread_count, e))?;
            let duration = start.elapsed();

            info!("{} threads: {:.3}s", thread_count, duration.as_secs_f64());

            results.push(BenchmarkResult {
                thread_count,
                duration,
                cells_per_second: cells / duration.as_secs_f64().max(f64::EPSILON),
            });
        }

        Ok(Self {
            results,
            shape,
            half_a_box,
        })
    }

    /// Thread count of the fastest run
    pub fn find_optimal_thread_count(&self) -> Option<usize> {
        self.results
            .iter()
            .min_by_key(|r| r.duration)
            .map(|r| r.thread_count)
    }

    /// Write the summary to `<output_dir>/benchmark_report.txt`
    pub fn write_report(&self, output_dir: impl AsRef<Path>) -> Result<(), String> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)
            .map_err(|e| format!("Failed to create output directory: {}", e))?;

        let report_path = output_dir.join("benchmark_report.txt");
        fs::write(&report_path, self.to_string())
            .map_err(|e| format!("Failed to write report {}: {}", report_path.display(), e))?;

        info!("Benchmark report written to {}", report_path.display());
        Ok(())
    }
}

impl fmt::Display for BenchmarkSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (t, y, x) = self.shape;
        writeln!(f, "Downscaling Benchmark:")?;
        writeln!(f, "  Grid: {} time steps of {} x {}", t, y, x)?;
        writeln!(f, "  Half a box: {}", self.half_a_box)?;
        for result in &self.results {
            writeln!(
                f,
                "  {} threads: {:.3}s ({:.0} cells/sec)",
                result.thread_count,
                result.duration.as_secs_f64(),
                result.cells_per_second
            )?;
        }
        if let Some(optimal) = self.find_optimal_thread_count() {
            writeln!(f, "  Optimal thread count: {}", optimal)?;
        }
        Ok(())
    }
}
