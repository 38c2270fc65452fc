use crate::downscale::{DownscaleError, HalfWindow};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// Aspect factor applied to the x half-extent of the estimation window.
/// Compensates for the different x and y grid spacing of the target grids.
pub const ASPECT_FACTOR: f64 = 0.8;

/// Default half-width (in cells) of the estimation window
pub const DEFAULT_HALF_A_BOX: f64 = 20.0;

/// Default name of the variable written by the `downscale` subcommand
pub const DEFAULT_OUTPUT_VAR: &str = "air_temp_downscaled";

/// What the output holds in cells the kernel never writes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillPolicy {
    /// Untouched cells are NaN ("no data available here")
    #[default]
    Nan,
    /// Untouched cells keep the value of the input field
    PassThrough,
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nan" => Ok(FillPolicy::Nan),
            "pass-through" | "passthrough" => Ok(FillPolicy::PassThrough),
            other => Err(format!(
                "Invalid fill policy: {}. Expected: nan or pass-through",
                other
            )),
        }
    }
}

/// Kernel configuration
#[derive(Clone, Debug, PartialEq)]
pub struct DownscaleConfig {
    /// Half-width of the estimation window along y; the x half-width is
    /// `round(ASPECT_FACTOR * half_a_box)`
    pub half_a_box: f64,
    /// Value of cells outside every write band
    pub fill_policy: FillPolicy,
}

impl Default for DownscaleConfig {
    fn default() -> Self {
        Self {
            half_a_box: DEFAULT_HALF_A_BOX,
            fill_policy: FillPolicy::Nan,
        }
    }
}

impl DownscaleConfig {
    pub fn new(half_a_box: f64) -> Self {
        Self {
            half_a_box,
            ..Self::default()
        }
    }

    pub fn with_fill_policy(mut self, fill_policy: FillPolicy) -> Self {
        self.fill_policy = fill_policy;
        self
    }

    /// Validate the window size and return the rounded half extents
    pub fn half_window(&self) -> Result<HalfWindow, DownscaleError> {
        HalfWindow::from_half_a_box(self.half_a_box)
    }
}

/// A `(file, variable)` pair given on the command line as `path,varname`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileVar {
    pub path: PathBuf,
    pub variable: String,
}

impl FromStr for FileVar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [path, variable] if !path.is_empty() && !variable.is_empty() => Ok(Self {
                path: PathBuf::from(path),
                variable: variable.to_string(),
            }),
            _ => Err(format!("Must be given as: filename,varname (got '{}')", s)),
        }
    }
}

impl fmt::Display for FileVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.variable)
    }
}

/// Everything the `downscale` subcommand needs
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Low resolution field, resampled to the high resolution grid
    pub field: FileVar,
    /// High resolution (target) orography
    pub elev_hi: FileVar,
    /// Low resolution (original) orography, resampled to the high resolution grid
    pub elev_lo: FileVar,
    /// Domain mask; cells with values > 0 are downscaled
    pub mask: FileVar,
    /// Output NetCDF file
    pub output: PathBuf,
    /// Name of the downscaled variable in the output file
    pub output_var: String,
    /// Kernel configuration
    pub downscale: DownscaleConfig,
    /// Number of worker threads (0 = rayon default)
    pub num_threads: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        let unset = FileVar {
            path: PathBuf::new(),
            variable: String::new(),
        };
        Self {
            field: unset.clone(),
            elev_hi: unset.clone(),
            elev_lo: unset.clone(),
            mask: unset,
            output: PathBuf::from("ofile.nc"),
            output_var: DEFAULT_OUTPUT_VAR.to_string(),
            downscale: DownscaleConfig::default(),
            num_threads: 0,
        }
    }
}

impl RunConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        self.downscale.half_window().map_err(|e| e.to_string())?;

        if self.output_var.is_empty() {
            return Err("Output variable name must not be empty".to_string());
        }

        for (role, input) in [
            ("field", &self.field),
            ("high resolution orography", &self.elev_hi),
            ("low resolution orography", &self.elev_lo),
            ("mask", &self.mask),
        ] {
            if !input.path.is_file() {
                return Err(format!(
                    "Input file for {} does not exist: {}",
                    role,
                    input.path.display()
                ));
            }
        }

        Ok(())
    }
}

/// Which atmosphere forcing file to prepare
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtmoMode {
    /// Annual mean and July temperature plus mean precipitation over `(y, x)`
    YearlyCycle,
    /// Monthly temperature and precipitation over `(time, y, x)`
    Given,
}

impl FromStr for AtmoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yearly-cycle" | "yearly_cycle" => Ok(AtmoMode::YearlyCycle),
            "given" => Ok(AtmoMode::Given),
            other => Err(format!(
                "Invalid atmosphere mode: {}. Expected: yearly-cycle or given",
                other
            )),
        }
    }
}

/// Everything the `prep-atmo` subcommand needs
#[derive(Clone, Debug)]
pub struct AtmoRunConfig {
    pub mode: AtmoMode,
    /// Monthly 2 m air temperature (K) on the model grid
    pub temperature: FileVar,
    /// Monthly total precipitation (kg m-2 s-1) on the model grid
    pub precipitation: FileVar,
    /// Output NetCDF file
    pub output: PathBuf,
}

impl AtmoRunConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (role, input) in [
            ("temperature", &self.temperature),
            ("precipitation", &self.precipitation),
        ] {
            if !input.path.is_file() {
                return Err(format!(
                    "Input file for {} does not exist: {}",
                    role,
                    input.path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Map the `--verbose` / `--debug` flags onto a log level
pub fn log_level(verbose: bool, debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}
